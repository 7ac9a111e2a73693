//! State command - dump the resolver state for a module.

use anyhow::Result;
use clap::Args;
use console::style;
use wirex_resolver::{ResolverConfig, ResolverError};

use super::ResolveArgs;

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,
}

pub fn execute(args: StateArgs, config: ResolverConfig) -> Result<i32> {
    match args.resolve.resolve(config)? {
        Ok(resolution) => {
            print!("{}", resolution.container.debug_string());
            Ok(0)
        }
        Err(ResolverError::Unresolved(report)) => {
            print!("{}", report.state);
            eprintln!();
            eprintln!("{} {}", style("Error:").red().bold(), report.summary());
            eprint!("{}", report.detail());
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
