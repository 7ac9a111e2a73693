//! wirex command-line tool
//!
//! Resolves a module against the modules of its reactor and target platform
//! and prints the classpath it compiles against.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use env_logger::Env;

use commands::{ClasspathArgs, StateArgs};

#[derive(Parser, Debug)]
#[command(name = "wirex")]
#[command(about = "Module resolution and classpath computation", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug output, including full resolution failure details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (defaults to ./wirex.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the ordered dependencies of a module with their access rules
    Classpath(ClasspathArgs),

    /// Print the resolver state for a module
    State(StateArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result = config::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Classpath(args) => commands::classpath::execute(args, config),
        Commands::State(args) => commands::state::execute(args, config),
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}
