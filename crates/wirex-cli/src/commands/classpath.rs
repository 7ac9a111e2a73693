//! Classpath command - print the dependencies a module compiles against.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use wirex_resolver::visibility::EntryKind;
use wirex_resolver::{AccessRule, DependencyEntry, ResolverConfig, ResolverError};

use super::{display_path, ResolveArgs};

#[derive(Args, Debug)]
pub struct ClasspathArgs {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON form of one dependency entry
#[derive(Debug, Serialize)]
struct EntryOutput {
    module: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    /// Absent when access is unrestricted
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<AccessRule>>,
}

#[derive(Debug, Serialize)]
struct ClasspathOutput {
    target: String,
    attempts: u32,
    entries: Vec<EntryOutput>,
    boot_rules: Vec<AccessRule>,
}

impl From<&DependencyEntry> for EntryOutput {
    fn from(entry: &DependencyEntry) -> Self {
        let kind = match entry.kind {
            EntryKind::SystemModule => "system",
            EntryKind::ReactorModule(_) => "reactor",
            EntryKind::ExternalModule(_) => "external",
        };
        Self {
            module: entry.identity.clone(),
            kind,
            location: entry.location().map(|l| l.display().to_string()),
            rules: entry.rules.clone(),
        }
    }
}

pub fn execute(args: ClasspathArgs, config: ResolverConfig) -> Result<i32> {
    let resolution = match args.resolve.resolve(config)? {
        Ok(resolution) => resolution,
        Err(ResolverError::Unresolved(report)) => {
            eprintln!("{} {}", style("Error:").red().bold(), report.summary());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let entries = resolution
        .dependencies(|_| None::<()>)
        .context("Failed to compute dependencies")?;
    let boot_rules = resolution.boot_classpath_access_rules();
    let target = resolution.container.revision(resolution.target).identity();

    if args.json {
        let output = ClasspathOutput {
            target,
            attempts: resolution.attempts,
            entries: entries.iter().map(EntryOutput::from).collect(),
            boot_rules,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(0);
    }

    println!("{} {}", style("Classpath of").bold(), style(&target).cyan());
    for entry in &entries {
        let location = match &entry.kind {
            EntryKind::SystemModule => style("<boot classpath>").dim().to_string(),
            kind => kind
                .location()
                .map(display_path)
                .unwrap_or_else(|| style("<no location>").dim().to_string()),
        };
        println!("  {} {}", style(&entry.identity).green(), location);

        match &entry.rules {
            None => println!("      {}", style("(unrestricted)").dim()),
            Some(rules) => {
                for rule in rules {
                    let rule = if rule.discouraged {
                        style(rule.to_string()).yellow()
                    } else {
                        style(rule.to_string())
                    };
                    println!("      {}", rule);
                }
            }
        }
    }

    if !boot_rules.is_empty() {
        println!();
        println!("{}", style("Boot classpath rules").bold());
        for rule in &boot_rules {
            println!("  {}", rule);
        }
    }

    Ok(0)
}
