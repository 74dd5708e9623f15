//! Org cross-reference scanner CLI.

mod compiler;
mod config;
mod error;
mod graph;
mod http;
mod markup;
mod scan;
mod symbols;
#[cfg(test)]
mod testing;
mod tooling;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};

use crate::compiler::PollPolicy;
use crate::config::Config;
use crate::http::HttpTooling;
use crate::types::{JobStatus, ScanJob};

/// Command-line interface definition.
#[derive(Parser)]
#[command(name = "orgscan", about = "Cross-reference scanner for Salesforce orgs")]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan an org and emit its reference graph as JSON
    Scan {
        /// Bearer token for the org, typically from an OAuth session
        #[arg(long, env = "SALESFORCE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        /// Base URL of the org instance, e.g. https://na1.salesforce.com
        #[arg(long)]
        instance_url: String,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    return match cli.command {
        Commands::Scan {
            access_token,
            instance_url,
            out,
        } => match cmd_scan(&instance_url, &access_token, out.as_deref()) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(2)
            },
        },
    };
}

/// Run one scan against the org and write the JSON report.
///
/// Exit code 0 when the scan finished, 1 when the scan itself failed (the
/// report still carries the error), 2 from `main` when setup failed before
/// a scan could start.
///
/// # Errors
///
/// Returns config loading and report writing failures; scan failures are
/// recorded on the job, not returned.
fn cmd_scan(
    instance_url: &str,
    access_token: &str,
    out: Option<&std::path::Path>,
) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    let api = HttpTooling::new(instance_url, access_token, config.api_version);
    let policy = PollPolicy::new(config.poll_interval, config.poll_max_attempts);

    let cancel = std::sync::Arc::clone(&policy.cancel);
    // Handler install can fail only if one is already set; not worth
    // aborting the scan over.
    let handler = ctrlc::set_handler(move || {
        eprintln!("cancellation requested, abandoning the compile wait");
        cancel.store(true, Ordering::Relaxed);
    });
    if handler.is_err() {
        eprintln!("warning: could not install the ctrl-c handler");
    }

    let mut job = ScanJob::new();
    scan::run(&api, &mut job, &policy);

    let report = serde_json::to_string_pretty(&job).map_err(|e| {
        return error::Error::InvalidResponse {
            context: "report serialization".to_string(),
            reason: e.to_string(),
        };
    })?;
    match out {
        None => println!("{report}"),
        Some(path) => std::fs::write(path, report)?,
    }

    return match job.status {
        JobStatus::Finished => {
            eprintln!(
                "scanned {} classes and {} templates",
                job.units.len(),
                job.templates.len()
            );
            Ok(ExitCode::SUCCESS)
        },
        _ => {
            if let Some(message) = &job.error {
                eprintln!("scan failed: {message}");
            }
            Ok(ExitCode::from(1))
        },
    };
}
