//! Blueprint CLI - maintain a living planning document set from model patches.

use blueprint::cli::{Cli, Commands};
use blueprint::commands::{self, Output};
use blueprint::merge::{MergeStatus, Resolutions};
use blueprint::run_log;
use clap::Parser;
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;
    let dir = cli.dir.clone();
    let (cmd_name, dry_run, args) = describe(&cli.command);

    let start = Instant::now();
    let result = run_command(cli);
    let duration = start.elapsed().as_millis() as u64;

    let (success, status, error) = match &result {
        Ok(outcome) => (true, *outcome, None),
        Err(e) => (false, None, Some(e.to_string())),
    };
    // Dry runs must leave the filesystem untouched, log included. Read-only
    // commands still log: the file is the audit trail, not a write record.
    if !dry_run {
        run_log::log_run(
            &dir,
            cmd_name,
            args,
            status.map(|s| s.as_str()),
            success,
            error,
            duration,
        );
    }

    match result {
        Ok(Some(MergeStatus::NeedsResolution)) => process::exit(2),
        Ok(_) => {}
        Err(e) => {
            if human {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            process::exit(1);
        }
    }
}

/// Command name, whether this run is dry, and the serialized arguments for
/// the run log.
fn describe(command: &Commands) -> (&'static str, bool, serde_json::Value) {
    match command {
        Commands::Generate { input, dry_run } => (
            "generate",
            *dry_run,
            serde_json::json!({
                "input": input.display().to_string(),
                "dry_run": dry_run,
            }),
        ),
        Commands::Append {
            input,
            policy,
            resolutions,
            resolve,
            dry_run,
        } => (
            "append",
            *dry_run,
            serde_json::json!({
                "input": input.display().to_string(),
                "policy": policy.as_str(),
                "resolutions": resolutions.as_ref().map(|p| p.display().to_string()),
                "resolve": resolve,
                "dry_run": dry_run,
            }),
        ),
        Commands::Model { pretty } => ("model", false, serde_json::json!({ "pretty": pretty })),
        Commands::Check => ("check", false, serde_json::json!({})),
    }
}

/// Run one command, print its result, and return the merge status when the
/// command produced a report.
fn run_command(cli: Cli) -> Result<Option<MergeStatus>, blueprint::Error> {
    let human = cli.human_readable;
    let dir = cli.dir;
    match cli.command {
        Commands::Generate { input, dry_run } => {
            let result = commands::generate(&dir, &input, dry_run)?;
            output(&result, human);
            Ok(Some(result.status()))
        }
        Commands::Append {
            input,
            policy,
            resolutions,
            resolve,
            dry_run,
        } => {
            let mut res = match resolutions {
                Some(path) => Resolutions::load(&path)?,
                None => Resolutions::default(),
            };
            for spec in &resolve {
                let (key, action) = Resolutions::parse_spec(spec)?;
                res.insert(key, action);
            }
            let result = commands::append(&dir, &input, policy, &res, dry_run)?;
            output(&result, human);
            Ok(Some(result.status()))
        }
        Commands::Model { pretty } => {
            let result = commands::model(&dir, pretty)?;
            output(&result, human);
            Ok(None)
        }
        Commands::Check => {
            let result = commands::check(&dir)?;
            output(&result, human);
            Ok(None)
        }
    }
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
