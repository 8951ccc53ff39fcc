//! dashboardr page inspector
//!
//! Runs the runtime's visibility pass and condition checks over page
//! snapshots captured in the browser with `captureSnapshot()`.

mod config;
mod describe;
mod error;
mod eval;
mod lint;

use std::process::ExitCode;

use clap::Parser;
use dashboardr::css::hidden_marker_css;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Command, Config, load_snapshot};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboardr_inspect=info,dashboardr_runtime=warn".into()),
        )
        .init();

    match run(Config::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(config: Config) -> anyhow::Result<ExitCode> {
    let runtime_config = config.runtime_config()?;

    match &config.command {
        Command::Eval {
            snapshot,
            set,
            json,
        } => {
            let doc = load_snapshot(snapshot)?;
            info!("Evaluating {}", snapshot.display());
            let report = eval::evaluate(&doc, set, &runtime_config);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", eval::render_text(&doc, &report, &runtime_config));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Lint { snapshot, json } => {
            let doc = load_snapshot(snapshot)?;
            info!("Linting {}", snapshot.display());
            let report = lint::lint(&doc, &runtime_config);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", lint::render_text(&report));
            }
            Ok(if report.has_errors() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Css => {
            print!("{}", hidden_marker_css(&runtime_config));
            Ok(ExitCode::SUCCESS)
        }
    }
}
