//! Command line configuration

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dashboardr::config::RuntimeConfig;
use dashboardr::dom::DomSnapshot;

use crate::error::{InspectError, Result};

/// Inspect captured dashboardr pages
#[derive(Parser, Clone, Debug)]
#[command(name = "dashboardr-inspect")]
#[command(about = "Evaluate and lint show-when conditions in captured dashboardr page snapshots")]
pub struct Config {
    /// Runtime configuration JSON (attribute and class names, delays)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Run a visibility pass and print what is shown and hidden
    Eval {
        /// Snapshot JSON captured with `captureSnapshot()`
        snapshot: PathBuf,

        /// Override a filter value (`var=value`, empty value clears it)
        #[arg(long = "set", value_name = "VAR=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Print the full pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every show-when condition; exits with 1 when errors are found
    Lint {
        /// Snapshot JSON captured with `captureSnapshot()`
        snapshot: PathBuf,

        /// Print findings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the stylesheet backing the hidden marker class
    Css,
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    let (var, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected VAR=VALUE, got '{s}'"))?;
    if var.is_empty() {
        return Err(format!("missing variable name in '{s}'"));
    }
    Ok((var.to_string(), value.to_string()))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        match &self.config {
            Some(path) => Ok(RuntimeConfig::from_json(&read(path)?)?),
            None => Ok(RuntimeConfig::default()),
        }
    }
}

pub fn load_snapshot(path: &Path) -> Result<DomSnapshot> {
    Ok(DomSnapshot::from_json(&read(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("expr=a=b"),
            Ok(("expr".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_assignment("degree="),
            Ok(("degree".to_string(), String::new()))
        );
        assert!(parse_assignment("degree").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn cli_parses_eval_overrides() {
        let config = Config::parse_from([
            "dashboardr-inspect",
            "eval",
            "page.json",
            "--set",
            "degree=graduate",
            "--set",
            "age=30",
        ]);
        match config.command {
            Command::Eval { snapshot, set, json } => {
                assert_eq!(snapshot, PathBuf::from("page.json"));
                assert_eq!(set.len(), 2);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
