// CLI module - operator commands for log layout and maintenance

mod output;

use crate::config::{EnvSettings, LoggingConfig, PathProfile};
use crate::error::{ChanlogError, Result};
use crate::logs::{
    archive_old, expire_archives, prune_by_size, run_all, verbosity, Attributes, Level,
    LoggerRegistry,
};
use clap::{Parser, Subcommand};
use std::str::FromStr;

/// chanlog - per-component log files with rotation and maintenance
#[derive(Parser)]
#[command(name = "chanlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Mirror debug events to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved log layout
    Paths,

    /// Write one event through a component channel
    Emit {
        /// Component name (legacy aliases accepted)
        component: String,

        /// Level: debug, info, warning, error or critical
        level: String,

        /// Message text
        message: String,

        /// Attributes (KEY=VALUE format)
        #[arg(short, long = "attr")]
        attrs: Vec<String>,
    },

    /// Delete old backups until the log directory fits a size budget
    Prune {
        /// Budget in megabytes (defaults to the configured value)
        #[arg(long)]
        max_mb: Option<u64>,
    },

    /// Compress old backups into the archive directory
    Archive {
        #[arg(long)]
        older_than_days: Option<u64>,
    },

    /// Delete archives past their retention
    Expire {
        #[arg(long)]
        max_days: Option<u64>,
    },

    /// Archive, expire and prune in one pass
    Maintain,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let controller = verbosity();
        controller.install_console();
        if self.verbose {
            controller.set(true);
        }

        let env = EnvSettings::from_env();
        let config = match env.config_path.as_deref() {
            Some(path) => LoggingConfig::from_file(path)?,
            None => LoggingConfig::default(),
        };
        let profile = PathProfile::resolve(&env, &config);
        let policy = &config.maintenance;

        match &self.command {
            Commands::Paths => output::print_profile(&profile),

            Commands::Emit {
                component,
                level,
                message,
                attrs,
            } => {
                let level = Level::from_str(level)?;
                let attributes = parse_attributes(attrs)?;

                let registry = LoggerRegistry::with_settings(&env, &config);
                let channel = registry.get(component);
                channel.log(level, message.as_str(), Some(attributes));
                registry.flush_all();

                match channel.file_path() {
                    Some(path) => output::print_success_msg(&format!(
                        "{} event written to {}",
                        level,
                        path.display()
                    )),
                    None => output::print_info("Logging is disabled for this run"),
                }
            }

            Commands::Prune { max_mb } => {
                let max_mb = max_mb.unwrap_or(policy.max_total_size_mb);
                if prune_by_size(&profile, max_mb) {
                    output::print_success_msg(&format!("Pruned backups to fit {} MB", max_mb));
                } else {
                    output::print_info(&format!("Already within {} MB", max_mb));
                }
            }

            Commands::Archive { older_than_days } => {
                let days = older_than_days.unwrap_or(policy.archive_after_days);
                let archived = archive_old(&profile, days);
                output::print_count("Archived", archived, "backup(s)");
            }

            Commands::Expire { max_days } => {
                let days = max_days.unwrap_or(policy.expire_after_days);
                let expired = expire_archives(&profile, days);
                output::print_count("Expired", expired, "archive(s)");
            }

            Commands::Maintain => {
                let report = run_all(&profile, policy);
                output::print_report(&report);
            }
        }

        Ok(())
    }
}

/// Parse attributes from KEY=VALUE format
///
/// Values that parse as JSON keep their type; anything else is a string.
fn parse_attributes(pairs: &[String]) -> Result<Attributes> {
    let mut map = Attributes::new();

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ChanlogError::ConfigError(format!(
                "Invalid attribute format: '{}'. Expected KEY=VALUE",
                pair
            )));
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        map.insert(key.to_string(), value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_attributes() {
        let pairs = vec![
            "user=alice".to_string(),
            "retries=3".to_string(),
            "ok=true".to_string(),
        ];
        let result = parse_attributes(&pairs).unwrap();
        assert_eq!(result.get("user"), Some(&json!("alice")));
        assert_eq!(result.get("retries"), Some(&json!(3)));
        assert_eq!(result.get("ok"), Some(&json!(true)));
    }

    #[test]
    fn test_parse_attributes_invalid() {
        let pairs = vec!["INVALID".to_string()];
        assert!(parse_attributes(&pairs).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["chanlog", "emit", "ui", "warning", "slow", "-a", "ms=120"])
            .unwrap();
        match cli.command {
            Commands::Emit { component, attrs, .. } => {
                assert_eq!(component, "ui");
                assert_eq!(attrs, vec!["ms=120".to_string()]);
            }
            _ => panic!("expected emit"),
        }

        let cli = Cli::try_parse_from(["chanlog", "prune", "--max-mb", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Prune { max_mb: Some(5) }));
    }
}
