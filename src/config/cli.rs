use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "bike-allocation")]
#[command(about = "Assigns recovered bikes to associations by preference and fairness points")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "bike-allocation.toml")]
    pub config: String,

    /// Override the data directory from the config file
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register a recovery date and the folder holding its bike photos
    AddRecovery {
        #[arg(long)]
        date: String,
        #[arg(long)]
        images_url: String,
    },

    /// List registered recovery dates
    Recoveries,

    /// Submit the preferences of an association, as BIKE=TIER pairs
    Submit {
        #[arg(long)]
        association: String,
        #[arg(long)]
        date: String,
        /// e.g. B12=3 B13=0 number_of_needed_bikes=2
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Compute the assignment of a recovery date, or show the stored one
    Assign {
        #[arg(long)]
        date: String,
    },

    /// Show the bikes assigned to one association
    Show {
        #[arg(long)]
        date: String,
        #[arg(long)]
        association: String,
    },

    /// Write the assignment of a recovery date as CSV
    Export {
        #[arg(long)]
        date: String,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show the fairness points of every association
    Points,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("config", &self.config)?;
        if let Some(data_dir) = &self.data_dir {
            validate_path("data_dir", data_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_command() {
        let cli = CliConfig::try_parse_from([
            "bike-allocation",
            "--data-dir",
            "/tmp/bikes",
            "submit",
            "--association",
            "x",
            "--date",
            "2026-10-21",
            "B1=3",
            "number_of_needed_bikes=",
        ])
        .unwrap();

        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/bikes"));
        match cli.command {
            Command::Submit { association, fields, .. } => {
                assert_eq!(association, "x");
                assert_eq!(
                    fields,
                    vec![
                        ("B1".to_string(), "3".to_string()),
                        ("number_of_needed_bikes".to_string(), String::new()),
                    ]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_field_without_equals_is_rejected() {
        let result = CliConfig::try_parse_from([
            "bike-allocation",
            "submit",
            "--association",
            "x",
            "--date",
            "2026-10-21",
            "B1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = CliConfig::try_parse_from(["bike-allocation", "points"]).unwrap();
        assert_eq!(cli.config, "bike-allocation.toml");
        assert!(!cli.verbose);
        assert!(cli.validate().is_ok());
    }
}
