pub mod commands;
pub mod script;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devbook")]
#[command(about = "DevBook CLI - replay requests through the DevBook dispatcher")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format instead of text")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Replay a JSON script of requests against an in-memory store")]
    Run {
        #[arg(help = "Path to the script file")]
        script: PathBuf,
    },

    #[command(about = "Show the effective configuration")]
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Run { script } => commands::run::handle(&script, output_format).await,
        Commands::Config => commands::config::handle(output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["devbook", "config"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));

        let cli = Cli::try_parse_from(["devbook", "run", "seed.json", "--json"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }

    #[test]
    fn test_unknown_format_flag_is_rejected() {
        assert!(Cli::try_parse_from(["devbook", "--text", "config"]).is_err());
    }
}
