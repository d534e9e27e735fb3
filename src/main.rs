use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jules_tools::config::{ConfigOverrides, JulesConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "jules")]
#[command(version, about = "Review pending Jules sessions and extract their patches")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Dotenv file holding JULES_API_KEY (defaults to <project>/.env)
    #[arg(long, global = true, env = "JULES_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Base URL of the Jules API
    #[arg(long, global = true, env = "JULES_API_BASE")]
    pub api_base: Option<String>,

    /// Artifact helper script (defaults to <project>/.agent/scripts/jules-api.sh)
    #[arg(long, global = true, env = "JULES_API_SCRIPT")]
    pub api_script: Option<PathBuf>,

    /// Directory patches are written to (defaults to <project>/.agent/tmp)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sessions for this repository awaiting plan approval or completed
    Review,
    /// Extract patches and commit messages for the given sessions
    Extract {
        /// Numeric session ids, as printed by `jules review`
        #[arg(required = true)]
        session_ids: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "jules=debug,jules_tools=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let overrides = ConfigOverrides {
        env_file: cli.env_file.clone(),
        api_base: cli.api_base.clone(),
        api_script: cli.api_script.clone(),
        output_dir: cli.output_dir.clone(),
    };
    let config = JulesConfig::new(project_dir, overrides)?;

    match &cli.command {
        Commands::Review => cmd::cmd_review(&config).await?,
        Commands::Extract { session_ids } => cmd::cmd_extract(&config, session_ids).await?,
    }

    Ok(())
}
