use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "herald", version, about = "Herald attribution engine CLI")]
struct Cli {
    /// Diagnostics filter used when RUST_LOG is not set (e.g. "debug", "herald_audit=trace").
    #[arg(long = "log-level", global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a configuration file, then print a summary.
    Check {
        /// Path to herald.yaml
        #[arg(long, short = 'c', default_value = "herald.yaml")]
        config: PathBuf,
    },

    /// Feed a scripted sequence of directory changes and notifications through the engine.
    Replay {
        /// Path to herald.yaml
        #[arg(long, short = 'c', default_value = "herald.yaml")]
        config: PathBuf,

        /// Path to the replay script (YAML)
        #[arg(long, short = 's')]
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Command::Check { config } => commands::check::run(&config)?,
        Command::Replay { config, script } => commands::replay::run(&config, &script).await?,
    }

    Ok(())
}
