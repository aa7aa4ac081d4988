use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    CommandError, CommitCommand, ConfigCommand, InitCommand, LogCommand, PullCommand,
    PushCommand, StatusCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "notionsync")]
#[command(version)]
#[command(about = "Keep a directory of Markdown files in sync with Notion", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory
    #[arg(long, short = 'C', global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workspace
    Init(InitCommand),

    /// Show uncommitted, unpushed and remote changes
    Status(StatusCommand),

    /// Record the working files as a commit
    Commit(CommitCommand),

    /// Send the last commit to Notion
    Push(PushCommand),

    /// Fetch Notion pages into the workspace
    Pull(PullCommand),

    /// List commits
    Log(LogCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error [{}]: {}", e.category(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CommandError> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config, &cli.dir)?;
    let dir = &cli.dir;

    match &cli.command {
        Some(Commands::Init(cmd)) => cmd.run(dir, &config),
        Some(Commands::Status(cmd)) => cmd.run(dir, &config),
        Some(Commands::Commit(cmd)) => cmd.run(dir, &config),
        Some(Commands::Push(cmd)) => cmd.run(dir, &config),
        Some(Commands::Pull(cmd)) => cmd.run(dir, &config),
        Some(Commands::Log(cmd)) => cmd.run(dir, &config),
        Some(Commands::Config(cmd)) => cmd.run(&config),
        None => {
            println!("Use --help to see available commands");
            Ok(())
        }
    }
}
