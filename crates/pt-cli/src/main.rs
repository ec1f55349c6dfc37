//! CLI frontend for the paotuan dice engine.

mod commands;
mod host;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pt",
    about = "Paotuan dice: TTRPG dice commands and character cards from the terminal",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that run the engine.
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// Card JSON file to load and link to the user
    #[arg(short, long)]
    pub card: Option<PathBuf>,

    /// Channel config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// User id
    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Display name
    #[arg(long, default_value = "player")]
    pub name: String,

    /// Channel id
    #[arg(long, default_value = "cli")]
    pub channel: String,

    /// RNG seed for reproducible rolls
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Make every die show this face (clamped to the die)
    #[arg(long, conflicts_with = "seed")]
    pub fixed: Option<u32>,

    /// Write card changes back to the --card file
    #[arg(long, requires = "card")]
    pub save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single dice command, e.g. `pt roll d100 侦查`
    Roll {
        /// The command text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Read commands from stdin until `quit`
    Repl {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Show a card file as a table
    Card {
        /// Card JSON file
        file: PathBuf,
    },

    /// Write an empty card file
    New {
        /// Card type: coc, dnd or general
        kind: String,

        /// Card name
        name: String,

        /// Output file (default: `<name>.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Roll { command, session } => commands::roll::run(&session, &command.join(" ")).await,
        Commands::Repl { session } => commands::repl::run(&session).await,
        Commands::Card { file } => commands::card::run(&file),
        Commands::New { kind, name, output } => commands::new::run(&kind, &name, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
