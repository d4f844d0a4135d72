mod catalog;
mod run;
mod tui;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tooldeck::config_file::LoadOutcome;
use tooldeck::load_catalog;
use tooldeck::logger::{self, LogTarget};

#[derive(Parser, Debug)]
#[command(
    name = "tooldeck",
    about = "Parameterized command catalog with a persistent shell"
)]
struct Cli {
    /// Path to the config file (defaults to commands.json in the working directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Log file path (enables file logging in addition to the TUI log panel)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the catalog tree
    List,
    /// Render a command and run it in a fresh shell
    Run(run::RunArgs),
    /// Replace the catalog with a configuration downloaded from a URL
    Fetch {
        /// Address of a JSON configuration document
        url: String,
    },
    /// Replace the catalog with the contents of a file
    Import {
        /// Configuration file to import
        file: String,
    },
    /// Write the catalog to a file
    Export {
        /// Destination file
        file: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()?;

    let Some(command) = cli.command else {
        return tui::run(cli.config.as_deref(), log_file).await;
    };

    logger::init(LogTarget::Stderr, log_file);
    let loaded = load_catalog(cli.config.as_deref())?;
    if let LoadOutcome::Fallback(e) = &loaded.outcome {
        eprintln!("Warning: {e}; using an empty catalog");
    }

    match command {
        Commands::List => {
            catalog::list(&loaded.catalog);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => run::run(&args, &loaded.catalog).await,
        Commands::Fetch { url } => catalog::fetch(&loaded.store, &url).await,
        Commands::Import { file } => catalog::import(&loaded.store, &file),
        Commands::Export { file } => catalog::export(&loaded, &file),
    }
}
