mod app;
mod config;
mod document;
mod layout;
mod selection;
mod synonyms;

use crate::synonyms::{DatamuseClient, SynonymSource};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reword",
    version,
    about = "Word-by-word styling and synonym swapping in the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text file to open
    file: Option<PathBuf>,

    /// Edit an inline string instead of a file
    #[arg(short, long)]
    text: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in $EDITOR (default: nvim)
    Config,
    /// Print synonym candidates for a word and exit
    Lookup { word: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Commands::Config => return config::open_config_in_editor(),
            Commands::Lookup { word } => {
                let cfg = config::load_config()?;
                let client =
                    DatamuseClient::new(&cfg.api_base_url, cfg.max_suggestions, cfg.timeout_ms);
                let candidates = client.lookup(&word)?;
                if candidates.is_empty() {
                    println!("No synonyms found for {word}");
                } else {
                    for candidate in candidates {
                        println!("{candidate}");
                    }
                }
                return Ok(());
            }
        }
    }

    let text = match (cli.text, cli.file) {
        (Some(text), _) => text,
        (None, Some(file)) => fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => {
            return Err(anyhow::anyhow!(
                "No input provided. Try `reword <file>` or `reword --text \"...\"`."
            ));
        }
    };

    let cfg = config::load_config()?;
    app::run_app(text, cfg)
}
