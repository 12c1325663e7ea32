//! Carden command-line launcher
//!
//! - **init**: write a starter config and create the database
//! - **deck**: create and inspect decks
//! - **validate-topic**: run topic moderation on its own
//! - **generate**: validate, generate and save a batch of cards

use anyhow::Result;
use carden::config::{default_config_path, load_config, CardenConfig};
use carden_logging::{init_logging, LogConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "carden", about = "Validated flashcard generation for language decks")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.carden/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config and create the database
    Init,

    /// Manage decks
    Deck {
        #[command(subcommand)]
        action: cli::deck::DeckAction,
    },

    /// Check whether a topic is acceptable for card generation
    ValidateTopic {
        /// Topic to check
        topic: String,

        /// Skip the model and use the built-in rules
        #[arg(long)]
        rules_only: bool,

        #[arg(long)]
        json: bool,
    },

    /// Generate cards for a deck and save them
    Generate {
        /// Target deck id
        #[arg(long)]
        deck: i64,

        /// Topic for the cards
        #[arg(long)]
        topic: String,

        /// Number of cards (default: generation.default_card_count)
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Only decks owned by this user are accepted
        #[arg(long)]
        owner: Option<i64>,

        #[arg(long, default_value = "en")]
        source: String,

        #[arg(long, default_value = "vi")]
        target: String,

        /// CEFR level (A1-C2)
        #[arg(long)]
        level: Option<String>,

        /// Keywords to steer the vocabulary (repeatable)
        #[arg(short = 'k', long = "keyword")]
        keywords: Vec<String>,

        #[arg(long)]
        no_examples: bool,

        #[arg(long)]
        no_pronunciation: bool,

        /// Submit to the background runner and wait for it
        #[arg(long)]
        background: bool,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "carden",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config: CardenConfig = load_config(&config_path)?;

    match cli.command {
        Commands::Init => cli::init::run(&config_path, &config),

        Commands::Deck { action } => cli::deck::run(action, &config),

        Commands::ValidateTopic { topic, rules_only, json } => cli::validate::run(
            cli::validate::ValidateArgs {
                topic,
                rules_only,
                json,
            },
            &config,
        ),

        Commands::Generate {
            deck,
            topic,
            count,
            owner,
            source,
            target,
            level,
            keywords,
            no_examples,
            no_pronunciation,
            background,
            json,
        } => cli::generate::run(
            cli::generate::GenerateArgs {
                deck,
                topic,
                count,
                owner,
                source,
                target,
                level,
                keywords,
                no_examples,
                no_pronunciation,
                background,
                json,
            },
            &config,
        ),
    }
}
