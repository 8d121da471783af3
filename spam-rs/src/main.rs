//! Command-line front end for the spam filter
//!
//! # Usage
//!
//! ```bash
//! # Teach the filter
//! spam-rs spam message.txt
//! spam-rs good - < reply.txt
//!
//! # Ask it
//! spam-rs score suspicious.txt
//! spam-rs details suspicious.txt
//!
//! # Inspect the database
//! spam-rs stats --json
//! spam-rs dump > report.txt
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use spam_rs::config::{Config, SignificantLimit};
use spam_rs::spam::{Classifier, ProgressEvent};
use spam_rs::storage::SqliteStatStore;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spam-rs")]
#[command(about = "Phrase-based Bayesian spam filter", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "spam-rs.toml")]
    config: PathBuf,

    /// Database URL, overrides the configuration (e.g., sqlite://spamstats.db)
    #[arg(short, long)]
    db: Option<String>,

    /// Number of phrases combined when scoring, or "unlimited"
    #[arg(long)]
    max_significant: Option<SignificantLimit>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a message as spam
    Spam {
        /// Message file, or "-" for stdin
        input: Option<PathBuf>,
    },
    /// Learn a message as not spam
    Good {
        /// Message file, or "-" for stdin
        input: Option<PathBuf>,
    },
    /// Print the spam probability of a message
    Score {
        /// Message file, or "-" for stdin
        input: Option<PathBuf>,
    },
    /// Show the stored counters of every phrase in a message
    Details {
        /// Message file, or "-" for stdin
        input: Option<PathBuf>,
    },
    /// Show database statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write every phrase and summary statistics to stdout
    Dump,
}

fn read_message(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read message from {}", path.display())),
        _ => {
            let mut message = String::new();
            std::io::stdin()
                .read_to_string(&mut message)
                .context("Failed to read message from stdin")?;
            Ok(message)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so reports on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spam_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        info!("Loading configuration from {}", cli.config.display());
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(db) = cli.db {
        config.storage.database_url = db;
    }
    if let Some(limit) = cli.max_significant {
        config.classifier.max_significant = limit;
    }

    let store = Arc::new(SqliteStatStore::connect(&config.storage.database_url).await?);
    let mut classifier = Classifier::from_config(store, &config)?;
    classifier.on_progress(|event| match event {
        ProgressEvent::Retry { .. } | ProgressEvent::Rows { .. } => eprintln!("{}", event),
        ProgressEvent::Phrase { .. } => {}
    });

    match cli.command {
        Commands::Spam { input } => {
            let message = read_message(input.as_deref())?;
            classifier.learn_spam(&message).await?;
            println!("✓ Learned as spam");
        }
        Commands::Good { input } => {
            let message = read_message(input.as_deref())?;
            classifier.learn_good(&message).await?;
            println!("✓ Learned as good");
        }
        Commands::Score { input } => {
            let message = read_message(input.as_deref())?;
            let probability = classifier.score(&message).await?;
            println!("{:.4}", probability);
        }
        Commands::Details { input } => {
            let message = read_message(input.as_deref())?;
            let details = classifier.phrase_details(&message).await?;

            if details.is_empty() {
                println!("No known phrases.");
            } else {
                println!("{:<40} {:>10} {:>10} {:>8}", "Phrase", "# Spam", "# OK", "Score");
                println!("{:-<71}", "");

                for detail in &details {
                    let score = detail
                        .score
                        .map(|s| format!("{:.4}", s))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<40} {:>10} {:>10} {:>8}",
                        detail.phrase, detail.spam, detail.good, score
                    );
                }
            }
        }
        Commands::Stats { json } => {
            let stats = classifier.stats().await?;

            if json {
                println!("{}", stats.to_json()?);
            } else {
                println!("Phrases:        {}", stats.phrases);
                println!("Total messages: {}", stats.total);
                println!("Spam messages:  {}", stats.spam);
                println!("Good messages:  {}", stats.good);
            }
        }
        Commands::Dump => {
            let mut sink = std::io::BufWriter::new(std::io::stdout());
            classifier.dump(&mut sink).await?;
        }
    }

    Ok(())
}
