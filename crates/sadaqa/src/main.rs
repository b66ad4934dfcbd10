//! # Sadaqa CLI (`sadaqa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sadaqa serve` | Start the HTTP server |
//! | `sadaqa ingest <path>` | Index a PDF, TXT, XLSX, or XLS file |
//! | `sadaqa ask "<question>"` | Ask a question and stream the answer |
//! | `sadaqa check-env` | Report which environment variables are set |
//!
//! ## Examples
//!
//! ```bash
//! sadaqa ingest ./listes/maarif.xlsx --config ./config/sadaqa.toml
//! sadaqa ask "Quelles familles de Maarif ont besoin de médicaments ?"
//! sadaqa serve --bind 0.0.0.0:3000
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;

use sadaqa::app::{check_env, App};
use sadaqa::chat::{chat, ChatReply};
use sadaqa::config::{load_config_or_default, Secrets};
use sadaqa::ingest::ingest;
use sadaqa::{logging, server};
use sadaqa_core::models::UploadedDocument;

/// Sadaqa: document ingestion and retrieval-augmented chat for charity
/// associations.
#[derive(Parser)]
#[command(name = "sadaqa", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/sadaqa.toml")]
    config: PathBuf,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Index a document.
    Ingest {
        /// File to index (.pdf, .txt, .xlsx, .xls).
        path: PathBuf,

        /// Declared MIME type. The extension is used when omitted.
        #[arg(long)]
        mime: Option<String>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask a question over the indexed documents.
    Ask {
        question: String,
    },

    /// Report which environment variables are configured (never their values).
    CheckEnv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let secrets = Secrets::from_env();
    let load_config = || load_config_or_default(&cli.config);

    match cli.command {
        Commands::CheckEnv => {
            println!("{}", serde_json::to_string_pretty(&check_env(&secrets))?);
        }
        Commands::Serve { bind } => {
            let mut config = load_config()?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let app = Arc::new(App::new(config, secrets)?);
            server::run_server(app).await?;
        }
        Commands::Ingest { path, mime, json } => {
            let app = App::new(load_config()?, secrets)?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let outcome = ingest(
                &app,
                UploadedDocument {
                    filename,
                    mime_type: mime.unwrap_or_default(),
                    bytes,
                },
            )
            .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let Some(message) = &outcome.message {
                println!("{}", message);
                for family in outcome.extracted_families.iter().flatten() {
                    println!(
                        "  - {} ({}, {} members, {}) needs: {}",
                        family.name,
                        family.district,
                        family.members,
                        family.priority.as_str(),
                        family.needs.join(", ")
                    );
                }
            }

            if !outcome.success {
                bail!("{}", outcome.error.unwrap_or_default());
            }
        }
        Commands::Ask { question } => {
            let app = App::new(load_config()?, secrets)?;
            match chat(&app, &question).await {
                ChatReply::Stream {
                    model,
                    passages,
                    mut stream,
                } => {
                    let mut stdout = std::io::stdout();
                    while let Some(fragment) = stream.next().await {
                        match fragment {
                            Ok(text) => {
                                write!(stdout, "{}", text)?;
                                stdout.flush()?;
                            }
                            Err(e) => {
                                println!();
                                bail!("Answer interrupted: {}", e);
                            }
                        }
                    }
                    println!();

                    eprintln!("model: {}", model);
                    for passage in &passages {
                        eprintln!(
                            "source: {} (score {:.3})",
                            passage.source_label, passage.similarity_score
                        );
                    }
                }
                ChatReply::Message(message) => bail!("{}", message),
            }
        }
    }

    Ok(())
}
