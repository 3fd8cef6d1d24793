// Copyright 2026 yareviews contributors
// SPDX-License-Identifier: MIT

//! yareviews command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use yareviews::renderer::chromium::ChromiumRenderer;
use yareviews::renderer::Renderer;
use yareviews::{resolve_config, ParseMode, ReviewParser, SortMode};

#[derive(Parser)]
#[command(
    name = "yareviews",
    about = "Organization info and customer reviews from Yandex Maps",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract company info and/or reviews of an organization.
    Parse {
        /// Organization id as it appears in yandex.ru/maps/org/<id>/.
        id: u64,

        /// What to extract (all, company, reviews).
        #[arg(long, default_value = "all")]
        mode: ParseMode,

        /// Review order (none, default, newest, negative, positive).
        #[arg(long, default_value = "newest")]
        sort: String,

        /// Maximum number of reviews. 0 or absent means all.
        #[arg(long)]
        limit: Option<usize>,

        /// Write JSON here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Recover the organization id behind a Yandex Maps link.
    ResolveId {
        url: String,

        /// How long to watch network traffic for the review fetch.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   yareviews completions bash > ~/.local/share/bash-completion/completions/yareviews
    ///   yareviews completions zsh > ~/.zfunc/_yareviews
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "yareviews", &mut std::io::stdout());
        return Ok(());
    }

    let config = resolve_config(cli.config.as_deref())?;
    let renderer = Arc::new(ChromiumRenderer::launch(&config.browser).await?);
    let parser = ReviewParser::new(renderer.clone(), config);

    let outcome = run(&parser, cli.command).await;

    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e:#}");
    }
    outcome
}

async fn run(parser: &ReviewParser, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Parse {
            id,
            mode,
            sort,
            limit,
            output,
            compact,
        } => {
            let sort = SortMode::parse_optional(&sort).map_err(anyhow::Error::msg)?;
            let result = parser.parse(id, mode, sort, limit).await?;
            let json = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, json + "\n")
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!("wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Commands::ResolveId { url, timeout_ms } => {
            let id = parser
                .resolve_id(&url, timeout_ms.map(Duration::from_millis))
                .await?;
            println!("{}", serde_json::to_string(&id)?);
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
