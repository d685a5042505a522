use anyhow::Context;
use clap::Parser;
use config::{LoggingConfig, ReportConfig};
use reporter::{build_generator, cli::Cli, page::ReportPage};
use services::{ReportError, ReportGenerator};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // API_KEY may live in a local .env file
    let _ = dotenvy::dotenv();

    let mut config =
        ReportConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(output) = cli.output {
        config.output.path = output;
    }

    init_tracing(&config.logging);

    let page = Arc::new(ReportPage::new(
        config.output.path.clone(),
        config.output.refresh_seconds,
    ));
    page.write()
        .with_context(|| format!("Failed to write {}", page.path().display()))?;
    tracing::info!(path = %page.path().display(), "Report page ready");

    let generator = Arc::new(build_generator(&config, &page)?);

    if cli.interactive {
        run_interactive(generator).await
    } else {
        run_once(&generator).await
    }
}

async fn run_once(generator: &ReportGenerator) -> anyhow::Result<()> {
    let outcome = generator.generate().await?;
    println!(
        "Report ready: {} characters, {} sources",
        outcome.markdown.chars().count(),
        outcome.citations.len()
    );
    Ok(())
}

async fn run_interactive(generator: Arc<ReportGenerator>) -> anyhow::Result<()> {
    println!("Press Enter to generate a report, Ctrl-D to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut running = JoinSet::new();

    while lines.next_line().await?.is_some() {
        let generator = generator.clone();
        running.spawn(async move {
            match generator.generate().await {
                Ok(outcome) => tracing::info!(
                    sources = outcome.citations.len(),
                    "Report ready"
                ),
                Err(ReportError::AlreadyRunning) => {
                    println!("A report is already being generated");
                }
                Err(ReportError::MissingCredential) => {
                    eprintln!("API_KEY is not set");
                }
                // Logged by the generator
                Err(_) => {}
            }
        });

        // Reap finished generations
        while running.try_join_next().is_some() {}
    }

    while running.join_next().await.is_some() {}
    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    // Build the filter string from the logging configuration
    let mut filter = logging_config.level.clone();

    for (module, level) in &logging_config.modules {
        filter.push_str(&format!(",{module}={level}"));
    }

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
