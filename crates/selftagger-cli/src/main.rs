//! selftagger - posts a random image captioned with what a vision service
//! thinks is in it.
//!
//! One run fetches a random image, annotates it, picks a tag and publishes
//! `tag ur self I'm the <tag>`. Any failure reruns the whole attempt, up to
//! `max_attempts` times. With `--dry` the image is written to the scratch
//! directory instead of being published.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use selftagger_core::telemetry::json_requested;
use selftagger_core::{
    init_tracing, obs, AttemptFailure, AttemptPipeline, PublishRouter, PublishTarget,
    RandomFileSource, RetryController, TagSelector, TerminalOutcome, ThreadRandomness,
};
use selftagger_http::{build_client, GitArchiveTarget, HttpFetcher, NoteRouterTarget, VisionClient};
use tracing::{info, Level};

use crate::config::{Config, ConfigError};

#[derive(Parser)]
#[command(name = "selftagger")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tag a random image with what it looks like", long_about = None)]
struct Cli {
    /// Write the image to the scratch directory instead of publishing it
    #[arg(long)]
    dry: bool,
}

/// Live targets in the order they appear in the config.
fn live_targets(config: &Config, client: &reqwest::Client) -> Vec<Arc<dyn PublishTarget>> {
    let mut targets: Vec<Arc<dyn PublishTarget>> = Vec::new();
    if let Some(archive) = &config.archive {
        targets.push(Arc::new(GitArchiveTarget::new(archive.clone(), client.clone())));
    }
    if let Some(router) = &config.note_router {
        targets.push(Arc::new(NoteRouterTarget::new(router.clone(), client.clone())));
    }
    targets
}

fn build_router(config: &Config, client: &reqwest::Client, dry: bool) -> PublishRouter {
    if dry {
        PublishRouter::rehearsal(config.scratch_dir.clone())
    } else {
        PublishRouter::live(live_targets(config, client))
    }
}

fn build_pipeline(config: &Config, client: reqwest::Client, dry: bool) -> Result<AttemptPipeline> {
    let vision = config.vision_config().ok_or(ConfigError::MissingApiKey)?;
    let router = build_router(config, &client, dry);
    let fetcher = Arc::new(HttpFetcher::new(client.clone()));

    Ok(AttemptPipeline::new(
        Arc::new(RandomFileSource::new(fetcher, config.source_url.clone())),
        Arc::new(VisionClient::new(vision, client)),
        TagSelector::default(),
        router,
        Arc::new(ThreadRandomness),
    ))
}

/// Error reported when every attempt failed, with the last attempt's
/// in-flight data.
fn exhaustion_error(attempts: u32, last_failure: AttemptFailure) -> anyhow::Error {
    let context = match obs::in_flight_json(&last_failure.in_flight) {
        Some(in_flight) => format!("Giving up after {attempts} attempt(s); in flight: {in_flight}"),
        None => format!("Giving up after {attempts} attempt(s)"),
    };
    anyhow::Error::new(last_failure).context(context)
}

/// Rehearsal runs once; live runs get the configured retry budget.
fn attempt_budget(config: &Config, dry: bool) -> u32 {
    if dry {
        1
    } else {
        config.max_attempts
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(json_requested(), Level::INFO);

    let config = Config::load(cli.dry).context("Failed to load configuration")?;
    let client = build_client().context("Failed to create HTTP client")?;
    let pipeline = build_pipeline(&config, client, cli.dry)?;

    let max_attempts = attempt_budget(&config, cli.dry);
    info!(
        dry = cli.dry,
        max_attempts = max_attempts,
        source = %config.source_url,
        "starting run"
    );

    let mut controller = RetryController::new(max_attempts);
    match controller.run_with_retry(&pipeline).await {
        TerminalOutcome::Succeeded { receipt, .. } => {
            if cli.dry {
                println!("would have posted: {}", receipt.comment);
            } else {
                println!("posted: {}", receipt.comment);
            }
            Ok(())
        }
        TerminalOutcome::Exhausted {
            attempts,
            last_failure,
        } => Err(exhaustion_error(attempts, last_failure)),
    }
}
