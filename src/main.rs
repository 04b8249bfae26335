use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listing_scout::config::Settings;
use listing_scout::jobs::{HttpNotifier, JobRunner};
use listing_scout::scrapers::ChromeLauncher;
use listing_scout::store::{PropertyStore, RecordStore};
use listing_scout::{JobRequest, JobStatus, Source};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listing-scout", about = "Scrape property listings rendered with JavaScript")]
struct Cli {
    /// Settings file (defaults to ./scout.toml when present)
    #[arg(long, global = true, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a listing and run its job to completion
    Scrape {
        url: String,
        #[arg(long)]
        source: Source,
        #[arg(long)]
        callback_url: Option<String>,
        #[arg(long)]
        property_id: Option<i64>,
        #[arg(long)]
        task_id: Option<i64>,
    },
    /// Show a job's status
    Status { job_id: u64 },
    /// Print a stored property as JSON
    Show { property_id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let store = Arc::new(
        RecordStore::open(&settings.store.path)
            .await
            .with_context(|| format!("Failed to open store at {}", settings.store.path.display()))?,
    );

    let notifier = HttpNotifier::new(settings.callback_timeout(), settings.callback.accept_invalid_certs)
        .context("Failed to create HTTP client")?;
    let runner = JobRunner::new(
        Arc::new(ChromeLauncher::new(settings.browser.clone())),
        store.clone(),
        store.clone(),
        Arc::new(notifier),
        settings.scrape_options(),
    );

    match cli.command {
        Command::Scrape {
            url,
            source,
            callback_url,
            property_id,
            task_id,
        } => {
            info!("🏠 Listing Scout - {} scraper", source);
            let job_id = runner
                .submit(JobRequest {
                    url,
                    source,
                    callback_url,
                    external_property_id: property_id,
                    external_task_id: task_id,
                })
                .await?;

            let job = runner.run(job_id).await?;
            match job.status {
                JobStatus::Completed => {
                    let stored = runner.result(job_id).await?.context("Completed job has no record")?;
                    let record = &stored.record;
                    info!("✅ Job {} completed", job_id);
                    println!("{} ({} GBP)", record.address, record.price);
                    if let Some(bedrooms) = record.bedrooms {
                        println!("   {} bedrooms", bedrooms);
                    }
                    println!("   Images: {}, floorplans: {}", record.images.len(), record.floorplans.len());
                    println!("   Property ID: {}", stored.id);
                    println!("   URL: {}", record.url);
                }
                _ => {
                    println!("Job {} {}: {}", job_id, job.status, job.error.unwrap_or_default());
                }
            }
            info!("💾 Store saved to {}", settings.store.path.display());
        }
        Command::Status { job_id } => {
            let status = runner.status(job_id).await?;
            println!("Job {}: {}", job_id, status);
        }
        Command::Show { property_id } => {
            let stored = store
                .get(property_id)
                .await?
                .with_context(|| format!("No property with ID {}", property_id))?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
    }

    Ok(())
}
