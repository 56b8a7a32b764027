//! Entry point: configuration, startup checks, and run-mode dispatch.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use trailarian::cli::{CliOptions, RunMode, ScanTarget};
use trailarian::config::Config;
use trailarian::jobs;
use trailarian::services::{
    LibraryWalker, PlexClient, TrailerFetcher, YtDlpClient, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args();

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(Config::default_path);
    let config = Arc::new(Config::load(&config_path)?);

    logging::init(&config.logs_dir)?;
    info!(config = %config_path.display(), "Starting trailarian");
    config.log_effective();

    // Connectivity and library checks are fatal: a bad URL, token, or
    // library name should surface before any item processing.
    let plex = Arc::new(PlexClient::new(&config.plex_url, &config.plex_token));
    plex.check_connection()
        .await
        .context("Connection to Plex failed - verify PLEX_URL and PLEX_TOKEN")?;

    for name in config.movie_libraries.iter().chain(&config.tv_libraries) {
        let section = plex
            .find_section(name)
            .await
            .with_context(|| format!("Failed to look up library '{}'", name))?;
        match section {
            Some(section) => {
                info!(library = %name, section_key = %section.key, "Library check ok")
            }
            None => bail!(
                "Library '{}' not found - verify the name in {}",
                name,
                config_path.display()
            ),
        }
    }

    let provider = Arc::new(YtDlpClient::new(
        &config.yt_dlp_path,
        config.show_download_progress,
        config.cookies_from_browser.clone(),
        config.cookies_file.clone(),
    ));
    let fetcher = TrailerFetcher::new(
        provider,
        config.skip_channels.clone(),
        config.preferred_language.clone(),
    );
    let walker = Arc::new(LibraryWalker::new(plex, fetcher, config.clone()));

    let mode = options
        .run_mode_override
        .unwrap_or_else(|| RunMode::from_launch_method(&config.launch_method));

    match mode {
        RunMode::Once(target) => walker.run_scan(target).await,
        RunMode::Menu => {
            let target = prompt_for_target(&config)?;
            walker.run_scan(target).await;
        }
        RunMode::Scheduled => {
            let runner = Arc::new(jobs::ScanRunner::new(walker));
            let _scheduler = jobs::start_scheduler(runner.clone()).await?;

            // First pass shortly after startup, then hourly.
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                runner.run().await;
            });

            info!("Scheduler running, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
        }
    }

    Ok(())
}

fn prompt_for_target(config: &Config) -> Result<ScanTarget> {
    println!();
    println!("Choose an option:");
    println!("1 = {}", config.movie_libraries.join(", "));
    println!("2 = {}", config.tv_libraries.join(", "));
    println!("3 = Both consecutively");
    print!("Enter your choice: ");
    io::stdout().flush()?;

    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;
    match choice.trim() {
        "1" => Ok(ScanTarget::Movies),
        "2" => Ok(ScanTarget::Shows),
        "3" => Ok(ScanTarget::Both),
        other => bail!("Invalid choice '{}'", other),
    }
}
