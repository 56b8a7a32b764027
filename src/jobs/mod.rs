//! Background job scheduling
//!
//! Re-invokes the full library walk once per hour. An overlap guard
//! limits concurrent runs to one instance: a tick that fires while the
//! previous walk is still in flight is skipped with a warning.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::cli::ScanTarget;
use crate::services::LibraryWalker;

/// Wraps the full scan so scheduled ticks share one overlap guard.
pub struct ScanRunner {
    walker: Arc<LibraryWalker>,
    guard: Mutex<()>,
}

impl ScanRunner {
    pub fn new(walker: Arc<LibraryWalker>) -> Self {
        Self {
            walker,
            guard: Mutex::new(()),
        }
    }

    /// Run a full scan unless one is already in flight.
    pub async fn run(&self) {
        match self.guard.try_lock() {
            Ok(_held) => {
                info!("Starting scheduled trailer scan");
                self.walker.run_scan(ScanTarget::Both).await;
                info!("Scheduled trailer scan complete");
            }
            Err(_) => {
                warn!("Previous scan still in progress, skipping this tick");
            }
        }
    }
}

impl std::fmt::Debug for ScanRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanRunner").finish()
    }
}

/// Initialize and start the job scheduler
pub async fn start_scheduler(runner: Arc<ScanRunner>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Trailer scan - run every hour
    let scan_runner = runner.clone();
    let scan_job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
        let runner = scan_runner.clone();
        Box::pin(async move {
            runner.run().await;
        })
    })?;
    scheduler.add(scan_job).await?;

    scheduler.start().await?;

    info!("Job scheduler started");
    Ok(scheduler)
}
