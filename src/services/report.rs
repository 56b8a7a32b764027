//! Run summary reporting
//!
//! Collects per-item outcomes into four buckets and prints them at run
//! end. An item lands in at most one bucket; items that already had a
//! trailer are not reported at all.

use std::time::{Duration, Instant};

use super::plex::MediaItem;
use super::walker::AcquisitionOutcome;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// One reported item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub title: String,
    pub year: Option<i32>,
    pub library: String,
}

impl ReportEntry {
    fn line(&self) -> String {
        match self.year {
            Some(year) => format!("[{}] {} ({})", self.library, self.title, year),
            None => format!("[{}] {}", self.library, self.title),
        }
    }
}

/// Accumulated outcomes for one run.
#[derive(Debug)]
pub struct RunReport {
    pub skipped: Vec<ReportEntry>,
    pub missing: Vec<ReportEntry>,
    pub downloaded: Vec<ReportEntry>,
    pub failed: Vec<ReportEntry>,
    started: Instant,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            skipped: Vec::new(),
            missing: Vec::new(),
            downloaded: Vec::new(),
            failed: Vec::new(),
            started: Instant::now(),
        }
    }

    /// File an item's outcome into its bucket.
    pub fn record(&mut self, library: &str, item: &MediaItem, outcome: &AcquisitionOutcome) {
        let entry = ReportEntry {
            title: item.title.clone(),
            year: item.year,
            library: library.to_string(),
        };
        match outcome {
            AcquisitionOutcome::GenreSkipped => self.skipped.push(entry),
            AcquisitionOutcome::MissingNoDownload => self.missing.push(entry),
            AcquisitionOutcome::Downloaded(_) => self.downloaded.push(entry),
            AcquisitionOutcome::DownloadFailed(_) => self.failed.push(entry),
            AcquisitionOutcome::AlreadyPresent => {}
        }
    }

    /// Nothing missing, nothing failed, nothing newly downloaded.
    pub fn all_clear(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty() && self.downloaded.is_empty()
    }

    /// Print the categorized summary and the run duration.
    pub fn print(&self) {
        print_bucket("Skipped (matching genre):", YELLOW, &self.skipped);
        print_bucket("Missing trailers:", RED, &self.missing);
        print_bucket("Successfully downloaded trailers:", GREEN, &self.downloaded);
        print_bucket("Failed trailer downloads:", RED, &self.failed);

        if self.all_clear() {
            println!();
            println!("{}No missing trailers!{}", GREEN, RESET);
        }

        println!();
        println!(
            "{}Run time: {}{}",
            BLUE,
            format_duration(self.started.elapsed()),
            RESET
        );
    }
}

fn print_bucket(header: &str, color: &str, entries: &[ReportEntry]) {
    if entries.is_empty() {
        return;
    }
    let mut lines: Vec<String> = entries.iter().map(ReportEntry::line).collect();
    lines.sort();
    println!();
    println!("{}{}{}", color, header, RESET);
    for line in lines {
        println!("{}", line);
    }
}

/// Format a duration as `H:MM:SS`.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
