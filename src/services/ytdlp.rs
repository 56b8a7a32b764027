//! yt-dlp integration
//!
//! The search/download provider is the yt-dlp executable driven over
//! stdio: a flat-playlist search prints one JSON object per ranked result,
//! and a download run merges the selected media into the output template.
//! The provider seam is a trait so the acquisition pipeline can be
//! exercised with scripted results in tests.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Download format: prefer mp4 streams so merges stay remux-only.
const DOWNLOAD_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Exit code yt-dlp uses when `--max-downloads` stops the run.
const EXIT_MAX_DOWNLOADS: i32 = 101;

/// An unverified search result considered for acceptance as a trailer.
#[derive(Debug, Clone)]
pub struct TrailerCandidate {
    pub title: String,
    /// Seconds; flat search results often omit this.
    pub duration: Option<f64>,
    pub uploader: String,
    /// Source locator used to fetch the media.
    pub url: String,
}

/// Download-layer failures, with the sub-reasons callers act on.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The target media already exists at the output path.
    #[error("media already downloaded")]
    AlreadyDownloaded,
    /// The single-item download cap stopped the run.
    #[error("download cap reached")]
    MaxDownloadsReached,
    /// The downloader exited with an unexpected status.
    #[error("yt-dlp exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    /// The process could not be spawned or awaited.
    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}

/// Search/download provider seam.
#[async_trait]
pub trait TrailerProvider: Send + Sync {
    /// Ranked metadata-only search; no media is fetched.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<TrailerCandidate>>;

    /// Download one candidate's media into the output template.
    async fn download(&self, url: &str, output_template: &str) -> Result<(), DownloadError>;
}

/// Fields of interest from `--dump-json` output lines.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchEntry {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

/// Parse one `--dump-json` line into a candidate.
fn parse_search_line(line: &str) -> Option<TrailerCandidate> {
    let entry: SearchEntry = serde_json::from_str(line.trim()).ok()?;
    let url = entry
        .url
        .or(entry.webpage_url)
        .or_else(|| {
            entry
                .id
                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        })?;
    Some(TrailerCandidate {
        title: entry.title.unwrap_or_default(),
        duration: entry.duration,
        uploader: entry
            .uploader
            .or(entry.channel)
            .unwrap_or_else(|| "Unknown".to_string()),
        url,
    })
}

/// yt-dlp subprocess client
pub struct YtDlpClient {
    binary: String,
    show_progress: bool,
    cookies_from_browser: Option<String>,
    cookies_file: Option<String>,
}

impl YtDlpClient {
    pub fn new(
        binary: &str,
        show_progress: bool,
        cookies_from_browser: Option<String>,
        cookies_file: Option<String>,
    ) -> Self {
        Self {
            binary: binary.to_string(),
            show_progress,
            cookies_from_browser,
            cookies_file,
        }
    }

    fn apply_cookie_args(&self, cmd: &mut Command) {
        if let Some(browser) = &self.cookies_from_browser {
            cmd.arg("--cookies-from-browser").arg(browser);
        } else if let Some(file) = &self.cookies_file {
            cmd.arg("--cookies").arg(file);
        }
    }
}

#[async_trait]
impl TrailerProvider for YtDlpClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<TrailerCandidate>> {
        let target = format!("ytsearch{}:{}", max_results.max(1), query);
        debug!(
            query = %query,
            results_url = %format!(
                "https://www.youtube.com/results?search_query={}",
                urlencoding::encode(query)
            ),
            "Running flat trailer search"
        );

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--dump-json")
            .arg("--flat-playlist")
            .arg("--skip-download")
            .arg("--ignore-errors")
            .arg("--no-warnings")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.apply_cookie_args(&mut cmd);
        cmd.arg(&target);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to run {} for search", self.binary))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates: Vec<TrailerCandidate> =
            stdout.lines().filter_map(parse_search_line).collect();

        // Individual entry errors are tolerated; a hard failure is only
        // reported when nothing at all came back.
        if candidates.is_empty() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "yt-dlp search failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }

        debug!(count = candidates.len(), "Search returned candidates");
        Ok(candidates)
    }

    async fn download(&self, url: &str, output_template: &str) -> Result<(), DownloadError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-f")
            .arg(DOWNLOAD_FORMAT)
            .arg("--no-playlist")
            .arg("--max-downloads")
            .arg("1")
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("-o")
            .arg(output_template);
        if !self.show_progress {
            cmd.arg("--quiet").arg("--no-warnings");
        }
        self.apply_cookie_args(&mut cmd);
        cmd.arg(url).stdin(Stdio::null()).stderr(Stdio::piped());

        // Progress goes straight to the console when requested.
        if self.show_progress {
            cmd.stdout(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped());
        }

        let output = cmd.output().await?;
        if output.status.success() {
            return Ok(());
        }

        if output.status.code() == Some(EXIT_MAX_DOWNLOADS) {
            return Err(DownloadError::MaxDownloadsReached);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stderr.contains("has already been downloaded")
            || stdout.contains("has already been downloaded")
        {
            return Err(DownloadError::AlreadyDownloaded);
        }

        Err(DownloadError::Failed {
            status: output.status.code().unwrap_or(-1),
            stderr,
        })
    }
}

impl std::fmt::Debug for YtDlpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YtDlpClient")
            .field("binary", &self.binary)
            .finish()
    }
}
