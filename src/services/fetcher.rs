//! Trailer acquisition
//!
//! Runs one item's search, filter, download, verify pipeline. Candidates
//! are tried in rank order; the first to pass the uploader, duration, and
//! title gates is downloaded. The canonical file's existence on disk is
//! the ground truth for success, not the absence of errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::filters;
use super::matcher;
use super::planner;
use super::plex::MediaItem;
use super::walker::LibraryKind;
use super::ytdlp::{DownloadError, TrailerProvider};

/// Result of one acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The canonical trailer file was already on disk.
    AlreadyExists,
    /// A trailer was downloaded to the given path.
    Success(PathBuf),
    /// No candidate produced the final file.
    Failure(String),
}

/// Acquires trailers through a [TrailerProvider].
pub struct TrailerFetcher {
    provider: Arc<dyn TrailerProvider>,
    skip_channels: Vec<String>,
    preferred_language: String,
}

impl TrailerFetcher {
    pub fn new(
        provider: Arc<dyn TrailerProvider>,
        skip_channels: Vec<String>,
        preferred_language: String,
    ) -> Self {
        Self {
            provider,
            skip_channels,
            preferred_language,
        }
    }

    /// Acquire a trailer for one item into its `Trailers` directory.
    ///
    /// Idempotent: when the canonical file already exists nothing is
    /// searched or downloaded.
    pub async fn fetch(
        &self,
        kind: &LibraryKind,
        item: &MediaItem,
        primary_dir: &Path,
    ) -> DownloadOutcome {
        let year = kind.item_year(item);
        let basename = planner::trailer_basename(&item.title, kind.filename_year(item));
        let dest = planner::plan_destination(primary_dir, &basename);

        if let Err(e) = fs::create_dir_all(&dest.trailers_dir) {
            return DownloadOutcome::Failure(format!(
                "cannot create {}: {}",
                dest.trailers_dir.display(),
                e
            ));
        }

        if dest.final_path.exists() {
            debug!(file = %dest.final_path.display(), "Trailer file already present");
            return DownloadOutcome::AlreadyExists;
        }

        let query = kind.search_query(&item.title, year, &self.preferred_language);
        info!(item = %item.title, query = %query, "Searching for trailer");

        let candidates = match self.provider.search(&query, kind.search_limit()).await {
            Ok(candidates) => candidates,
            Err(e) => {
                planner::cleanup_partial_files(&dest);
                return DownloadOutcome::Failure(format!("search failed: {:#}", e));
            }
        };

        if candidates.is_empty() {
            return DownloadOutcome::Failure("search returned no candidates".to_string());
        }

        for candidate in &candidates {
            debug!(
                candidate = %candidate.title,
                duration = ?candidate.duration,
                uploader = %candidate.uploader,
                "Considering candidate"
            );

            if filters::uploader_denied(&candidate.uploader, &self.skip_channels) {
                debug!(uploader = %candidate.uploader, "Skipping candidate: uploader on denylist");
                continue;
            }
            if filters::exceeds_duration_ceiling(candidate.duration) {
                debug!(duration = ?candidate.duration, "Skipping candidate: exceeds duration ceiling");
                continue;
            }
            let Some(rule) = matcher::title_matches(&candidate.title, &item.title, year) else {
                debug!(candidate = %candidate.title, "Skipping candidate: title does not match");
                continue;
            };
            debug!(rule = ?rule, candidate = %candidate.title, "Candidate accepted, downloading");

            match self
                .provider
                .download(&candidate.url, &dest.output_template)
                .await
            {
                Ok(()) => {}
                // The cap or dedup firing usually means the file just
                // landed; the existence check below decides.
                Err(DownloadError::AlreadyDownloaded | DownloadError::MaxDownloadsReached) => {}
                Err(e) => {
                    warn!(candidate = %candidate.title, error = %e, "Candidate download failed");
                    continue;
                }
            }

            if dest.final_path.exists() {
                planner::cleanup_partial_files(&dest);
                info!(item = %item.title, file = %dest.final_path.display(), "Trailer downloaded");
                return DownloadOutcome::Success(dest.final_path.clone());
            }
            debug!(candidate = %candidate.title, "Download produced no final file, trying next candidate");
        }

        planner::cleanup_partial_files(&dest);
        DownloadOutcome::Failure("no suitable candidate passed all filters".to_string())
    }
}

impl std::fmt::Debug for TrailerFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrailerFetcher").finish()
    }
}
