//! Library walking
//!
//! Iterates library sections item by item: genre-skip policy, presence
//! planning, acquisition, and outcome accumulation. One generic walker
//! covers movies and shows, parameterized over a [LibraryKind] descriptor
//! (naming convention, search-query template, genre list).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cli::ScanTarget;
use crate::config::Config;

use super::fetcher::{DownloadOutcome, TrailerFetcher};
use super::planner::{self, PathMapper};
use super::plex::{MediaItem, PlexClient, PlexSection, PLEX_TYPE_MOVIE, PLEX_TYPE_SHOW};
use super::report::RunReport;

/// Media kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Show,
}

/// Per-kind behavior bundle: filename convention, query template, and
/// genre-skip policy for one walk.
#[derive(Debug, Clone)]
pub struct LibraryKind {
    pub kind: MediaKind,
    pub genres_to_skip: Vec<String>,
}

impl LibraryKind {
    pub fn movie(genres_to_skip: Vec<String>) -> Self {
        Self {
            kind: MediaKind::Movie,
            genres_to_skip,
        }
    }

    pub fn show(genres_to_skip: Vec<String>) -> Self {
        Self {
            kind: MediaKind::Show,
            genres_to_skip,
        }
    }

    pub fn noun(&self) -> &'static str {
        match self.kind {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }

    /// Plex item type id for section-level edits.
    pub fn plex_type_id(&self) -> &'static str {
        match self.kind {
            MediaKind::Movie => PLEX_TYPE_MOVIE,
            MediaKind::Show => PLEX_TYPE_SHOW,
        }
    }

    /// Ranked-search result bound.
    pub fn search_limit(&self) -> usize {
        match self.kind {
            MediaKind::Movie => 10,
            MediaKind::Show => 15,
        }
    }

    /// Release year used for filename and title matching.
    ///
    /// Shows deliberately return `None`: trailer uploads rarely carry a
    /// premiere year, and a year embedded in the show title is still
    /// honored by the matcher itself.
    pub fn item_year(&self, item: &MediaItem) -> Option<i32> {
        match self.kind {
            MediaKind::Movie => item.year,
            MediaKind::Show => None,
        }
    }

    /// Year appended to the canonical trailer filename.
    pub fn filename_year(&self, item: &MediaItem) -> Option<i32> {
        self.item_year(item)
    }

    /// Directory the item's trailer lives beside.
    ///
    /// Movie locations are media file paths, so the parent directory is
    /// the item directory; show locations are the directories themselves.
    pub fn primary_dir(&self, item: &MediaItem) -> Option<PathBuf> {
        let first = item.locations.first()?;
        match self.kind {
            MediaKind::Movie => first.parent().map(PathBuf::from),
            MediaKind::Show => Some(first.clone()),
        }
    }

    /// Build the ranked search query for one item.
    pub fn search_query(
        &self,
        title: &str,
        year: Option<i32>,
        preferred_language: &str,
    ) -> String {
        let base = title
            .replace(" & ", " and ")
            .replace('&', " and ")
            .replace(':', " -");
        let mut query = match (self.kind, year) {
            (MediaKind::Movie, Some(year)) => format!("{} {} movie trailer", base, year),
            (MediaKind::Movie, None) => format!("{} movie trailer", base),
            (MediaKind::Show, _) => format!("{} TV show official trailer", base),
        };
        if !preferred_language.eq_ignore_ascii_case("original") {
            query.push(' ');
            query.push_str(preferred_language);
        }
        query
    }

    /// Case-insensitive intersection with the skip list.
    pub fn genre_skipped(&self, genres: &[String]) -> bool {
        genres.iter().any(|genre| {
            self.genres_to_skip
                .iter()
                .any(|skip| skip.eq_ignore_ascii_case(genre))
        })
    }
}

/// Final state of one item after a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// A genre matched the skip list; nothing else was checked.
    GenreSkipped,
    /// A trailer already exists (server extras or local file).
    AlreadyPresent,
    /// A trailer was downloaded this run.
    Downloaded(PathBuf),
    /// No trailer found and downloading is disabled.
    MissingNoDownload,
    /// Every candidate was rejected or failed to download.
    DownloadFailed(String),
}

/// Walks library sections and accumulates per-item outcomes.
pub struct LibraryWalker {
    plex: Arc<PlexClient>,
    fetcher: TrailerFetcher,
    config: Arc<Config>,
    mapper: PathMapper,
}

impl LibraryWalker {
    pub fn new(plex: Arc<PlexClient>, fetcher: TrailerFetcher, config: Arc<Config>) -> Self {
        let mapper = if config.map_path {
            PathMapper::new(config.path_mappings.clone())
        } else {
            PathMapper::disabled()
        };
        Self {
            plex,
            fetcher,
            config,
            mapper,
        }
    }

    /// Run a full scan over the configured libraries for the target kinds.
    /// Per-library errors are logged and skipped; the scan continues.
    pub async fn run_scan(&self, target: ScanTarget) {
        let mut report = RunReport::new();

        if target.includes_movies() {
            let kind = LibraryKind::movie(self.config.movie_genres_to_skip.clone());
            for library in &self.config.movie_libraries {
                if let Err(e) = self.walk_library(library, &kind, &mut report).await {
                    error!(library = %library, error = format!("{:#}", e), "Error processing library, skipping");
                }
            }
        }

        if target.includes_shows() {
            let kind = LibraryKind::show(self.config.tv_genres_to_skip.clone());
            for library in &self.config.tv_libraries {
                if let Err(e) = self.walk_library(library, &kind, &mut report).await {
                    error!(library = %library, error = format!("{:#}", e), "Error processing library, skipping");
                }
            }
        }

        report.print();
    }

    /// Walk one library section. Per-item failures never abort the walk.
    pub async fn walk_library(
        &self,
        library_name: &str,
        kind: &LibraryKind,
        report: &mut RunReport,
    ) -> Result<()> {
        let section = self
            .plex
            .find_section(library_name)
            .await
            .with_context(|| format!("Failed to look up library '{}'", library_name))?
            .with_context(|| format!("Library '{}' not found", library_name))?;

        let exclude_label = self
            .config
            .use_labels
            .then_some(self.config.processed_label.as_str());
        let listed = self
            .plex
            .section_items(&section.key, exclude_label)
            .await
            .with_context(|| format!("Failed to list items in '{}'", library_name))?;

        info!(
            library = %library_name,
            count = listed.len(),
            "Checking library for missing trailers"
        );

        for (index, summary) in listed.iter().enumerate() {
            info!(
                "[{}] Checking {} {}/{}: {}",
                library_name,
                kind.noun(),
                index + 1,
                listed.len(),
                summary.title
            );

            // Section listings omit show locations; re-fetch full metadata
            // and fall back to the summary when that fails.
            let item = match self.plex.item(&summary.rating_key).await {
                Ok(item) => item,
                Err(e) => {
                    warn!(item = %summary.title, error = %e, "Failed to load item metadata");
                    summary.clone()
                }
            };

            let outcome = self.process_item(&item, kind).await;
            self.apply_side_effects(&section, kind, &item, &outcome).await;
            report.record(library_name, &item, &outcome);
        }

        Ok(())
    }

    /// Decide one item's outcome: genre skip, presence check, acquisition.
    pub async fn process_item(&self, item: &MediaItem, kind: &LibraryKind) -> AcquisitionOutcome {
        if kind.genre_skipped(&item.genres) {
            info!(item = %item.title, genres = ?item.genres, "Skipping item, genre matches skip list");
            return AcquisitionOutcome::GenreSkipped;
        }

        let primary_dir = kind.primary_dir(item).map(|dir| self.mapper.map(&dir));

        let already_present = if self.config.check_plex_extras {
            match self.plex.extras(&item.rating_key).await {
                Ok(extras) => planner::extras_contain_trailer(&extras),
                Err(e) => {
                    warn!(item = %item.title, error = %e, "Extras lookup failed, assuming no trailer");
                    false
                }
            }
        } else {
            match &primary_dir {
                Some(dir) => planner::has_local_trailer(dir),
                None => {
                    warn!(item = %item.title, "Item reports no filesystem location");
                    false
                }
            }
        };

        if already_present {
            return AcquisitionOutcome::AlreadyPresent;
        }
        if !self.config.download_trailers {
            return AcquisitionOutcome::MissingNoDownload;
        }

        let Some(dir) = primary_dir else {
            return AcquisitionOutcome::DownloadFailed(
                "item reports no filesystem location".to_string(),
            );
        };

        match self.fetcher.fetch(kind, item, &dir).await {
            DownloadOutcome::Success(path) => AcquisitionOutcome::Downloaded(path),
            // The file was already on disk, so the item has its trailer;
            // the planner simply could not see it (extras mode).
            DownloadOutcome::AlreadyExists => AcquisitionOutcome::AlreadyPresent,
            DownloadOutcome::Failure(reason) => AcquisitionOutcome::DownloadFailed(reason),
        }
    }

    /// Post-outcome server updates: processed label and metadata refresh.
    /// Failures here are logged and never revert the outcome.
    async fn apply_side_effects(
        &self,
        section: &PlexSection,
        kind: &LibraryKind,
        item: &MediaItem,
        outcome: &AcquisitionOutcome,
    ) {
        let processed = matches!(
            outcome,
            AcquisitionOutcome::AlreadyPresent | AcquisitionOutcome::Downloaded(_)
        );

        // The label marks verified-processed items only; failed downloads
        // stay unlabeled so the next run retries them.
        if processed && self.config.use_labels {
            let label = &self.config.processed_label;
            if item.labels.iter().any(|l| l == label) {
                info!(item = %item.title, label = %label, "Item already labeled");
            } else {
                match self
                    .plex
                    .add_label(&section.key, kind.plex_type_id(), &item.rating_key, label)
                    .await
                {
                    Ok(()) => info!(item = %item.title, label = %label, "Labeled item as processed"),
                    Err(e) => warn!(item = %item.title, error = %e, "Failed to label item"),
                }
            }
        }

        if let AcquisitionOutcome::Downloaded(_) = outcome {
            if self.config.refresh_metadata {
                info!(item = %item.title, "Refreshing metadata");
                if let Err(e) = self.plex.refresh_metadata(&item.rating_key).await {
                    warn!(item = %item.title, error = %e, "Metadata refresh failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for LibraryWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryWalker").finish()
    }
}
