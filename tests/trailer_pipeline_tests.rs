//! Integration tests for the trailer acquisition pipeline
//!
//! These tests verify the complete flow with a scripted provider:
//! - Fetcher idempotence and candidate filtering
//! - Partial-file cleanup
//! - Walker state transitions and run-report bucketing

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use assert_matches::assert_matches;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use trailarian::config::Config;
use trailarian::services::{
    AcquisitionOutcome, DownloadError, DownloadOutcome, LibraryKind, LibraryWalker, MediaItem,
    PlexClient, RunReport, TrailerCandidate, TrailerFetcher, TrailerProvider,
};

// ============================================================================
// Scripted provider
// ============================================================================

/// Provider that returns canned candidates and writes a stub file on
/// download, recording each requested URL.
struct ScriptedProvider {
    candidates: Vec<TrailerCandidate>,
    downloads: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(candidates: Vec<TrailerCandidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            downloads: Mutex::new(Vec::new()),
        })
    }

    fn download_urls(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrailerProvider for ScriptedProvider {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<TrailerCandidate>> {
        Ok(self.candidates.clone())
    }

    async fn download(&self, url: &str, output_template: &str) -> Result<(), DownloadError> {
        self.downloads.lock().unwrap().push(url.to_string());
        let path = output_template.replace("%(ext)s", "mp4");
        std::fs::write(&path, b"video")?;
        Ok(())
    }
}

fn candidate(title: &str, duration: Option<f64>, uploader: &str, url: &str) -> TrailerCandidate {
    TrailerCandidate {
        title: title.to_string(),
        duration,
        uploader: uploader.to_string(),
        url: url.to_string(),
    }
}

fn movie_item(title: &str, year: Option<i32>, genres: &[&str], file: &str) -> MediaItem {
    MediaItem {
        rating_key: title.to_string(),
        title: title.to_string(),
        year,
        genres: genres.iter().map(|s| s.to_string()).collect(),
        labels: Vec::new(),
        locations: vec![PathBuf::from(file)],
    }
}

fn test_config(download_trailers: bool) -> Arc<Config> {
    Arc::new(Config {
        plex_url: "http://localhost:32400".to_string(),
        plex_token: "test-token".to_string(),
        movie_libraries: vec!["Movies".to_string()],
        tv_libraries: Vec::new(),
        movie_genres_to_skip: vec!["Documentary".to_string()],
        tv_genres_to_skip: Vec::new(),
        download_trailers,
        refresh_metadata: false,
        preferred_language: "original".to_string(),
        show_download_progress: false,
        check_plex_extras: false,
        map_path: false,
        path_mappings: Vec::new(),
        skip_channels: vec!["Fake Trailers".to_string()],
        use_labels: false,
        processed_label: "trailarian".to_string(),
        launch_method: "3".to_string(),
        yt_dlp_path: "yt-dlp".to_string(),
        cookies_from_browser: None,
        cookies_file: None,
        logs_dir: PathBuf::from("logs"),
    })
}

fn fetcher_with(provider: Arc<ScriptedProvider>, config: &Config) -> TrailerFetcher {
    TrailerFetcher::new(
        provider,
        config.skip_channels.clone(),
        config.preferred_language.clone(),
    )
}

fn walker_with(provider: Arc<ScriptedProvider>, config: Arc<Config>) -> LibraryWalker {
    let plex = Arc::new(PlexClient::new(&config.plex_url, &config.plex_token));
    let fetcher = fetcher_with(provider, &config);
    LibraryWalker::new(plex, fetcher, config)
}

// ============================================================================
// Fetcher tests
// ============================================================================

#[tokio::test]
async fn test_fetch_downloads_matching_candidate() {
    let dir = tempdir().unwrap();
    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Avatar (2009) Official Trailer",
        Some(120.0),
        "Studio Channel",
        "https://example.invalid/v/good",
    )]);
    let fetcher = fetcher_with(provider.clone(), &config);

    let item = movie_item("Avatar", Some(2009), &[], "/ignored/Avatar (2009).mkv");
    let kind = LibraryKind::movie(Vec::new());
    let outcome = fetcher.fetch(&kind, &item, dir.path()).await;

    let expected = dir.path().join("Trailers").join("Avatar (2009)-trailer.mp4");
    assert_eq!(outcome, DownloadOutcome::Success(expected.clone()));
    assert!(expected.exists());
    assert_eq!(
        provider.download_urls(),
        vec!["https://example.invalid/v/good".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let dir = tempdir().unwrap();
    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Avatar (2009) Official Trailer",
        Some(120.0),
        "Studio Channel",
        "https://example.invalid/v/good",
    )]);
    let fetcher = fetcher_with(provider.clone(), &config);

    let item = movie_item("Avatar", Some(2009), &[], "/ignored/Avatar (2009).mkv");
    let kind = LibraryKind::movie(Vec::new());

    let first = fetcher.fetch(&kind, &item, dir.path()).await;
    assert_matches!(first, DownloadOutcome::Success(_));

    let second = fetcher.fetch(&kind, &item, dir.path()).await;
    assert_eq!(second, DownloadOutcome::AlreadyExists);

    // No second download happened.
    assert_eq!(provider.download_urls().len(), 1);
}

#[tokio::test]
async fn test_fetch_applies_filters_in_rank_order() {
    let dir = tempdir().unwrap();
    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![
        candidate(
            "Avatar (2009) Trailer",
            Some(90.0),
            "Fake Trailers HD",
            "https://example.invalid/v/denied-uploader",
        ),
        candidate(
            "Avatar (2009) Full Movie",
            Some(9000.0),
            "Studio Channel",
            "https://example.invalid/v/too-long",
        ),
        candidate(
            "Unrelated Cat Video 2009",
            Some(60.0),
            "Studio Channel",
            "https://example.invalid/v/wrong-title",
        ),
        candidate(
            "Avatar (2009) Official Trailer",
            None,
            "Studio Channel",
            "https://example.invalid/v/good",
        ),
    ]);
    let fetcher = fetcher_with(provider.clone(), &config);

    let item = movie_item("Avatar", Some(2009), &[], "/ignored/Avatar (2009).mkv");
    let kind = LibraryKind::movie(Vec::new());
    let outcome = fetcher.fetch(&kind, &item, dir.path()).await;

    assert_matches!(outcome, DownloadOutcome::Success(_));
    assert_eq!(
        provider.download_urls(),
        vec!["https://example.invalid/v/good".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_fails_when_no_candidate_acceptable() {
    let dir = tempdir().unwrap();
    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Completely Different Title",
        Some(90.0),
        "Studio Channel",
        "https://example.invalid/v/unrelated",
    )]);
    let fetcher = fetcher_with(provider.clone(), &config);

    let item = movie_item("Avatar", Some(2009), &[], "/ignored/Avatar (2009).mkv");
    let kind = LibraryKind::movie(Vec::new());
    let outcome = fetcher.fetch(&kind, &item, dir.path()).await;

    assert_matches!(outcome, DownloadOutcome::Failure(_));
    assert!(provider.download_urls().is_empty());
    assert!(!dir
        .path()
        .join("Trailers")
        .join("Avatar (2009)-trailer.mp4")
        .exists());
}

#[tokio::test]
async fn test_fetch_cleans_partial_artifacts() {
    let dir = tempdir().unwrap();
    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Avatar (2009) Official Trailer",
        Some(120.0),
        "Studio Channel",
        "https://example.invalid/v/good",
    )]);
    let fetcher = fetcher_with(provider, &config);

    // Leftovers from an interrupted earlier run.
    let trailers = dir.path().join("Trailers");
    std::fs::create_dir_all(&trailers).unwrap();
    std::fs::write(trailers.join("Avatar (2009)-trailer.part"), b"junk").unwrap();
    std::fs::write(trailers.join("Avatar (2009)-trailer.webm"), b"junk").unwrap();

    let item = movie_item("Avatar", Some(2009), &[], "/ignored/Avatar (2009).mkv");
    let kind = LibraryKind::movie(Vec::new());
    let outcome = fetcher.fetch(&kind, &item, dir.path()).await;

    assert_matches!(outcome, DownloadOutcome::Success(_));
    assert!(trailers.join("Avatar (2009)-trailer.mp4").exists());
    assert!(!trailers.join("Avatar (2009)-trailer.part").exists());
    assert!(!trailers.join("Avatar (2009)-trailer.webm").exists());
}

// ============================================================================
// Walker tests
// ============================================================================

#[tokio::test]
async fn test_walk_three_items_one_per_bucket() {
    let library = tempdir().unwrap();

    // Item 1: documentary, skipped by genre.
    let doc_dir = library.path().join("Some Documentary (2019)");
    std::fs::create_dir_all(&doc_dir).unwrap();
    let doc_file = doc_dir.join("Some Documentary (2019).mkv");
    std::fs::write(&doc_file, b"x").unwrap();

    // Item 2: already has a local trailer beside the media.
    let present_dir = library.path().join("Covered (2018)");
    std::fs::create_dir_all(&present_dir).unwrap();
    let present_file = present_dir.join("Covered (2018).mkv");
    std::fs::write(&present_file, b"x").unwrap();
    std::fs::write(present_dir.join("Covered (2018)-trailer.mp4"), b"x").unwrap();

    // Item 3: nothing yet, a matching candidate is available.
    let wanted_dir = library.path().join("Wanted (2020)");
    std::fs::create_dir_all(&wanted_dir).unwrap();
    let wanted_file = wanted_dir.join("Wanted (2020).mkv");
    std::fs::write(&wanted_file, b"x").unwrap();

    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Wanted (2020) Official Trailer",
        Some(110.0),
        "Studio Channel",
        "https://example.invalid/v/wanted",
    )]);
    let walker = walker_with(provider, config.clone());
    let kind = LibraryKind::movie(config.movie_genres_to_skip.clone());

    let items = vec![
        movie_item(
            "Some Documentary",
            Some(2019),
            &["Documentary"],
            doc_file.to_str().unwrap(),
        ),
        movie_item("Covered", Some(2018), &[], present_file.to_str().unwrap()),
        movie_item("Wanted", Some(2020), &[], wanted_file.to_str().unwrap()),
    ];

    let mut report = RunReport::new();
    let mut outcomes = Vec::new();
    for item in &items {
        let outcome = walker.process_item(item, &kind).await;
        report.record("Movies", item, &outcome);
        outcomes.push(outcome);
    }

    assert_eq!(outcomes[0], AcquisitionOutcome::GenreSkipped);
    assert_eq!(outcomes[1], AcquisitionOutcome::AlreadyPresent);
    assert_matches!(outcomes[2], AcquisitionOutcome::Downloaded(_));

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.downloaded.len(), 1);
    assert_eq!(report.missing.len(), 0);
    assert_eq!(report.failed.len(), 0);
    assert_eq!(report.skipped[0].title, "Some Documentary");
    assert_eq!(report.downloaded[0].title, "Wanted");

    assert!(wanted_dir
        .join("Trailers")
        .join("Wanted (2020)-trailer.mp4")
        .exists());
}

#[tokio::test]
async fn test_walk_missing_when_downloads_disabled() {
    let library = tempdir().unwrap();
    let item_dir = library.path().join("Bare (2021)");
    std::fs::create_dir_all(&item_dir).unwrap();
    let item_file = item_dir.join("Bare (2021).mkv");
    std::fs::write(&item_file, b"x").unwrap();

    let config = test_config(false);
    let provider = ScriptedProvider::new(Vec::new());
    let walker = walker_with(provider, config.clone());
    let kind = LibraryKind::movie(config.movie_genres_to_skip.clone());

    let item = movie_item("Bare", Some(2021), &[], item_file.to_str().unwrap());
    let outcome = walker.process_item(&item, &kind).await;
    assert_eq!(outcome, AcquisitionOutcome::MissingNoDownload);
}

#[tokio::test]
async fn test_walk_failed_download_lands_in_failed_bucket() {
    let library = tempdir().unwrap();
    let item_dir = library.path().join("Unlucky (2022)");
    std::fs::create_dir_all(&item_dir).unwrap();
    let item_file = item_dir.join("Unlucky (2022).mkv");
    std::fs::write(&item_file, b"x").unwrap();

    let config = test_config(true);
    let provider = ScriptedProvider::new(vec![candidate(
        "Nothing To Do With It",
        Some(60.0),
        "Studio Channel",
        "https://example.invalid/v/no",
    )]);
    let walker = walker_with(provider, config.clone());
    let kind = LibraryKind::movie(config.movie_genres_to_skip.clone());

    let item = movie_item("Unlucky", Some(2022), &[], item_file.to_str().unwrap());
    let outcome = walker.process_item(&item, &kind).await;
    assert_matches!(outcome, AcquisitionOutcome::DownloadFailed(_));

    let mut report = RunReport::new();
    report.record("Movies", &item, &outcome);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.missing.len(), 0);
}
