//! Application configuration management
//!
//! Settings load from a YAML file (`config/config.yml` or `./config.yml`),
//! with environment overrides for the server URL and token so deployments
//! can keep credentials out of the file. The struct is built once at
//! startup and passed by reference into every component.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

/// A YAML value that may be written as a comma-separated string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => parse_name_list(&s),
            StringOrList::Many(v) => v
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Raw YAML shape, keys matching the shipped config.yml.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    #[serde(rename = "PLEX_URL")]
    plex_url: Option<String>,
    #[serde(rename = "PLEX_TOKEN")]
    plex_token: Option<String>,
    #[serde(rename = "MOVIE_LIBRARY_NAME")]
    movie_library_name: Option<String>,
    #[serde(rename = "TV_LIBRARY_NAME")]
    tv_library_name: Option<String>,
    #[serde(rename = "MOVIE_GENRES_TO_SKIP")]
    movie_genres_to_skip: Option<StringOrList>,
    #[serde(rename = "TV_GENRES_TO_SKIP")]
    tv_genres_to_skip: Option<StringOrList>,
    #[serde(rename = "DOWNLOAD_TRAILERS")]
    download_trailers: Option<bool>,
    #[serde(rename = "REFRESH_METADATA")]
    refresh_metadata: Option<bool>,
    #[serde(rename = "PREFERRED_LANGUAGE")]
    preferred_language: Option<String>,
    #[serde(rename = "SHOW_DOWNLOAD_PROGRESS", alias = "SHOW_YT_DLP_PROGRESS")]
    show_download_progress: Option<bool>,
    #[serde(rename = "CHECK_PLEX_PASS_TRAILERS")]
    check_plex_extras: Option<bool>,
    #[serde(rename = "MAP_PATH")]
    map_path: Option<bool>,
    #[serde(rename = "PATH_MAPPINGS")]
    path_mappings: Option<BTreeMap<String, String>>,
    #[serde(rename = "SKIP_CHANNELS")]
    skip_channels: Option<StringOrList>,
    #[serde(rename = "USE_LABELS")]
    use_labels: Option<bool>,
    #[serde(rename = "PROCESSED_LABEL")]
    processed_label: Option<String>,
    #[serde(rename = "LAUNCH_METHOD")]
    launch_method: Option<String>,
    #[serde(rename = "YT_DLP_PATH")]
    yt_dlp_path: Option<String>,
    #[serde(rename = "YT_DLP_COOKIES_FROM_BROWSER")]
    cookies_from_browser: Option<String>,
    #[serde(rename = "YT_DLP_COOKIES_FILE")]
    cookies_file: Option<String>,
    #[serde(rename = "LOGS_DIR")]
    logs_dir: Option<String>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Plex server base URL, e.g. `http://localhost:32400`.
    pub plex_url: String,
    /// Plex authentication token (overridable via `PLEX_TOKEN`).
    pub plex_token: String,
    /// Movie library section names.
    pub movie_libraries: Vec<String>,
    /// TV library section names.
    pub tv_libraries: Vec<String>,
    /// Genres that exclude a movie from processing.
    pub movie_genres_to_skip: Vec<String>,
    /// Genres that exclude a show from processing.
    pub tv_genres_to_skip: Vec<String>,
    /// Whether to download missing trailers or only report them.
    pub download_trailers: bool,
    /// Refresh server metadata after a successful download.
    pub refresh_metadata: bool,
    /// Extra search keyword when not "original".
    pub preferred_language: String,
    /// Pass provider output through instead of running quiet.
    pub show_download_progress: bool,
    /// Detect existing trailers via server extras instead of the filesystem.
    pub check_plex_extras: bool,
    /// Enable path prefix remapping of server-reported locations.
    pub map_path: bool,
    /// Source-prefix to local-prefix remapping table.
    pub path_mappings: Vec<(String, String)>,
    /// Uploader denylist (case-insensitive substrings).
    pub skip_channels: Vec<String>,
    /// Tag processed items and exclude them from future scans.
    pub use_labels: bool,
    /// Label used for the incremental mode.
    pub processed_label: String,
    /// Launch behavior: "0" menu, "1" movies, "2" shows, "3" both,
    /// "schedule" hourly daemon.
    pub launch_method: String,
    /// yt-dlp executable (name or path).
    pub yt_dlp_path: String,
    /// Browser to read cookies from, passed to yt-dlp.
    pub cookies_from_browser: Option<String>,
    /// Netscape cookie file, passed to yt-dlp.
    pub cookies_file: Option<String>,
    /// Directory for per-run log files.
    pub logs_dir: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file, applying env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let raw: RawConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Self::from_raw(raw)
    }

    /// Pick the conventional config location: `config/config.yml` when the
    /// container layout is present, else `./config.yml`.
    pub fn default_path() -> PathBuf {
        let container = PathBuf::from("config/config.yml");
        if container.exists() {
            container
        } else {
            PathBuf::from("config.yml")
        }
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let plex_url = env::var("PLEX_URL")
            .ok()
            .or(raw.plex_url)
            .context("PLEX_URL is required (config file or environment)")?;
        let plex_token = env::var("PLEX_TOKEN")
            .ok()
            .or(raw.plex_token)
            .context("PLEX_TOKEN is required (config file or environment)")?;

        let movie_libraries = parse_name_list(raw.movie_library_name.as_deref().unwrap_or(""));
        let tv_libraries = parse_name_list(raw.tv_library_name.as_deref().unwrap_or(""));
        if movie_libraries.is_empty() && tv_libraries.is_empty() {
            bail!("No libraries configured: set MOVIE_LIBRARY_NAME and/or TV_LIBRARY_NAME");
        }

        Ok(Self {
            plex_url: plex_url.trim_end_matches('/').to_string(),
            plex_token,
            movie_libraries,
            tv_libraries,
            movie_genres_to_skip: raw
                .movie_genres_to_skip
                .map(StringOrList::into_vec)
                .unwrap_or_default(),
            tv_genres_to_skip: raw
                .tv_genres_to_skip
                .map(StringOrList::into_vec)
                .unwrap_or_default(),
            download_trailers: raw.download_trailers.unwrap_or(true),
            refresh_metadata: raw.refresh_metadata.unwrap_or(false),
            preferred_language: raw
                .preferred_language
                .unwrap_or_else(|| "original".to_string()),
            show_download_progress: raw.show_download_progress.unwrap_or(true),
            check_plex_extras: raw.check_plex_extras.unwrap_or(true),
            map_path: raw.map_path.unwrap_or(false),
            path_mappings: raw
                .path_mappings
                .map(|m| m.into_iter().collect())
                .unwrap_or_default(),
            skip_channels: raw
                .skip_channels
                .map(StringOrList::into_vec)
                .unwrap_or_default(),
            use_labels: raw.use_labels.unwrap_or(false),
            processed_label: raw
                .processed_label
                .unwrap_or_else(|| "trailarian".to_string()),
            launch_method: raw.launch_method.unwrap_or_else(|| "0".to_string()),
            yt_dlp_path: raw.yt_dlp_path.unwrap_or_else(|| "yt-dlp".to_string()),
            cookies_from_browser: raw.cookies_from_browser,
            cookies_file: raw.cookies_file,
            logs_dir: PathBuf::from(raw.logs_dir.unwrap_or_else(|| "logs".to_string())),
        })
    }

    /// Echo the effective settings at run start (token excluded).
    pub fn log_effective(&self) {
        info!(plex_url = %self.plex_url, "Configuration for this run");
        info!(libraries = ?self.movie_libraries, genres_to_skip = ?self.movie_genres_to_skip, "Movie libraries");
        info!(libraries = ?self.tv_libraries, genres_to_skip = ?self.tv_genres_to_skip, "TV libraries");
        info!(
            download_trailers = self.download_trailers,
            refresh_metadata = self.refresh_metadata,
            check_plex_extras = self.check_plex_extras,
            use_labels = self.use_labels,
            preferred_language = %self.preferred_language,
            "Acquisition settings"
        );
        if self.map_path {
            for (src, dst) in &self.path_mappings {
                info!(from = %src, to = %dst, "Path mapping");
            }
        }
        if !self.skip_channels.is_empty() {
            info!(channels = ?self.skip_channels, "Uploader denylist");
        }
    }
}

/// Parse a comma-separated name list, trimming whitespace.
pub fn parse_name_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
