//! External integrations and the acquisition pipeline

pub mod fetcher;
pub mod filters;
pub mod logging;
pub mod matcher;
pub mod planner;
pub mod plex;
pub mod rate_limiter;
pub mod report;
pub mod text_utils;
pub mod walker;
pub mod ytdlp;

pub use fetcher::{DownloadOutcome, TrailerFetcher};
pub use planner::PathMapper;
pub use plex::{MediaItem, PlexClient};
pub use report::RunReport;
pub use walker::{AcquisitionOutcome, LibraryKind, LibraryWalker, MediaKind};
pub use ytdlp::{DownloadError, TrailerCandidate, TrailerProvider, YtDlpClient};
