//! Trailer presence detection and destination planning
//!
//! Decides whether a library item already has a local trailer and where a
//! new one belongs. The canonical location is a `Trailers` subdirectory
//! beside the item's media; a file whose stem ends in `-trailer` (or any
//! video inside `Trailers/`) is definitive proof of presence.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::plex::PlexExtra;

/// Video extensions recognized when probing for existing trailers.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".mov", ".avi", ".wmv"];

/// Longest-prefix-first path substitution for setups where the server
/// reports media paths under a different mount than the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    mappings: Vec<(String, String)>,
}

impl PathMapper {
    /// Build a mapper. Prefixes apply longest-first so the most specific
    /// mapping wins.
    pub fn new(mut mappings: Vec<(String, String)>) -> Self {
        mappings.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { mappings }
    }

    /// A mapper that passes every path through unchanged.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Apply the first matching prefix substitution.
    pub fn map(&self, path: &Path) -> PathBuf {
        let original = path.to_string_lossy();
        for (src, dst) in &self.mappings {
            if let Some(rest) = original.strip_prefix(src.as_str()) {
                let mapped = format!("{}{}", dst, rest);
                debug!(from = %original, to = %mapped, "Mapped item path");
                return PathBuf::from(mapped);
            }
        }
        path.to_path_buf()
    }
}

/// Check a filename against the recognized video extensions.
pub fn is_video_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn stem_ends_in_trailer(name: &str) -> bool {
    let lower = name.to_lowercase();
    Path::new(&lower)
        .file_stem()
        .map(|stem| stem.to_string_lossy().ends_with("-trailer"))
        .unwrap_or(false)
}

/// Whether any server-side extra is classified as a trailer clip.
pub fn extras_contain_trailer(extras: &[PlexExtra]) -> bool {
    extras.iter().any(PlexExtra::is_trailer)
}

/// Filesystem-mode presence probe.
///
/// True iff the directory holds a video file whose stem ends in
/// `-trailer`, or a `Trailers` subdirectory with at least one video file.
/// An unlistable directory counts as "not present" with a warning; the
/// walker treats that item conservatively rather than aborting the run.
pub fn has_local_trailer(directory: &Path) -> bool {
    if !directory.is_dir() {
        warn!(directory = %directory.display(), "Cannot access item directory");
        return false;
    }

    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "Error listing item directory");
                return false;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if is_video_file(&name) && stem_ends_in_trailer(&name) {
            return true;
        }
    }

    let trailers_dir = directory.join("Trailers");
    if trailers_dir.is_dir() {
        for entry in WalkDir::new(&trailers_dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(directory = %trailers_dir.display(), error = %e, "Error listing Trailers directory");
                    return false;
                }
            };
            if is_video_file(&entry.file_name().to_string_lossy()) {
                return true;
            }
        }
    }

    false
}

/// Canonical trailer file stem, e.g. `"Avatar (2009)-trailer"`.
///
/// Colons become `" -"` before filename sanitization so subtitle-style
/// titles stay readable on disk.
pub fn trailer_basename(title: &str, year: Option<i32>) -> String {
    let sanitized = sanitize_filename::sanitize(title.replace(':', " -"));
    match year {
        Some(year) => format!("{} ({})-trailer", sanitized, year),
        None => format!("{}-trailer", sanitized),
    }
}

/// Planned destination for one acquisition.
#[derive(Debug, Clone)]
pub struct TrailerDestination {
    /// `Trailers` subdirectory beside the item's media.
    pub trailers_dir: PathBuf,
    /// Canonical final file; its existence is the success ground truth.
    pub final_path: PathBuf,
    /// Output template handed to the downloader (extension filled in).
    pub output_template: String,
    /// Stem shared by the final file and partial artifacts.
    pub basename: String,
}

/// Compute the destination paths for one item.
pub fn plan_destination(primary_dir: &Path, basename: &str) -> TrailerDestination {
    let trailers_dir = primary_dir.join("Trailers");
    let final_path = trailers_dir.join(format!("{}.mp4", basename));
    let output_template = trailers_dir
        .join(format!("{}.%(ext)s", basename))
        .to_string_lossy()
        .into_owned();
    TrailerDestination {
        trailers_dir,
        final_path,
        output_template,
        basename: basename.to_string(),
    }
}

/// Remove partial artifacts sharing the trailer stem but not the final
/// extension. Interrupted downloads leave `.part`/`.webm` style siblings
/// behind; the canonical `.mp4` is never touched.
pub fn cleanup_partial_files(dest: &TrailerDestination) {
    let prefix = format!("{}.", dest.basename);
    for entry in WalkDir::new(&dest.trailers_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && !name.ends_with(".mp4") {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                warn!(file = %entry.path().display(), error = %e, "Failed to delete partial download");
            } else {
                debug!(file = %entry.path().display(), "Removed partial download");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_path_mapper_longest_prefix_first() {
        let mapper = PathMapper::new(vec![
            ("/data".to_string(), "/mnt/a".to_string()),
            ("/data/movies".to_string(), "/mnt/movies".to_string()),
        ]);
        assert_eq!(
            mapper.map(Path::new("/data/movies/Avatar")),
            PathBuf::from("/mnt/movies/Avatar")
        );
        assert_eq!(
            mapper.map(Path::new("/data/tv/Severance")),
            PathBuf::from("/mnt/a/tv/Severance")
        );
        assert_eq!(
            mapper.map(Path::new("/elsewhere/x")),
            PathBuf::from("/elsewhere/x")
        );
    }

    #[test]
    fn test_trailer_basename() {
        assert_eq!(
            trailer_basename("Avatar", Some(2009)),
            "Avatar (2009)-trailer"
        );
        assert_eq!(trailer_basename("Severance", None), "Severance-trailer");
        assert_eq!(
            trailer_basename("Mission: Impossible", None),
            "Mission - Impossible-trailer"
        );
    }

    #[test]
    fn test_has_local_trailer_sibling_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Movie Name (2020).mkv"), b"x").unwrap();
        fs::write(dir.path().join("Movie Name (2020)-trailer.mkv"), b"x").unwrap();
        assert!(has_local_trailer(dir.path()));
    }

    #[test]
    fn test_has_local_trailer_absent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Movie Name (2020).mkv"), b"x").unwrap();
        assert!(!has_local_trailer(dir.path()));
    }

    #[test]
    fn test_has_local_trailer_in_subfolder() {
        let dir = tempdir().unwrap();
        let trailers = dir.path().join("Trailers");
        fs::create_dir(&trailers).unwrap();
        fs::write(trailers.join("anything.mp4"), b"x").unwrap();
        assert!(has_local_trailer(dir.path()));
    }

    #[test]
    fn test_has_local_trailer_empty_subfolder() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Trailers")).unwrap();
        assert!(!has_local_trailer(dir.path()));
    }

    #[test]
    fn test_has_local_trailer_missing_directory() {
        assert!(!has_local_trailer(Path::new("/does/not/exist/at/all")));
    }

    #[test]
    fn test_cleanup_partial_files() {
        let dir = tempdir().unwrap();
        let dest = plan_destination(dir.path(), "Show-trailer");
        fs::create_dir_all(&dest.trailers_dir).unwrap();
        fs::write(dest.trailers_dir.join("Show-trailer.mp4"), b"keep").unwrap();
        fs::write(dest.trailers_dir.join("Show-trailer.part"), b"drop").unwrap();
        fs::write(dest.trailers_dir.join("Show-trailer.webm"), b"drop").unwrap();
        fs::write(dest.trailers_dir.join("Other-trailer.part"), b"keep").unwrap();

        cleanup_partial_files(&dest);

        assert!(dest.trailers_dir.join("Show-trailer.mp4").exists());
        assert!(!dest.trailers_dir.join("Show-trailer.part").exists());
        assert!(!dest.trailers_dir.join("Show-trailer.webm").exists());
        assert!(dest.trailers_dir.join("Other-trailer.part").exists());
    }

    #[test]
    fn test_extras_contain_trailer() {
        let extras = vec![PlexExtra {
            extra_type: Some("clip".to_string()),
            subtype: Some("trailer".to_string()),
            title: None,
        }];
        assert!(extras_contain_trailer(&extras));
        assert!(!extras_contain_trailer(&[]));
    }
}
