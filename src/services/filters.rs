//! Candidate gating: duration ceiling and uploader denylist
//!
//! Small predicates applied to every search result before title matching.
//! A candidate that fails either gate is skipped, never downloaded.

/// Trailers are short-form; anything longer is a mis-tagged upload.
pub const MAX_TRAILER_DURATION_SECS: f64 = 300.0;

/// Reject a candidate whose known duration exceeds the ceiling.
///
/// An unknown duration passes: flat search results often omit duration
/// before the media is fetched, and that must not block a good match.
pub fn exceeds_duration_ceiling(duration: Option<f64>) -> bool {
    matches!(duration, Some(d) if d > MAX_TRAILER_DURATION_SECS)
}

/// Reject a candidate whose uploader matches a denylist entry.
///
/// Entries are case-insensitive substrings. An empty denylist accepts
/// every uploader.
pub fn uploader_denied(uploader: &str, denylist: &[String]) -> bool {
    if denylist.is_empty() {
        return false;
    }
    let uploader = uploader.to_lowercase();
    denylist
        .iter()
        .any(|entry| !entry.is_empty() && uploader.contains(&entry.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_boundary() {
        assert!(!exceeds_duration_ceiling(Some(300.0)));
        assert!(exceeds_duration_ceiling(Some(301.0)));
        assert!(!exceeds_duration_ceiling(Some(90.0)));
    }

    #[test]
    fn test_unknown_duration_passes() {
        assert!(!exceeds_duration_ceiling(None));
    }

    #[test]
    fn test_uploader_denylist_case_insensitive() {
        let denylist = vec!["Fake Trailers".to_string()];
        assert!(uploader_denied("FAKE TRAILERS HD", &denylist));
        assert!(uploader_denied("the fake trailers channel", &denylist));
        assert!(!uploader_denied("Official Studio", &denylist));
    }

    #[test]
    fn test_empty_denylist_accepts_everything() {
        assert!(!uploader_denied("Anyone At All", &[]));
    }
}
