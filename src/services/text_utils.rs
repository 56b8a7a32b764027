//! Shared text normalization utilities
//!
//! Title comparison happens on a canonical form so that punctuation,
//! ampersand spelling, and whitespace differences between a library title
//! and a search-result title never break a match.

/// Normalize a title for comparison.
///
/// Lower-cases, maps ampersands to the word "and", strips everything
/// outside alphanumerics/whitespace, and collapses whitespace runs.
/// Idempotent: `normalize_title(normalize_title(t)) == normalize_title(t)`.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let with_and = lowered.replace(" & ", " and ").replace('&', "and");

    let stripped: String = with_and
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips() {
        assert_eq!(
            normalize_title("Spider-Man: No Way Home"),
            "spider man no way home"
        );
        assert_eq!(normalize_title("The Lord's Return"), "the lord s return");
    }

    #[test]
    fn test_normalize_ampersands() {
        assert_eq!(normalize_title("Law & Order"), "law and order");
        assert_eq!(normalize_title("AT&T Story"), "atandt story");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_title("  Too   many\tspaces  "), "too many spaces");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "Mission: Impossible",
            "Law & Order",
            "  Weird -- Title!!  ",
            "Avatar (2009)",
        ] {
            let once = normalize_title(raw);
            assert_eq!(normalize_title(&once), once);
        }
    }
}
