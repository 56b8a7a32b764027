//! Candidate title matching
//!
//! Decides whether a search-result title plausibly names a target movie or
//! show. Rules escalate from precise (normalized containment with release
//! year confirmation) to permissive (bare substring backstop); the first
//! rule to pass wins. Callers log the winning rule for diagnostics.

use std::collections::HashSet;

use regex::Regex;

use super::text_utils::normalize_title;

/// Words too common to carry signal in word-overlap matching.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "of", "a", "an", "in", "on", "at", "to", "for", "with", "by",
];

/// Minimum share of target words that must appear in the candidate title.
const WORD_OVERLAP_THRESHOLD: f64 = 0.6;

/// Titles longer than this get a partial-prefix fallback check.
const PARTIAL_PREFIX_MIN_LEN: usize = 20;

/// Share of the normalized target used for the partial-prefix check.
const PARTIAL_PREFIX_RATIO: f64 = 0.7;

/// Which rule accepted a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Full normalized title contained in the candidate, year confirmed.
    FullTitleWithYear,
    /// Every colon-separated segment contained in the candidate.
    SegmentedTitle,
    /// At least 60% of significant target words present.
    WordOverlap,
    /// First 70% of a long title contained in the candidate.
    PartialPrefix,
    /// Bare normalized substring, no year requirement.
    BareSubstring,
}

/// Split a parenthesized year out of a title, e.g. `"Doctor Who (2005)"`.
///
/// Plex show titles frequently embed the premiere year this way; the
/// matcher treats it as the release year when the item carries none.
pub fn split_embedded_year(title: &str) -> (String, Option<i32>) {
    if let Ok(re) = Regex::new(r"\((\d{4})\)")
        && let Some(caps) = re.captures(title)
    {
        let year = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let base = re.replace_all(title, " ");
        return (base.split_whitespace().collect::<Vec<_>>().join(" "), year);
    }
    (title.trim().to_string(), None)
}

/// Decide whether `candidate_title` plausibly names the target.
///
/// Returns the first rule that accepts, or `None` to reject. The year
/// confirmation always checks the raw candidate title, since normalization
/// leaves digits intact but a year may sit inside stripped punctuation.
pub fn title_matches(
    candidate_title: &str,
    target_title: &str,
    target_year: Option<i32>,
) -> Option<MatchRule> {
    let (base_title, embedded_year) = split_embedded_year(target_title);
    let year = target_year.or(embedded_year);

    let norm_candidate = normalize_title(candidate_title);
    let norm_target = normalize_title(&base_title);

    let year_confirmed = match year {
        Some(y) => candidate_title.contains(&y.to_string()),
        None => true,
    };

    // Rule 1: full normalized containment with the year literally present.
    if year.is_some()
        && year_confirmed
        && !norm_target.is_empty()
        && norm_candidate.contains(&norm_target)
    {
        return Some(MatchRule::FullTitleWithYear);
    }

    // Rule 2: colon-separated titles match segment by segment.
    if base_title.contains(':') {
        let segments: Vec<String> = base_title
            .split(':')
            .map(normalize_title)
            .filter(|s| !s.is_empty())
            .collect();
        if !segments.is_empty()
            && year_confirmed
            && segments.iter().all(|s| norm_candidate.contains(s.as_str()))
        {
            return Some(MatchRule::SegmentedTitle);
        }
    }

    // Rule 3: word-overlap ratio over stop-word-stripped word sets.
    let target_words: HashSet<&str> = norm_target
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();
    let candidate_words: HashSet<&str> = norm_candidate
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();
    if !target_words.is_empty() && year_confirmed {
        let matching = target_words.intersection(&candidate_words).count();
        let ratio = matching as f64 / target_words.len() as f64;
        if ratio >= WORD_OVERLAP_THRESHOLD {
            return Some(MatchRule::WordOverlap);
        }
    }

    // Rule 4: long titles accept on their leading 70%.
    let target_len = norm_target.chars().count();
    if target_len > PARTIAL_PREFIX_MIN_LEN && year_confirmed {
        let prefix_len = (target_len as f64 * PARTIAL_PREFIX_RATIO) as usize;
        let prefix: String = norm_target.chars().take(prefix_len).collect();
        let prefix = prefix.trim_end();
        if !prefix.is_empty() && norm_candidate.contains(prefix) {
            return Some(MatchRule::PartialPrefix);
        }
    }

    // Rule 5: permissive backstop, no year requirement.
    if !norm_target.is_empty() && norm_candidate.contains(&norm_target) {
        return Some(MatchRule::BareSubstring);
    }

    None
}
