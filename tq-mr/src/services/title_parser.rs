//! Raw video title heuristics
//!
//! Video platform titles arrive as free text ("Artist - Song (Official
//! Video)"). Splitting and truncation here produce the artist/title pair
//! the catalog query is built from. Pure functions, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

/// Artist/title separators, tried in this order. The first variant that
/// occurs anywhere in the label wins, split at its first occurrence.
const SEPARATORS: [&str; 3] = [" - ", " | ", ": "];

/// Suffix markers that start the noise portion of a title
/// ("(Official Video)", "[HD]", "ft. Someone", ...)
const TRUNCATION_MARKERS: [&str; 5] = [" (", " [", " ft", " (feat", " FEAT."];

/// Quote characters stripped from titles, straight and curly
const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Remaster suffix that survives bracket stripping: optional hyphen,
/// optional whitespace, then "remastered" (any case)
static REMASTER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)-?\s*remastered").unwrap());

/// Artist/title split of a raw label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    /// Text before the first separator, when one was present
    pub artist: Option<String>,
    /// Cleaned-up title; empty means the label is unparseable
    pub clean_title: String,
}

/// Split a raw label into artist and clean title
///
/// An empty `clean_title` means no metadata lookup is possible for this
/// label; the caller treats that as a terminal not-found, not an error.
pub fn parse(raw_label: &str) -> ParsedTitle {
    let (artist, rest) = split_artist(raw_label);

    let mut clean_title = truncate_at_markers(rest);
    clean_title.retain(|c| !QUOTE_CHARS.contains(&c));
    let clean_title = clean_title.trim().to_string();

    ParsedTitle {
        artist,
        clean_title,
    }
}

/// Truncate a clean title at a trailing remaster marker
///
/// "Yesterday - Remastered 2009" and "Yesterday Remastered" both reduce
/// to "Yesterday". Returns the input unchanged when no marker is present.
pub fn strip_remaster_suffix(clean_title: &str) -> String {
    match REMASTER_MARKER.find(clean_title) {
        Some(m) => clean_title[..m.start()].trim().to_string(),
        None => clean_title.to_string(),
    }
}

fn split_artist(raw_label: &str) -> (Option<String>, &str) {
    for separator in SEPARATORS {
        if let Some((before, after)) = raw_label.split_once(separator) {
            let artist = before.trim();
            let artist = (!artist.is_empty()).then(|| artist.to_string());
            return (artist, after);
        }
    }
    (None, raw_label)
}

fn truncate_at_markers(rest: &str) -> String {
    let cut = TRUNCATION_MARKERS
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min();

    match cut {
        Some(index) => rest[..index].to_string(),
        None => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_dash_separator() {
        let parsed = parse("The Beatles - Yesterday");
        assert_eq!(parsed.artist.as_deref(), Some("The Beatles"));
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn splits_on_pipe_separator() {
        let parsed = parse("The Beatles | Yesterday");
        assert_eq!(parsed.artist.as_deref(), Some("The Beatles"));
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn splits_on_colon_separator() {
        let parsed = parse("The Beatles: Yesterday");
        assert_eq!(parsed.artist.as_deref(), Some("The Beatles"));
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn dash_takes_priority_over_pipe() {
        // " | " occurs first in the string, but " - " is the higher
        // priority separator
        let parsed = parse("A | B - C");
        assert_eq!(parsed.artist.as_deref(), Some("A | B"));
        assert_eq!(parsed.clean_title, "C");
    }

    #[test]
    fn only_first_occurrence_of_separator_splits() {
        let parsed = parse("Artist - Song - Extra");
        assert_eq!(parsed.artist.as_deref(), Some("Artist"));
        assert_eq!(parsed.clean_title, "Song - Extra");
    }

    #[test]
    fn no_separator_means_no_artist() {
        let parsed = parse("Yesterday");
        assert_eq!(parsed.artist, None);
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn truncates_at_parenthesis() {
        let parsed = parse("The Beatles - Yesterday (Official Video)");
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn truncates_at_bracket() {
        let parsed = parse("The Beatles - Yesterday [HD]");
        assert_eq!(parsed.clean_title, "Yesterday");
    }

    #[test]
    fn truncates_at_feat_markers() {
        assert_eq!(parse("Song ft. Someone").clean_title, "Song");
        assert_eq!(parse("Song FEAT. Someone").clean_title, "Song");
    }

    #[test]
    fn earliest_marker_wins() {
        let parsed = parse("Artist - Song ft Someone (Live)");
        assert_eq!(parsed.clean_title, "Song");
    }

    #[test]
    fn strips_straight_and_curly_quotes() {
        assert_eq!(parse("Artist - \"Song Title\"").clean_title, "Song Title");
        assert_eq!(
            parse("Artist - \u{201C}Song Title\u{201D}").clean_title,
            "Song Title"
        );
    }

    #[test]
    fn quoted_remaster_example() {
        let parsed = parse("Artist - \"Song Title\" (Remastered 2009)");
        assert_eq!(parsed.artist.as_deref(), Some("Artist"));
        assert_eq!(parsed.clean_title, "Song Title");
    }

    #[test]
    fn idempotent_on_already_clean_titles() {
        let clean = "Yesterday";
        assert_eq!(parse(clean).clean_title, clean);
    }

    #[test]
    fn empty_and_whitespace_labels_are_unparseable() {
        assert_eq!(parse("").clean_title, "");
        assert_eq!(parse("   ").clean_title, "");
    }

    #[test]
    fn title_that_truncates_to_nothing_is_unparseable() {
        assert_eq!(parse(" (Official Video)").clean_title, "");
    }

    #[test]
    fn empty_artist_side_is_none() {
        let parsed = parse(" - Song");
        assert_eq!(parsed.artist, None);
        assert_eq!(parsed.clean_title, "Song");
    }

    #[test]
    fn remaster_suffix_with_hyphen_is_stripped() {
        assert_eq!(strip_remaster_suffix("Yesterday - Remastered 2009"), "Yesterday");
    }

    #[test]
    fn remaster_suffix_without_hyphen_is_stripped() {
        assert_eq!(strip_remaster_suffix("Yesterday Remastered"), "Yesterday");
    }

    #[test]
    fn remaster_case_insensitive() {
        assert_eq!(strip_remaster_suffix("Yesterday REMASTERED"), "Yesterday");
    }

    #[test]
    fn titles_without_remaster_marker_pass_through() {
        assert_eq!(strip_remaster_suffix("Yesterday"), "Yesterday");
    }
}
