//! Text normalization for cross-platform track comparison.
//!
//! Pipeline for every free-text field (order matters, each step idempotent):
//! diacritic folding → lowercasing → qualifier stripping → punctuation and
//! whitespace collapse. Artists are additionally split into credited names so
//! the primary artist can be compared on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{MatchError, Result};
use crate::models::{Library, NormalizedKey, Track};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Qualifier patterns stripped from titles and albums (applied in order, on lowercased text).
pub static QUALIFIER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Remaster with dash or slash: "- Remastered 2009", "- 2011 Digital Remaster", "/ Remaster"
        Regex::new(r"\s*[-–—/]\s*(?:\d{4}\s+)?(?:digital\s+)?remaster(?:ed)?\b.*$").unwrap(),
        // Bracketed remaster: "(Remastered 2009)", "[2011 Remaster]"
        Regex::new(r"\s*[\(\[][^\)\]]*\bremaster(?:ed)?\b[^\)\]]*[\)\]]").unwrap(),
        // Bracketed live: "(Live)", "(Live at Wembley)", "[Live 2019]"
        Regex::new(r"\s*[\(\[]\s*live\b[^\)\]]*[\)\]]").unwrap(),
        // Dash live: "- Live", "- Live at the Apollo"
        Regex::new(r"\s*[-–—]\s*live(?:\s+(?:at|from|in)\b.*)?$").unwrap(),
        // Edition variants: "(Deluxe Edition)", "[Super Deluxe]", "(25th Anniversary Edition)"
        Regex::new(r"\s*[\(\[][^\)\]]*\b(?:deluxe|expanded|anniversary|special\s+edition)\b[^\)\]]*[\)\]]").unwrap(),
        // Release variants: "(Radio Edit)", "[Album Version]", "(Mono)", "(Explicit)"
        Regex::new(r"\s*[\(\[]\s*(?:radio\s+edit|single\s+version|album\s+version|mono|stereo|explicit|clean)\s*[\)\]]").unwrap(),
        // Bracketed featured artists: "(feat. Artist)", "[ft. Someone]", "(with Someone)"
        Regex::new(r"\s*[\(\[]\s*(?:feat\.?|ft\.?|featuring|with)\s+[^\)\]]*[\)\]]").unwrap(),
        // Unbracketed featured artists: "Song feat. Artist"
        Regex::new(r"\s+(?:feat\.?|ft\.?|featuring)\s+.*$").unwrap(),
        // Year in parens: "(1964)", "[2009]"
        Regex::new(r"\s*[\(\[]\s*\d{4}\s*[\)\]]").unwrap(),
        // Year suffix: "- 2021", "- 1997 Version"
        Regex::new(r"\s*[-–—]\s*\d{4}(?:\s+(?:version|mix|edit))?\s*$").unwrap(),
    ]
});

/// Separators between credited artists, matched on folded, lowercased text.
/// A bare "/" is not a separator so names like "ac/dc" survive.
pub static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[,;&\(\)\[\]]\s*|\s+/\s+|\s+(?:feat\.?|ft\.?|featuring|with|vs\.?)(?:\s+|$)").unwrap()
});

/// Leading featured-artist marker left on a split part, e.g. "feat. jay z" after a "(" split.
pub static LEADING_FEATURE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:feat\.?|ft\.?|featuring|with)\s+").unwrap());

/// Padding for blocking keys built from short strings
pub const BLOCK_PAD: char = '_';
pub const TITLE_BLOCK_CHARS: usize = 4;
pub const ARTIST_BLOCK_CHARS: usize = 3;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Letters NFKD leaves intact but which have a plain Latin reading.
fn fold_special_letter(c: char) -> Option<&'static str> {
    match c {
        'ø' | 'Ø' => Some("o"),
        'æ' | 'Æ' => Some("ae"),
        'œ' | 'Œ' => Some("oe"),
        'ß' => Some("ss"),
        'ł' | 'Ł' => Some("l"),
        'đ' | 'Đ' => Some("d"),
        'þ' | 'Þ' => Some("th"),
        _ => None,
    }
}

/// Strip diacritics via NFKD decomposition. "Beyoncé" → "Beyonce", "Motörhead" → "Motorhead".
/// Non-Latin scripts pass through unchanged.
pub fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfkd().filter(|c| !is_combining_mark(*c)) {
        match fold_special_letter(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

/// Remove curated qualifiers (remaster, live, deluxe, feat., year) from lowercased text.
pub fn strip_qualifiers(s: &str) -> String {
    let mut result = s.to_string();
    for pattern in QUALIFIER_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    result
}

/// Drop apostrophes, turn every other non-alphanumeric run into one space, trim.
/// "don't stop (me) now!" → "dont stop me now"
pub fn collapse_punctuation(s: &str) -> String {
    let spaced: String = s
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '`' | '\u{00B4}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop one leading "the". A second "the" blocks the strip so that a
/// normalized title normalizes to itself.
fn strip_leading_the(s: String, min_len: usize) -> String {
    match s.strip_prefix("the ") {
        Some(rest) if s.len() > min_len && !rest.starts_with("the ") => rest.to_string(),
        _ => s,
    }
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a title for matching.
/// "Yesterday (Remastered 2009)" → "yesterday"
pub fn normalize_title(title: &str) -> String {
    let folded = fold_diacritics(title).to_lowercase();
    let stripped = strip_qualifiers(&folded).replace('&', " and ");
    // "the sound of silence" → "sound of silence", but keep very short titles intact
    strip_leading_the(collapse_punctuation(&stripped), 6)
}

/// Normalize an album name. Same vocabulary as titles, so
/// "Abbey Road (Remastered)" and "Abbey Road" agree.
pub fn normalize_album(album: &str) -> String {
    let folded = fold_diacritics(album).to_lowercase();
    let stripped = strip_qualifiers(&folded).replace('&', " and ");
    collapse_punctuation(&stripped)
}

/// Split an artist credit into normalized names, in credited order.
/// "Beyoncé feat. Jay-Z" → ["beyonce", "jay z"]
pub fn split_artists(artist: &str) -> Vec<String> {
    let folded = fold_diacritics(artist).to_lowercase();
    ARTIST_SEPARATOR
        .split(&folded)
        .map(|part| LEADING_FEATURE_MARKER.replace(part.trim(), "").to_string())
        .map(|part| strip_leading_the(collapse_punctuation(&part), 4))
        .filter(|part| !part.is_empty())
        .collect()
}

/// Normalize an artist credit to its primary (first credited) artist.
pub fn normalize_primary_artist(artist: &str) -> String {
    split_artists(artist).into_iter().next().unwrap_or_default()
}

/// Order-insensitive form of the full credit: names sorted and joined.
pub fn join_artists(artists: &[String]) -> String {
    let mut sorted: Vec<&str> = artists.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(" ")
}

/// Trim and uppercase an ISRC; blank values become None.
pub fn normalize_isrc(isrc: &str) -> Option<String> {
    let trimmed = isrc.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

fn block_part(s: &str, width: usize) -> String {
    let mut part: String = s.chars().filter(|c| !c.is_whitespace()).take(width).collect();
    while part.chars().count() < width {
        part.push(BLOCK_PAD);
    }
    part
}

/// First 4 title characters + first 3 primary-artist characters, padded.
/// ("yesterday", "beatles") → "yestbea"; ("hit", "z") → "hit_z__"
pub fn blocking_key(title_norm: &str, primary_artist_norm: &str) -> String {
    let mut key = block_part(title_norm, TITLE_BLOCK_CHARS);
    key.push_str(&block_part(primary_artist_norm, ARTIST_BLOCK_CHARS));
    key
}

/// Build the normalized view of one track. Total: never fails.
pub fn normalize_track(position: usize, track: &Track) -> NormalizedKey {
    let title = normalize_title(&track.title);
    let artists = split_artists(&track.artist);
    let primary_artist = artists.first().cloned().unwrap_or_default();
    let album = track
        .album
        .as_deref()
        .map(normalize_album)
        .filter(|a| !a.is_empty());
    let blocking_key = blocking_key(&title, &primary_artist);

    NormalizedKey {
        position,
        artist: join_artists(&artists),
        primary_artist,
        artists,
        album,
        isrc: track.isrc.as_deref().and_then(normalize_isrc),
        duration: track.duration,
        blocking_key,
        title,
    }
}

/// Check that a track carries enough text to be compared at all.
pub fn validate_track(library: &Library, position: usize, track: &Track) -> Result<()> {
    if track.title.trim().is_empty() && track.artist.trim().is_empty() {
        return Err(MatchError::InputError {
            library: library.label(),
            position,
            raw_id: track.raw_id.clone(),
            reason: "title and artist are both empty".to_string(),
        });
    }
    Ok(())
}

/// Normalize every track of a library, failing on the first malformed track.
/// The returned keys are indexed by track position.
pub fn normalize_library(library: &Library) -> Result<Vec<NormalizedKey>> {
    library
        .tracks
        .iter()
        .enumerate()
        .map(|(position, track)| {
            validate_track(library, position, track)?;
            Ok(normalize_track(position, track))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
