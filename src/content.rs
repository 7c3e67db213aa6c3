//! Non-music content detection for library statistics.
//!
//! Streaming-platform exports (YouTube Music in particular) mix podcasts,
//! talks and ambient audio in with songs. Reports count them separately;
//! matching never drops them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Titles longer than this (in characters) are almost never songs
pub const MAX_MUSIC_TITLE_CHARS: usize = 150;

// ============================================================================
// Regex Patterns
// ============================================================================

/// Patterns matched against "title artist", case-insensitively.
pub static NON_MUSIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Podcasts and interviews
        Regex::new(r"(?i)\b(?:podcast|interview|talk|discussion)\b").unwrap(),
        Regex::new(r"(?i)\b(?:episode|ep\.|chapter)\s*\d+").unwrap(),
        // Video-platform content
        Regex::new(r"(?i)\b(?:youtube\s+shorts?|shorts?)\b").unwrap(),
        Regex::new(r"(?i)\b(?:vlog|tutorial|review|reaction)\b").unwrap(),
        Regex::new(r"(?i)\b(?:behind\s+the\s+scenes|making\s+of)\b").unwrap(),
        // Spoken word and ambient audio
        Regex::new(r"(?i)\b(?:audiobook|meditation|sleep|rain|nature)\b").unwrap(),
        Regex::new(r"(?i)\b(?:comedy|stand-?up|funny)\b").unwrap(),
        // Recorded performances
        Regex::new(r"(?i)\b(?:live\s+from|recorded\s+live)\b").unwrap(),
        Regex::new(r"(?i)\b(?:concert\s+recording|bootleg)\b").unwrap(),
        Regex::new(r"(?i)\b(?:nsfw|adult)\b").unwrap(),
    ]
});

/// Heuristic: is this track likely a song rather than spoken or ambient content?
pub fn is_music_content(title: &str, artist: &str) -> bool {
    let (title, artist) = (title.trim(), artist.trim());
    if title.is_empty() && artist.is_empty() {
        return false;
    }

    if title.chars().count() > MAX_MUSIC_TITLE_CHARS {
        return false;
    }

    let combined = format!("{} {}", title, artist);
    !NON_MUSIC_PATTERNS.iter().any(|p| p.is_match(&combined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_songs_are_music() {
        assert!(is_music_content("Yesterday", "The Beatles"));
        assert!(is_music_content("Bohemian Rhapsody (Remastered 2011)", "Queen"));
        assert!(is_music_content("Song (Explicit)", "Artist"));
    }

    #[test]
    fn test_spoken_content_is_not_music() {
        assert!(!is_music_content("The Daily Podcast", "NYT"));
        assert!(!is_music_content("Episode 12: Origins", "Some Show"));
        assert!(!is_music_content("Ep. 4", "Show"));
        assert!(!is_music_content("Deep Sleep Sounds", "Ambient Channel"));
        assert!(!is_music_content("Stand-up Special", "Comedian"));
        assert!(!is_music_content("Album Review", "Critic"));
        assert!(!is_music_content("Live from Madison Square Garden", "Band"));
    }

    #[test]
    fn test_degenerate_input() {
        assert!(!is_music_content("", "  "));
        assert!(!is_music_content(&"la ".repeat(60), "Band"));
        assert!(is_music_content("", "Instrumental Artist"));
    }
}
