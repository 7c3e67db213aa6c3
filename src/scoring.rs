//! Pair scoring and classification.
//!
//! Given two normalized tracks this module decides, in order:
//! - ISRC identity (authoritative when enabled)
//! - empty-field short-circuit
//! - weighted title + artist similarity
//! - duration and album corroboration
//!
//! Every function here is total over normalized strings. The only fallible
//! entry point is [`score_tracks`], which validates its config first.

use strsim::normalized_levenshtein;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::models::{ComponentScores, MatchCandidate, MatchKind, NormalizedKey, RejectReason, Side, Track};
use crate::normalize::normalize_track;

// ============================================================================
// String Similarity
// ============================================================================

/// Edit-distance similarity in [0, 1] on already-normalized strings.
/// Empty input on either side scores 0.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b)
}

/// Artist similarity: primary artist against primary artist, or the full
/// order-insensitive credit when that agrees better.
/// "Calvin Harris, Dua Lipa" and "Dua Lipa & Calvin Harris" score 1.0.
pub fn artist_similarity(left: &NormalizedKey, right: &NormalizedKey) -> f64 {
    let primary = string_similarity(&left.primary_artist, &right.primary_artist);
    if primary >= 1.0 {
        return primary;
    }
    primary.max(string_similarity(&left.artist, &right.artist))
}

// ============================================================================
// Numeric Corroboration
// ============================================================================

/// Absolute duration difference in seconds; None unless both sides report one.
pub fn duration_delta(left: Option<u32>, right: Option<u32>) -> Option<u32> {
    Some(left?.abs_diff(right?))
}

/// Weighted title + artist similarity, kept in [0, 1] when the weights only
/// sum to 1 within validation tolerance.
pub fn text_score(title_similarity: f64, artist_similarity: f64, config: &MatchConfig) -> f64 {
    (config.title_weight * title_similarity + config.artist_weight * artist_similarity).clamp(0.0, 1.0)
}

/// Compute every component score for a pair. Symmetric in its two keys.
pub fn component_scores(left: &NormalizedKey, right: &NormalizedKey, config: &MatchConfig) -> ComponentScores {
    let title_similarity = string_similarity(&left.title, &right.title);
    let artist_similarity = artist_similarity(left, right);
    let duration_delta = duration_delta(left.duration, right.duration);

    let album_similarity = match (&left.album, &right.album) {
        (Some(a), Some(b)) => Some(string_similarity(a, b)),
        _ => None,
    };

    ComponentScores {
        title_similarity,
        artist_similarity,
        text_score: text_score(title_similarity, artist_similarity, config),
        album_similarity,
        duration_delta,
        duration_ok: duration_delta.map(|d| d <= config.duration_tolerance_secs),
    }
}

// ============================================================================
// Classification
// ============================================================================

fn empty_field(left: &NormalizedKey, right: &NormalizedKey) -> Option<RejectReason> {
    [(Side::Left, left), (Side::Right, right)]
        .into_iter()
        .find_map(|(side, key)| {
            if key.title.is_empty() {
                Some(RejectReason::EmptyField { side, field: "title" })
            } else if key.primary_artist.is_empty() {
                Some(RejectReason::EmptyField { side, field: "artist" })
            } else {
                None
            }
        })
}

/// Classify a text-scored pair against the configured thresholds.
/// Duration can rescue a borderline score but never promote one below the loose threshold.
pub fn classify(components: &ComponentScores, config: &MatchConfig) -> (MatchKind, Option<RejectReason>) {
    let text = components.text_score;

    if text >= config.strict_threshold {
        return (MatchKind::FuzzyHigh, None);
    }

    if text < config.loose_threshold {
        return (
            MatchKind::Rejected,
            Some(RejectReason::BelowLooseThreshold {
                text_score: text,
                loose_threshold: config.loose_threshold,
            }),
        );
    }

    match (components.duration_ok, components.duration_delta) {
        (Some(true), _) => (MatchKind::DurationCorroborated, None),
        (Some(false), Some(delta_secs)) => (
            MatchKind::FuzzyMedium,
            Some(RejectReason::DurationOutOfTolerance {
                delta_secs,
                tolerance_secs: config.duration_tolerance_secs,
            }),
        ),
        _ => (MatchKind::FuzzyMedium, Some(RejectReason::DurationUnavailable)),
    }
}

/// Score one left/right pair. Positions are taken from the keys.
pub fn score(left: &NormalizedKey, right: &NormalizedKey, config: &MatchConfig) -> MatchCandidate {
    let components = component_scores(left, right, config);

    let candidate = |kind, score, reject_reason| MatchCandidate {
        left: left.position,
        right: right.position,
        kind,
        score,
        components: components.clone(),
        reject_reason,
    };

    if config.use_isrc {
        if let (Some(a), Some(b)) = (&left.isrc, &right.isrc) {
            if a == b {
                return candidate(MatchKind::IsrcExact, 1.0, None);
            }
        }
    }

    if let Some(reason) = empty_field(left, right) {
        return candidate(MatchKind::Rejected, 0.0, Some(reason));
    }

    let (kind, reason) = classify(&components, config);
    candidate(kind, components.text_score, reason)
}

/// Normalize and score two raw tracks. Positions in the result are both 0.
pub fn score_tracks(left: &Track, right: &Track, config: &MatchConfig) -> Result<MatchCandidate> {
    config.validate()?;
    Ok(score(&normalize_track(0, left), &normalize_track(0, right), config))
}
