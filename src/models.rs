//! Core data models for library comparison.
//!
//! Tracks and libraries come fully materialized from the parsing side and
//! are never mutated here. Everything else is created and discarded within
//! a single comparison or dedup run.

use serde::{Deserialize, Serialize};

// ============================================================================
// Input Models
// ============================================================================

/// One song entry from one library export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Primary artist, possibly with featured artists appended
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub isrc: Option<String>,
    /// Origin tag ("spotify", "apple_music", "youtube_music", ...)
    #[serde(default)]
    pub platform: String,
    /// Platform-specific identifier, opaque to matching
    #[serde(default)]
    pub raw_id: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            ..Self::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_raw_id(mut self, raw_id: impl Into<String>) -> Self {
        self.raw_id = Some(raw_id.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Number of populated identifying fields (title, artist, album, duration, ISRC).
    /// Used to pick the canonical member of a duplicate cluster.
    pub fn completeness(&self) -> usize {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        [
            !self.title.trim().is_empty(),
            !self.artist.trim().is_empty(),
            filled(&self.album),
            self.duration.is_some(),
            filled(&self.isrc),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }
}

/// Ordered tracks from one platform export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platform: String,
    pub tracks: Vec<Track>,
}

impl Library {
    /// Build a library, tagging tracks that carry no platform with the library's.
    pub fn new(name: impl Into<String>, platform: impl Into<String>, tracks: Vec<Track>) -> Self {
        let platform = platform.into();
        let tracks = tracks
            .into_iter()
            .map(|t| {
                if t.platform.is_empty() {
                    t.with_platform(platform.clone())
                } else {
                    t
                }
            })
            .collect();
        Self {
            name: name.into(),
            platform,
            tracks,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Label used in error messages: "name (platform)" or just one of them.
    pub fn label(&self) -> String {
        match (self.name.is_empty(), self.platform.is_empty()) {
            (false, false) => format!("{} ({})", self.name, self.platform),
            (false, true) => self.name.clone(),
            (true, false) => self.platform.clone(),
            (true, true) => "unnamed".to_string(),
        }
    }
}

// ============================================================================
// Derived Models
// ============================================================================

/// Normalized, comparison-ready view of one track.
/// Computed once per track per run and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedKey {
    /// Position of the track in its library
    pub position: usize,
    pub title: String,
    /// All credited artists, folded and sorted, joined by a space
    pub artist: String,
    /// First credited artist
    pub primary_artist: String,
    /// Credited artists in the order the platform listed them
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Trimmed, uppercased ISRC; None when absent or blank
    pub isrc: Option<String>,
    pub duration: Option<u32>,
    pub blocking_key: String,
}

/// Classification of a scored pair, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    IsrcExact,
    FuzzyHigh,
    DurationCorroborated,
    /// Borderline text score with no duration corroboration; not accepted
    FuzzyMedium,
    Rejected,
}

impl MatchKind {
    /// Rank for greedy assignment: higher wins.
    pub fn rank(self) -> u8 {
        match self {
            MatchKind::IsrcExact => 3,
            MatchKind::FuzzyHigh => 2,
            MatchKind::DurationCorroborated => 1,
            MatchKind::FuzzyMedium | MatchKind::Rejected => 0,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            MatchKind::IsrcExact | MatchKind::FuzzyHigh | MatchKind::DurationCorroborated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::IsrcExact => "isrc-exact",
            MatchKind::FuzzyHigh => "fuzzy-high",
            MatchKind::DurationCorroborated => "duration-corroborated",
            MatchKind::FuzzyMedium => "fuzzy-medium",
            MatchKind::Rejected => "rejected",
        }
    }
}

/// Which side of a pair a field belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Why a pair was not accepted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Title or primary artist is empty after normalization
    EmptyField { side: Side, field: &'static str },
    /// textScore below the loose threshold
    BelowLooseThreshold { text_score: f64, loose_threshold: f64 },
    /// Borderline textScore but one side has no duration
    DurationUnavailable,
    /// Borderline textScore and durations differ by more than the tolerance
    DurationOutOfTolerance { delta_secs: u32, tolerance_secs: u32 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyField { side, field } => {
                write!(f, "{:?} {} is empty after normalization", side, field)
            }
            RejectReason::BelowLooseThreshold {
                text_score,
                loose_threshold,
            } => write!(f, "text score {:.3} below loose threshold {:.3}", text_score, loose_threshold),
            RejectReason::DurationUnavailable => {
                write!(f, "borderline text score and duration missing on a side")
            }
            RejectReason::DurationOutOfTolerance {
                delta_secs,
                tolerance_secs,
            } => write!(f, "borderline text score and duration differs by {}s (> {}s)", delta_secs, tolerance_secs),
        }
    }
}

/// Component scores behind a pair's classification.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComponentScores {
    pub title_similarity: f64,
    pub artist_similarity: f64,
    /// Weighted title + artist similarity
    pub text_score: f64,
    /// Present only when both tracks carry an album
    pub album_similarity: Option<f64>,
    /// Absolute duration difference, present only when both tracks carry one
    pub duration_delta: Option<u32>,
    pub duration_ok: Option<bool>,
}

/// A proposed correspondence between a left and a right track.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchCandidate {
    /// Left track position
    pub left: usize,
    /// Right track position
    pub right: usize,
    pub kind: MatchKind,
    /// 1.0 for ISRC matches, otherwise the text score (0.0 when short-circuited)
    pub score: f64,
    pub components: ComponentScores,
    pub reject_reason: Option<RejectReason>,
}

impl MatchCandidate {
    pub fn is_accepted(&self) -> bool {
        self.kind.is_accepted()
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// Counters describing one comparison run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComparisonStats {
    pub left_total: usize,
    pub right_total: usize,
    /// Distinct (left, right) pairs scored by the matcher
    pub candidate_pairs: usize,
    /// Pairs contributed by the ISRC index
    pub isrc_pairs: usize,
    /// Largest blocking bucket consulted
    pub largest_block: usize,
    pub isrc_exact: usize,
    pub fuzzy_high: usize,
    pub duration_corroborated: usize,
}

/// Resolved outcome of comparing two libraries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Committed 1:1 matches, ordered by left position
    pub matches: Vec<MatchCandidate>,
    pub unmatched_left: Vec<usize>,
    pub unmatched_right: Vec<usize>,
    /// Scored pairs that were not accepted, for diagnostics
    pub rejected: Vec<MatchCandidate>,
    /// Accepted pairs that lost the greedy pass to a stronger pair
    pub displaced: Vec<MatchCandidate>,
    pub stats: ComparisonStats,
}

impl ComparisonResult {
    /// Iterate matched tracks alongside their candidate.
    pub fn matched_pairs<'a>(
        &'a self,
        left: &'a Library,
        right: &'a Library,
    ) -> impl Iterator<Item = (&'a Track, &'a Track, &'a MatchCandidate)> + 'a {
        self.matches
            .iter()
            .filter_map(move |m| Some((left.tracks.get(m.left)?, right.tracks.get(m.right)?, m)))
    }

    /// Tracks of the left library with no counterpart on the right.
    pub fn missing_from_right<'a>(&'a self, left: &'a Library) -> impl Iterator<Item = &'a Track> + 'a {
        self.unmatched_left.iter().filter_map(move |&i| left.tracks.get(i))
    }

    /// True when every position on each side is either matched or unmatched, exactly once.
    pub fn is_partition(&self, left_len: usize, right_len: usize) -> bool {
        fn covers(len: usize, matched: impl Iterator<Item = usize>, unmatched: &[usize]) -> bool {
            let mut seen = vec![false; len];
            for i in matched.chain(unmatched.iter().copied()) {
                match seen.get_mut(i) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return false,
                }
            }
            seen.iter().all(|&s| s)
        }
        covers(left_len, self.matches.iter().map(|m| m.left), &self.unmatched_left)
            && covers(right_len, self.matches.iter().map(|m| m.right), &self.unmatched_right)
    }
}

/// Tracks from one library judged to be the same recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateCluster {
    /// Member positions, ascending; always at least two
    pub members: Vec<usize>,
    /// Position of the representative track
    pub canonical: usize,
    /// Accepted pairs that joined the cluster (left < right)
    pub links: Vec<MatchCandidate>,
}

impl DuplicateCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn canonical_track<'a>(&self, library: &'a Library) -> Option<&'a Track> {
        library.tracks.get(self.canonical)
    }

    /// Members other than the canonical track.
    pub fn redundant(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied().filter(move |&m| m != self.canonical)
    }
}
