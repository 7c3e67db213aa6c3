//! Reports built on top of comparison and dedup results.
//!
//! Everything here is derived data: counts, ratios and breakdowns keyed by
//! normalized artist, genre or release decade. BTreeMap keeps the serialized output stable.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::MatchConfig;
use crate::content::is_music_content;
use crate::error::{MatchError, Result};
use crate::models::{ComparisonResult, DuplicateCluster, Library, MatchKind, Track};
use crate::normalize::normalize_primary_artist;
use crate::resolve::compare_libraries;

/// Artists listed in a single library's statistics
pub const TOP_ARTISTS: usize = 10;
/// Artists listed in a multi-library analysis
pub const TOP_ANALYSIS_ARTISTS: usize = 20;
/// Genre and decade bucket for tracks without one
pub const UNKNOWN_BUCKET: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistCount {
    pub artist: String,
    pub tracks: usize,
}

/// Count tracks per key, highest first, ties by key.
fn top_counts(counts: &FxHashMap<String, usize>, n: usize) -> Vec<ArtistCount> {
    let mut sorted: Vec<(&String, &usize)> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    sorted
        .into_iter()
        .take(n)
        .map(|(artist, &tracks)| ArtistCount {
            artist: artist.clone(),
            tracks,
        })
        .collect()
}

fn artist_key(track: &Track) -> Option<String> {
    Some(normalize_primary_artist(&track.artist)).filter(|a| !a.is_empty())
}

fn genre_key(track: &Track) -> String {
    track
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| UNKNOWN_BUCKET.to_string())
}

/// "1960s" for 1969; tracks without a plausible year land in the unknown bucket.
fn decade_key(track: &Track) -> String {
    match track.year {
        Some(year) if year > 0 => format!("{}s", year - year % 10),
        _ => UNKNOWN_BUCKET.to_string(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ============================================================================
// Library Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    pub name: String,
    pub platform: String,
    pub total_tracks: usize,
    pub music_tracks: usize,
    pub non_music_tracks: usize,
    pub unique_artists: usize,
    pub top_artists: Vec<ArtistCount>,
}

impl LibraryStats {
    pub fn build(library: &Library) -> Self {
        let mut artists: FxHashMap<String, usize> = FxHashMap::default();
        let mut music_tracks = 0;

        for track in &library.tracks {
            if is_music_content(&track.title, &track.artist) {
                music_tracks += 1;
            }
            if let Some(artist) = artist_key(track) {
                *artists.entry(artist).or_insert(0) += 1;
            }
        }

        Self {
            name: library.name.clone(),
            platform: library.platform.clone(),
            total_tracks: library.len(),
            music_tracks,
            non_music_tracks: library.len() - music_tracks,
            unique_artists: artists.len(),
            top_artists: top_counts(&artists, TOP_ARTISTS),
        }
    }
}

// ============================================================================
// Comparison Report
// ============================================================================

/// Left, right and matched track counts for one artist or genre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub left: usize,
    pub right: usize,
    pub matched: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub left_name: String,
    pub right_name: String,
    pub left_total: usize,
    pub right_total: usize,
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    /// matched / left total
    pub match_rate: f64,
    /// matched / size of the union of both libraries
    pub overlap_ratio: f64,
    pub average_score: f64,
    /// Committed matches per kind, keyed by kind name
    pub by_kind: BTreeMap<String, usize>,
    pub candidate_pairs: usize,
    pub by_artist: BTreeMap<String, Breakdown>,
    pub by_genre: BTreeMap<String, Breakdown>,
    pub by_decade: BTreeMap<String, Breakdown>,
}

impl ComparisonReport {
    pub fn build(left: &Library, right: &Library, result: &ComparisonResult) -> Self {
        let matched = result.matches.len();
        let (left_total, right_total) = (left.len(), right.len());

        let mut by_kind: BTreeMap<String, usize> = [MatchKind::IsrcExact, MatchKind::FuzzyHigh, MatchKind::DurationCorroborated]
            .iter()
            .map(|k| (k.as_str().to_string(), 0))
            .collect();
        for m in &result.matches {
            *by_kind.entry(m.kind.as_str().to_string()).or_insert(0) += 1;
        }

        let average_score = if matched == 0 {
            0.0
        } else {
            result.matches.iter().map(|m| m.score).sum::<f64>() / matched as f64
        };

        let mut by_artist: BTreeMap<String, Breakdown> = BTreeMap::new();
        let mut by_genre: BTreeMap<String, Breakdown> = BTreeMap::new();
        let mut by_decade: BTreeMap<String, Breakdown> = BTreeMap::new();
        for track in &left.tracks {
            if let Some(artist) = artist_key(track) {
                by_artist.entry(artist).or_default().left += 1;
            }
            by_genre.entry(genre_key(track)).or_default().left += 1;
            by_decade.entry(decade_key(track)).or_default().left += 1;
        }
        for track in &right.tracks {
            if let Some(artist) = artist_key(track) {
                by_artist.entry(artist).or_default().right += 1;
            }
            by_genre.entry(genre_key(track)).or_default().right += 1;
            by_decade.entry(decade_key(track)).or_default().right += 1;
        }
        // Matched counts are attributed to the left track's artist, genre and decade
        for (track, _, _) in result.matched_pairs(left, right) {
            if let Some(artist) = artist_key(track) {
                by_artist.entry(artist).or_default().matched += 1;
            }
            by_genre.entry(genre_key(track)).or_default().matched += 1;
            by_decade.entry(decade_key(track)).or_default().matched += 1;
        }

        Self {
            left_name: left.label(),
            right_name: right.label(),
            left_total,
            right_total,
            matched,
            left_only: result.unmatched_left.len(),
            right_only: result.unmatched_right.len(),
            match_rate: ratio(matched, left_total),
            overlap_ratio: ratio(matched, (left_total + right_total).saturating_sub(matched)),
            average_score,
            by_kind,
            candidate_pairs: result.stats.candidate_pairs,
            by_artist,
            by_genre,
            by_decade,
        }
    }
}

// ============================================================================
// Dedup Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub library: String,
    pub total_tracks: usize,
    pub clusters: usize,
    /// Cluster members other than the canonical track
    pub redundant_tracks: usize,
    pub largest_cluster: usize,
    pub tracks_after_dedup: usize,
}

impl DedupReport {
    pub fn build(library: &Library, clusters: &[DuplicateCluster]) -> Self {
        let redundant_tracks = clusters.iter().map(|c| c.len().saturating_sub(1)).sum();
        Self {
            library: library.label(),
            total_tracks: library.len(),
            clusters: clusters.len(),
            redundant_tracks,
            largest_cluster: clusters.iter().map(DuplicateCluster::len).max().unwrap_or(0),
            tracks_after_dedup: library.len() - redundant_tracks,
        }
    }
}

// ============================================================================
// Multi-Library Analysis
// ============================================================================

/// A track identified by library index and position, with its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRef {
    pub library: usize,
    pub position: usize,
    pub title: String,
    pub artist: String,
}

impl TrackRef {
    fn new(library: usize, position: usize, track: &Track) -> Self {
        Self {
            library,
            position,
            title: track.title.clone(),
            artist: track.artist.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub left: usize,
    pub right: usize,
    pub report: ComparisonReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueTracks {
    pub library: String,
    pub tracks: Vec<TrackRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistOverlap {
    pub total_unique_artists: usize,
    /// Artists present in every library, sorted
    pub universal_artists: Vec<String>,
    pub top_artists: Vec<ArtistCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryAnalysis {
    pub libraries: Vec<LibraryStats>,
    /// One entry per library pair (i < j)
    pub comparisons: Vec<PairwiseComparison>,
    /// Tracks of the first library matched in every other library
    pub universal_tracks: Vec<TrackRef>,
    /// Per library, tracks matched in no other library
    pub unique_tracks: Vec<UniqueTracks>,
    pub artists: ArtistOverlap,
}

/// Compare every pair of libraries and summarize what they share.
pub fn analyze_libraries(libraries: &[Library], config: &MatchConfig) -> Result<LibraryAnalysis> {
    if libraries.len() < 2 {
        return Err(MatchError::TooFewLibraries {
            found: libraries.len(),
        });
    }
    config.validate()?;

    // matched[k][p]: track p of library k matched in at least one comparison
    let mut matched: Vec<Vec<bool>> = libraries.iter().map(|l| vec![false; l.len()]).collect();
    // matched_against_first[p]: number of other libraries track p of library 0 matched
    let mut matched_against_first = vec![0usize; libraries[0].len()];
    let mut comparisons = Vec::new();

    for i in 0..libraries.len() {
        for j in (i + 1)..libraries.len() {
            let result = compare_libraries(&libraries[i], &libraries[j], config)?;
            for m in &result.matches {
                matched[i][m.left] = true;
                matched[j][m.right] = true;
                if i == 0 {
                    matched_against_first[m.left] += 1;
                }
            }
            comparisons.push(PairwiseComparison {
                left: i,
                right: j,
                report: ComparisonReport::build(&libraries[i], &libraries[j], &result),
            });
        }
    }

    let others = libraries.len() - 1;
    let universal_tracks = matched_against_first
        .iter()
        .enumerate()
        .filter(|(_, &count)| count == others)
        .map(|(p, _)| TrackRef::new(0, p, &libraries[0].tracks[p]))
        .collect();

    let unique_tracks = libraries
        .iter()
        .enumerate()
        .map(|(k, library)| UniqueTracks {
            library: library.label(),
            tracks: library
                .tracks
                .iter()
                .enumerate()
                .filter(|(p, _)| !matched[k][*p])
                .map(|(p, t)| TrackRef::new(k, p, t))
                .collect(),
        })
        .collect();

    Ok(LibraryAnalysis {
        libraries: libraries.iter().map(LibraryStats::build).collect(),
        comparisons,
        universal_tracks,
        unique_tracks,
        artists: artist_overlap(libraries),
    })
}

fn artist_overlap(libraries: &[Library]) -> ArtistOverlap {
    let mut combined: FxHashMap<String, usize> = FxHashMap::default();
    let mut per_library: Vec<FxHashSet<String>> = Vec::with_capacity(libraries.len());

    for library in libraries {
        let mut seen = FxHashSet::default();
        for artist in library.tracks.iter().filter_map(artist_key) {
            *combined.entry(artist.clone()).or_insert(0) += 1;
            seen.insert(artist);
        }
        per_library.push(seen);
    }

    let mut universal_artists: Vec<String> = match per_library.split_first() {
        Some((first, rest)) => first
            .iter()
            .filter(|a| rest.iter().all(|set| set.contains(*a)))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    universal_artists.sort();

    ArtistOverlap {
        total_unique_artists: combined.len(),
        universal_artists,
        top_artists: top_counts(&combined, TOP_ANALYSIS_ARTISTS),
    }
}
