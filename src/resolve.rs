//! Cross-library resolution: candidates → scores → 1:1 greedy assignment.
//!
//! Scoring runs in parallel per left track; the assignment pass runs serially
//! over the fully collected, deterministically sorted candidate list, so the
//! result does not depend on thread scheduling.
//!
//! Greedy assignment is not a maximum-weight bipartite matching. A strong
//! pair committed early can leave a slightly weaker neighbour unmatched; those
//! losers are kept in `displaced` so callers can see them.

use rayon::prelude::*;
use std::cmp::Ordering;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::index::{CandidateIndex, Lookup};
use crate::models::{ComparisonResult, ComparisonStats, Library, MatchCandidate, MatchKind, NormalizedKey};
use crate::normalize::normalize_library;
use crate::scoring::score;

/// Compare two libraries and resolve them into 1:1 matches plus unmatched sets.
///
/// Fails with `ConfigError` before touching any track, or `InputError` when a
/// track on either side cannot be normalized.
pub fn compare_libraries(left: &Library, right: &Library, config: &MatchConfig) -> Result<ComparisonResult> {
    config.validate()?;
    let left_keys = normalize_library(left)?;
    let right_keys = normalize_library(right)?;
    Ok(resolve(&left_keys, &right_keys, right, config))
}

/// Number of pairs `compare_libraries` would score, without scoring them.
/// Lets callers enforce a comparison budget before running.
pub fn candidate_pair_count(left: &Library, right: &Library, config: &MatchConfig) -> Result<usize> {
    config.validate()?;
    let left_keys = normalize_library(left)?;
    let right_keys = normalize_library(right)?;
    let index = CandidateIndex::build(right, &right_keys);
    Ok(left_keys
        .iter()
        .map(|key| index.lookup(key, config.use_isrc).positions.len())
        .sum())
}

/// Scored candidates for one left track, with the lookup that produced them.
struct Scored {
    lookup: Lookup,
    candidates: Vec<MatchCandidate>,
}

fn resolve(
    left_keys: &[NormalizedKey],
    right_keys: &[NormalizedKey],
    right: &Library,
    config: &MatchConfig,
) -> ComparisonResult {
    let index = CandidateIndex::build(right, right_keys);

    // Order-preserving parallel collect: one entry per left track
    let scored: Vec<Scored> = left_keys
        .par_iter()
        .map(|key| {
            let lookup = index.lookup(key, config.use_isrc);
            let candidates = lookup
                .positions
                .iter()
                .map(|&r| score(key, &right_keys[r], config))
                .collect();
            Scored { lookup, candidates }
        })
        .collect();

    let mut stats = ComparisonStats {
        left_total: left_keys.len(),
        right_total: right_keys.len(),
        ..ComparisonStats::default()
    };

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for entry in scored {
        stats.candidate_pairs += entry.lookup.positions.len();
        stats.isrc_pairs += entry.lookup.isrc_only;
        stats.largest_block = stats.largest_block.max(entry.lookup.block_size);

        for candidate in entry.candidates {
            if candidate.is_accepted() {
                accepted.push(candidate);
            } else {
                rejected.push(candidate);
            }
        }
    }

    let (matches, displaced) = assign_greedy(accepted, left_keys.len(), right_keys.len());

    for m in &matches {
        match m.kind {
            MatchKind::IsrcExact => stats.isrc_exact += 1,
            MatchKind::FuzzyHigh => stats.fuzzy_high += 1,
            MatchKind::DurationCorroborated => stats.duration_corroborated += 1,
            MatchKind::FuzzyMedium | MatchKind::Rejected => {}
        }
    }

    let unmatched = |taken: &[bool]| {
        taken
            .iter()
            .enumerate()
            .filter(|(_, &t)| !t)
            .map(|(i, _)| i)
            .collect::<Vec<_>>()
    };
    let mut left_taken = vec![false; left_keys.len()];
    let mut right_taken = vec![false; right_keys.len()];
    for m in &matches {
        left_taken[m.left] = true;
        right_taken[m.right] = true;
    }

    ComparisonResult {
        unmatched_left: unmatched(&left_taken),
        unmatched_right: unmatched(&right_taken),
        matches,
        rejected,
        displaced,
        stats,
    }
}

/// Strongest first: kind rank, then score, then left and right position.
pub fn by_strength(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.kind
        .rank()
        .cmp(&a.kind.rank())
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.left.cmp(&b.left))
        .then_with(|| a.right.cmp(&b.right))
}

/// Commit candidates strongest first while neither side is taken.
/// Returns (committed matches ordered by left position, displaced candidates).
pub fn assign_greedy(
    mut accepted: Vec<MatchCandidate>,
    left_len: usize,
    right_len: usize,
) -> (Vec<MatchCandidate>, Vec<MatchCandidate>) {
    accepted.sort_by(by_strength);

    let mut left_taken = vec![false; left_len];
    let mut right_taken = vec![false; right_len];
    let mut matches = Vec::new();
    let mut displaced = Vec::new();

    for candidate in accepted {
        if left_taken[candidate.left] || right_taken[candidate.right] {
            displaced.push(candidate);
            continue;
        }
        left_taken[candidate.left] = true;
        right_taken[candidate.right] = true;
        matches.push(candidate);
    }

    matches.sort_by_key(|m| m.left);
    (matches, displaced)
}
