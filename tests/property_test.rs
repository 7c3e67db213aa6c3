//! Property-based tests for comparison and dedup invariants.
//!
//! Tracks are drawn from small vocabularies so that generated libraries
//! actually overlap, share blocking keys and collide on ISRCs.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

use library_reconcile::models::{ComparisonResult, MatchCandidate};
use library_reconcile::normalize::normalize_track;
use library_reconcile::scoring::{score, score_tracks};
use library_reconcile::{compare_libraries, deduplicate_library, Library, MatchConfig, MatchKind, Track};

// ===== Helpers =====

const TITLES: &[&str] = &[
    "Yesterday",
    "Yesterday (Remastered 2009)",
    "Hey Jude",
    "Hey Jude - Live",
    "Let It Be",
    "Let It Bee",
    "Something",
    "Somethin'",
];

const ARTISTS: &[&str] = &["The Beatles", "Beatles", "Beatles feat. Billy Preston", "Queen", "Quen"];

const ISRCS: &[&str] = &["GBAYE0601690", "gbaye0601690", "USRC17607839", "GBUM71029604"];

fn arbitrary_track() -> impl Strategy<Value = Track> {
    (
        prop::sample::select(TITLES),
        prop::sample::select(ARTISTS),
        proptest::option::of(150u32..190),
        proptest::option::weighted(0.3, prop::sample::select(ISRCS)),
        proptest::option::of("[A-Za-z ]{1,12}"),
    )
        .prop_map(|(title, artist, duration, isrc, album)| {
            let mut track = Track::new(title, artist);
            track.duration = duration;
            track.isrc = isrc.map(str::to_string);
            track.album = album;
            track
        })
}

fn arbitrary_library(name: &'static str) -> impl Strategy<Value = Library> {
    prop::collection::vec(arbitrary_track(), 0..25).prop_map(move |tracks| Library::new(name, name, tracks))
}

/// Valid configs with loose <= strict and weights summing to 1
fn arbitrary_config() -> impl Strategy<Value = MatchConfig> {
    (0.5f64..=1.0, 0.5f64..=1.0, 0u32..15, 0.2f64..0.8, any::<bool>()).prop_map(|(a, b, tolerance, tw, use_isrc)| {
        MatchConfig {
            strict_threshold: a.max(b),
            loose_threshold: a.min(b),
            duration_tolerance_secs: tolerance,
            title_weight: tw,
            artist_weight: 1.0 - tw,
            use_isrc,
        }
    })
}

/// Tracks with short two-letter titles: many shared blocks, few identical scores.
fn varied_track() -> impl Strategy<Value = Track> {
    (
        "[ab]{4,7}",
        prop::sample::select(&["Abba", "Abbas", "Queen", "Quen"][..]),
        proptest::option::of(150u32..190),
        proptest::option::weighted(0.15, prop::sample::select(ISRCS)),
    )
        .prop_map(|(title, artist, duration, isrc)| {
            let mut track = Track::new(title, artist);
            track.duration = duration;
            track.isrc = isrc.map(str::to_string);
            track
        })
}

/// A library and a shuffled copy of it. Each track carries a unique raw id
/// so results can be compared by identity instead of position.
fn library_and_shuffle(name: &'static str) -> impl Strategy<Value = (Library, Library)> {
    prop::collection::vec(varied_track(), 0..20)
        .prop_flat_map(move |tracks| {
            let tagged: Vec<Track> = tracks
                .into_iter()
                .enumerate()
                .map(|(i, t)| t.with_raw_id(format!("{name}{i}")))
                .collect();
            (Just(tagged.clone()), Just(tagged).prop_shuffle())
        })
        .prop_map(move |(original, shuffled)| (Library::new(name, name, original), Library::new(name, name, shuffled)))
}

fn track_id(library: &Library, position: usize) -> String {
    library.tracks[position].raw_id.clone().unwrap_or_default()
}

fn matched_ids(result: &ComparisonResult, left: &Library, right: &Library) -> BTreeSet<(String, String, MatchKind)> {
    result
        .matches
        .iter()
        .map(|m| (track_id(left, m.left), track_id(right, m.right), m.kind))
        .collect()
}

/// True when two accepted candidates share a (kind rank, score) sort key,
/// leaving the greedy pass to break the tie by position.
fn has_strength_ties(result: &ComparisonResult) -> bool {
    let accepted: Vec<&MatchCandidate> = result.matches.iter().chain(&result.displaced).collect();
    let keys: HashSet<(u8, u64)> = accepted.iter().map(|c| (c.kind.rank(), c.score.to_bits())).collect();
    keys.len() < accepted.len()
}

fn cluster_ids(library: &Library, config: &MatchConfig) -> BTreeSet<(BTreeSet<String>, usize)> {
    deduplicate_library(library, config)
        .unwrap()
        .iter()
        .map(|c| {
            let members = c.members.iter().map(|&p| track_id(library, p)).collect();
            (members, library.tracks[c.canonical].completeness())
        })
        .collect()
}

/// Every scored pair of a comparison, whatever happened to it.
fn all_scored(result: &ComparisonResult) -> impl Iterator<Item = &MatchCandidate> {
    result.matches.iter().chain(&result.displaced).chain(&result.rejected)
}

// ===== Property Tests =====

proptest! {
    /// Property: every track is either matched or unmatched, exactly once per side
    #[test]
    fn comparison_partitions_both_libraries(
        left in arbitrary_library("left"),
        right in arbitrary_library("right"),
        config in arbitrary_config(),
    ) {
        let result = compare_libraries(&left, &right, &config).unwrap();
        prop_assert!(result.is_partition(left.len(), right.len()));

        let lefts: HashSet<usize> = result.matches.iter().map(|m| m.left).collect();
        let rights: HashSet<usize> = result.matches.iter().map(|m| m.right).collect();
        prop_assert_eq!(lefts.len(), result.matches.len());
        prop_assert_eq!(rights.len(), result.matches.len());
        prop_assert!(result.matches.iter().all(|m| m.is_accepted()));
    }

    /// Property: repeated runs produce identical results
    #[test]
    fn comparison_is_deterministic(
        left in arbitrary_library("left"),
        right in arbitrary_library("right"),
    ) {
        let config = MatchConfig::default();
        let first = compare_libraries(&left, &right, &config).unwrap();
        let second = compare_libraries(&left, &right, &config).unwrap();
        prop_assert_eq!(first, second);

        let first = deduplicate_library(&left, &config).unwrap();
        let second = deduplicate_library(&left, &config).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: reordering either library does not change which tracks match
    /// unless the greedy pass had to break a tie by position; duplicate
    /// clusters never depend on order
    #[test]
    fn results_survive_reordering(
        (left, left_shuffled) in library_and_shuffle("l"),
        (right, right_shuffled) in library_and_shuffle("r"),
    ) {
        let config = MatchConfig::default();
        let original = compare_libraries(&left, &right, &config).unwrap();
        let reordered = compare_libraries(&left_shuffled, &right_shuffled, &config).unwrap();

        prop_assert!(reordered.is_partition(left.len(), right.len()));
        prop_assert_eq!(original.stats.candidate_pairs, reordered.stats.candidate_pairs);
        prop_assert_eq!(has_strength_ties(&original), has_strength_ties(&reordered));
        if !has_strength_ties(&original) {
            prop_assert_eq!(
                matched_ids(&original, &left, &right),
                matched_ids(&reordered, &left_shuffled, &right_shuffled)
            );
        }

        prop_assert_eq!(cluster_ids(&left, &config), cluster_ids(&left_shuffled, &config));
    }

    /// Property: equal non-empty ISRCs always classify as isrc-exact
    #[test]
    fn isrc_precedence(
        a in arbitrary_track(),
        b in arbitrary_track(),
        isrc in prop::sample::select(ISRCS),
    ) {
        let a = Track { isrc: Some(isrc.to_string()), ..a };
        let b = Track { isrc: Some(format!("  {}  ", isrc.to_lowercase())), ..b };
        let candidate = score_tracks(&a, &b, &MatchConfig::default()).unwrap();
        prop_assert_eq!(candidate.kind, MatchKind::IsrcExact);
        prop_assert_eq!(candidate.score, 1.0);
    }

    /// Property: ISRC-sharing tracks always end up matched when ISRCs are trusted
    #[test]
    fn isrc_pairs_never_lost_to_blocking(
        a in arbitrary_track(),
        b in arbitrary_track(),
    ) {
        let a = Track { isrc: Some("NLA000000001".to_string()), ..a };
        let b = Track { isrc: Some("nla000000001".to_string()), ..b };
        let result = compare_libraries(
            &Library::new("l", "spotify", vec![a]),
            &Library::new("r", "apple_music", vec![b]),
            &MatchConfig::default(),
        ).unwrap();
        prop_assert_eq!(result.matches.len(), 1);
        prop_assert_eq!(result.matches[0].kind, MatchKind::IsrcExact);
    }

    /// Property: raising strictThreshold never adds fuzzy-high pairs;
    /// lowering looseThreshold never removes accepted pairs
    #[test]
    fn thresholds_are_monotonic(
        left in arbitrary_library("left"),
        right in arbitrary_library("right"),
        strict in 0.7f64..=0.95,
        raise in 0.0f64..=0.05,
        loose in 0.6f64..=0.7,
        lower in 0.0f64..=0.1,
    ) {
        let base = MatchConfig { strict_threshold: strict, loose_threshold: loose, ..MatchConfig::default() };
        let raised = MatchConfig { strict_threshold: strict + raise, ..base.clone() };
        let lowered = MatchConfig { loose_threshold: loose - lower, ..base.clone() };

        let count = |config: &MatchConfig, pred: fn(MatchKind) -> bool| {
            let result = compare_libraries(&left, &right, config).unwrap();
            all_scored(&result).filter(|c| pred(c.kind)).count()
        };

        prop_assert!(count(&raised, |k| k == MatchKind::FuzzyHigh) <= count(&base, |k| k == MatchKind::FuzzyHigh));
        prop_assert!(count(&lowered, MatchKind::is_accepted) >= count(&base, MatchKind::is_accepted));
    }

    /// Property: text and duration components do not depend on argument order
    #[test]
    fn scoring_is_symmetric(
        a in arbitrary_track(),
        b in arbitrary_track(),
        config in arbitrary_config(),
    ) {
        let (ka, kb) = (normalize_track(0, &a), normalize_track(1, &b));
        let ab = score(&ka, &kb, &config);
        let ba = score(&kb, &ka, &config);

        prop_assert_eq!(ab.components.title_similarity, ba.components.title_similarity);
        prop_assert_eq!(ab.components.artist_similarity, ba.components.artist_similarity);
        prop_assert_eq!(ab.components.duration_delta, ba.components.duration_delta);
        prop_assert_eq!(ab.kind, ba.kind);
        prop_assert!((0.0..=1.0).contains(&ab.score));
    }

    /// Property: duplicate clusters are disjoint, non-trivial, and contain their canonical track
    #[test]
    fn clusters_are_disjoint(
        library in arbitrary_library("mine"),
        config in arbitrary_config(),
    ) {
        let clusters = deduplicate_library(&library, &config).unwrap();
        let mut seen = HashSet::new();
        for cluster in &clusters {
            prop_assert!(cluster.len() >= 2);
            prop_assert!(cluster.members.contains(&cluster.canonical));
            prop_assert!(cluster.members.windows(2).all(|w| w[0] < w[1]));
            for &member in &cluster.members {
                prop_assert!(seen.insert(member), "track {} in two clusters", member);
            }
            for link in &cluster.links {
                prop_assert!(matches!(link.kind, MatchKind::IsrcExact | MatchKind::FuzzyHigh));
            }
        }
    }
}
