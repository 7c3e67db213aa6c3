//! Duplicate detection within a single library.
//!
//! Same indexer and matcher as cross-library comparison, but only ISRC-exact
//! and fuzzy-high pairs may link tracks. Links are transitive.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::index::CandidateIndex;
use crate::models::{DuplicateCluster, Library, MatchCandidate, MatchKind};
use crate::normalize::normalize_library;
use crate::scoring::score;

/// Kinds strong enough to merge two tracks of the same library
fn links_duplicates(kind: MatchKind) -> bool {
    matches!(kind, MatchKind::IsrcExact | MatchKind::FuzzyHigh)
}

/// Union-find over track positions with path halving.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Join two sets; the smaller root becomes the representative.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

/// Find clusters of tracks in one library that are the same recording.
///
/// Clusters have at least two members, are pairwise disjoint and come back
/// ordered by their first member.
pub fn deduplicate_library(library: &Library, config: &MatchConfig) -> Result<Vec<DuplicateCluster>> {
    config.validate()?;
    let keys = normalize_library(library)?;
    let index = CandidateIndex::build(library, &keys);

    // Each unordered pair is scored once, from its lower position
    let links: Vec<MatchCandidate> = keys
        .par_iter()
        .map(|key| {
            index
                .lookup(key, config.use_isrc)
                .positions
                .into_iter()
                .filter(|&j| j > key.position)
                .map(|j| score(key, &keys[j], config))
                .filter(|c| links_duplicates(c.kind))
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect();

    let mut sets = DisjointSet::new(keys.len());
    for link in &links {
        sets.union(link.left, link.right);
    }

    let mut groups: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for position in 0..keys.len() {
        let root = sets.find(position);
        groups.entry(root).or_default().push(position);
    }

    let mut cluster_links: FxHashMap<usize, Vec<MatchCandidate>> = FxHashMap::default();
    for link in links {
        let root = sets.find(link.left);
        cluster_links.entry(root).or_default().push(link);
    }

    let mut clusters: Vec<DuplicateCluster> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(root, members)| {
            let canonical = pick_canonical(library, &members);
            DuplicateCluster {
                links: cluster_links.remove(&root).unwrap_or_default(),
                canonical,
                members,
            }
        })
        .collect();

    clusters.sort_by_key(|c| c.members[0]);
    Ok(clusters)
}

/// Most complete member wins; ties go to the earliest position.
/// `members` must be non-empty and ascending.
fn pick_canonical(library: &Library, members: &[usize]) -> usize {
    members
        .iter()
        .copied()
        .max_by_key(|&m| (library.tracks[m].completeness(), Reverse(m)))
        .unwrap_or(members[0])
}
