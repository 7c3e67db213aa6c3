//! Candidate index over one library.
//!
//! Two lookups bound pairwise comparison: a blocking-key bucket index and an
//! ISRC index. Buckets are unbounded; a huge bucket (greatest-hits or
//! various-artists collections) just costs a full pairwise pass over itself.

use rustc_hash::FxHashMap;

use crate::models::{Library, NormalizedKey, Track};

/// Index mapping blocking key to track positions, in insertion order
pub type BlockIndex = FxHashMap<String, Vec<usize>>;

/// Index mapping normalized ISRC to track positions, in insertion order
pub type IsrcIndex = FxHashMap<String, Vec<usize>>;

pub struct CandidateIndex<'a> {
    library: &'a Library,
    blocks: BlockIndex,
    isrcs: IsrcIndex,
}

impl<'a> CandidateIndex<'a> {
    /// Build both lookups in one linear pass over the library's normalized keys.
    pub fn build(library: &'a Library, keys: &[NormalizedKey]) -> Self {
        let mut blocks: BlockIndex = FxHashMap::default();
        let mut isrcs: IsrcIndex = FxHashMap::default();

        for key in keys {
            blocks
                .entry(key.blocking_key.clone())
                .or_default()
                .push(key.position);
            if let Some(isrc) = &key.isrc {
                isrcs.entry(isrc.clone()).or_default().push(key.position);
            }
        }

        Self {
            library,
            blocks,
            isrcs,
        }
    }

    /// Positions sharing the key's blocking bucket.
    pub fn candidate_positions(&self, key: &NormalizedKey) -> &[usize] {
        self.blocks
            .get(&key.blocking_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tracks sharing the key's blocking bucket.
    pub fn candidates_for(&self, key: &NormalizedKey) -> impl Iterator<Item = (usize, &'a Track)> + '_ {
        let library = self.library;
        self.candidate_positions(key)
            .iter()
            .filter_map(move |&i| library.tracks.get(i).map(|t| (i, t)))
    }

    /// All positions carrying this (already normalized) ISRC.
    pub fn isrc_positions(&self, isrc: &str) -> &[usize] {
        self.isrcs.get(isrc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First track carrying this ISRC. Accepts raw, untrimmed input.
    pub fn by_isrc(&self, isrc: &str) -> Option<&'a Track> {
        let normalized = crate::normalize::normalize_isrc(isrc)?;
        let first = *self.isrc_positions(&normalized).first()?;
        self.library.tracks.get(first)
    }

    /// Union of ISRC and blocking candidates for a key, ascending and deduplicated.
    /// ISRC lookups bypass blocking so identifier matches are never lost to a
    /// title or artist spelled differently.
    pub fn lookup(&self, key: &NormalizedKey, use_isrc: bool) -> Lookup {
        let block = self.candidate_positions(key);
        let mut positions: Vec<usize> = block.to_vec();
        let mut isrc_hits = 0;

        if use_isrc {
            if let Some(isrc) = &key.isrc {
                let hits = self.isrc_positions(isrc);
                isrc_hits = hits.iter().filter(|&&p| !block.contains(&p)).count();
                positions.extend_from_slice(hits);
            }
        }

        positions.sort_unstable();
        positions.dedup();

        Lookup {
            positions,
            block_size: block.len(),
            isrc_only: isrc_hits,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn largest_block(&self) -> usize {
        self.blocks.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }
}

/// Candidate positions for one key plus what produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub positions: Vec<usize>,
    /// Size of the blocking bucket consulted
    pub block_size: usize,
    /// Positions reached only through the ISRC index
    pub isrc_only: usize,
}
