//! Music library reconciliation - shared modules for all binaries.
//!
//! Compares track libraries exported from different streaming platforms,
//! resolves which tracks are the same recording, and finds duplicates within
//! a single library.

pub mod cli;
pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod export;
pub mod index;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod resolve;
pub mod safety;
pub mod scoring;

pub use config::MatchConfig;
pub use dedup::deduplicate_library;
pub use error::{MatchError, Result};
pub use models::{ComparisonResult, DuplicateCluster, Library, MatchCandidate, MatchKind, Track};
pub use report::analyze_libraries;
pub use resolve::compare_libraries;
