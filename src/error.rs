//! Error types for library comparison and deduplication.
//!
//! Scoring itself is total over normalized strings; the only failures are
//! malformed input tracks and invalid configuration, both reported before
//! any matching work starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// A track that cannot be normalized (title and artist both blank).
    #[error("malformed track #{position} (raw id {raw_id:?}) in library '{library}': {reason}")]
    InputError {
        library: String,
        position: usize,
        raw_id: Option<String>,
        reason: String,
    },

    /// A MatchConfig value outside its valid range.
    #[error("invalid config value for `{field}` ({value}): {reason}")]
    ConfigError {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("need at least 2 libraries to analyze, got {found}")]
    TooFewLibraries { found: usize },
}

impl MatchError {
    pub(crate) fn config(field: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        MatchError::ConfigError {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_names_track() {
        let err = MatchError::InputError {
            library: "spotify".to_string(),
            position: 3,
            raw_id: Some("abc".to_string()),
            reason: "title and artist are both empty".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("#3"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("spotify"));
    }

    #[test]
    fn test_config_error_names_field() {
        let err = MatchError::config("loose_threshold", 0.95, "must be <= strict_threshold");
        assert!(err.to_string().contains("`loose_threshold`"));
        assert!(err.to_string().contains("0.95"));
    }
}
