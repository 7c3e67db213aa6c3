//! Guard against exports overwriting the libraries they were built from.
//!
//! Report outputs must carry a recognizable name and may never resolve to one
//! of the input library files.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Every export file name must contain this
pub const REPORT_PATTERN: &str = "report";

fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Validate that `output` is safe to create or overwrite.
///
/// - the file name must contain `required_pattern`
/// - the path must not resolve to any of `inputs`
/// - the path must not be an existing directory
pub fn validate_output_path(output: &Path, required_pattern: &str, inputs: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    if output.is_dir() {
        bail!("Safety check failed: output '{}' is a directory", output.display());
    }

    let target = resolved(output);
    for input in inputs {
        if output == *input || target == resolved(input) {
            bail!(
                "Safety check failed: output '{}' would overwrite input library '{}'",
                output.display(),
                input.display()
            );
        }
    }

    Ok(())
}

/// `validate_output_path` with the standard report pattern.
pub fn validate_report_path(output: &Path, inputs: &[&Path]) -> Result<()> {
    validate_output_path(output, REPORT_PATTERN, inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_report_path() {
        let output = PathBuf::from("/tmp/spotify-vs-apple-report.sqlite3");
        let input = PathBuf::from("/data/spotify.json");
        assert!(validate_report_path(&output, &[&input]).is_ok());
    }

    #[test]
    fn test_missing_pattern() {
        let output = PathBuf::from("/tmp/output.sqlite3");
        let err = validate_report_path(&output, &[]).unwrap_err();
        assert!(err.to_string().contains("must contain 'report'"));
    }

    #[test]
    fn test_output_equals_input() {
        let path = PathBuf::from("/data/report-library.json");
        let err = validate_report_path(&path, &[&path]).unwrap_err();
        assert!(err.to_string().contains("would overwrite input library"));
    }

    #[test]
    fn test_relative_alias_of_input_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("library-report.json");
        std::fs::write(&input, "{}").unwrap();
        let alias = dir.path().join(".").join("library-report.json");
        assert!(validate_report_path(&alias, &[&input]).is_err());
    }

    #[test]
    fn test_directory_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report");
        std::fs::create_dir(&output).unwrap();
        assert!(validate_report_path(&output, &[]).is_err());
    }
}
