//! Pieces shared by the binaries: tracing setup, library loading and the
//! config flags layered over a config file.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::MatchConfig;
use crate::models::Library;

/// Log to stderr, filtered by RUST_LOG (default `info`).
pub fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Load a library exported as `{"name", "platform", "tracks": [...]}`.
/// A missing name falls back to the file stem.
pub fn load_library(path: &Path) -> Result<Library> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read library {}", path.display()))?;
    let parsed: Library =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse library {}", path.display()))?;

    let name = if parsed.name.is_empty() {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    } else {
        parsed.name
    };
    Ok(Library::new(name, parsed.platform, parsed.tracks))
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Start from the lenient preset (lower thresholds, wider duration window)
    #[arg(long, global = true)]
    pub lenient: bool,

    #[arg(long, global = true)]
    pub strict_threshold: Option<f64>,

    #[arg(long, global = true)]
    pub loose_threshold: Option<f64>,

    /// Duration tolerance in seconds
    #[arg(long, global = true)]
    pub duration_tolerance: Option<u32>,

    #[arg(long, global = true)]
    pub title_weight: Option<f64>,

    #[arg(long, global = true)]
    pub artist_weight: Option<f64>,

    /// Ignore ISRCs (for exports with unreliable identifiers)
    #[arg(long, global = true)]
    pub no_isrc: bool,
}

impl ConfigArgs {
    /// Resolve the effective config: file or preset, then flag overrides, then validation.
    pub fn resolve(&self) -> Result<MatchConfig> {
        let mut config = match (&self.config, self.lenient) {
            (Some(path), _) => MatchConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            (None, true) => MatchConfig::lenient(),
            (None, false) => MatchConfig::strict(),
        };

        if let Some(v) = self.strict_threshold {
            config.strict_threshold = v;
        }
        if let Some(v) = self.loose_threshold {
            config.loose_threshold = v;
        }
        if let Some(v) = self.duration_tolerance {
            config.duration_tolerance_secs = v;
        }
        // A single weight flag implies its complement
        match (self.title_weight, self.artist_weight) {
            (Some(t), Some(a)) => {
                config.title_weight = t;
                config.artist_weight = a;
            }
            (Some(t), None) => {
                config.title_weight = t;
                config.artist_weight = 1.0 - t;
            }
            (None, Some(a)) => {
                config.title_weight = 1.0 - a;
                config.artist_weight = a;
            }
            (None, None) => {}
        }
        if self.no_isrc {
            config.use_isrc = false;
        }

        config.validate()?;
        Ok(config)
    }
}
