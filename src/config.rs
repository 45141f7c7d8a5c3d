use std::path::PathBuf;

use crate::export::DEFAULT_PREVIEW_EXTENSION;

const DEFAULT_OUTPUT_DIR: &str = "previews";
const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration
///
/// Loaded from the environment, after an optional `.env` file. Command-line
/// flags override these values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Where extracted previews are written (`LUMEN_OUTPUT_DIR`)
    pub output_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset (`LUMEN_LOG`)
    pub log_filter: String,
    /// Extension of extracted preview files (`LUMEN_PREVIEW_EXTENSION`)
    pub preview_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            preview_extension: DEFAULT_PREVIEW_EXTENSION.to_string(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            output_dir: non_empty("LUMEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            log_filter: non_empty("LUMEN_LOG").unwrap_or(defaults.log_filter),
            preview_extension: non_empty("LUMEN_PREVIEW_EXTENSION")
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or(defaults.preview_extension),
        }
    }
}
