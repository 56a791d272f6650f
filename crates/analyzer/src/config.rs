//! Analyzer configuration

use analyzer_lib::anomaly::DEFAULT_SEED;
use analyzer_lib::pipeline::DEFAULT_WINDOW_SIZE;
use analyzer_lib::report::DEFAULT_RETENTION;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Analyzer configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnalyzerConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Directory holding `metadata_snapshot_*.json` files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving feature and anomaly tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of most recent snapshots analyzed per cycle
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Seconds between processing cycles
    #[serde(default = "default_processing_interval")]
    pub processing_interval_secs: u64,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Table files kept per kind
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Seed for the isolation forest
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "metadata-analyzer".to_string())
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/processed_data")
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_processing_interval() -> u64 {
    600
}

fn default_api_port() -> u16 {
    8001
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            window_size: default_window_size(),
            processing_interval_secs: default_processing_interval(),
            api_port: default_api_port(),
            retention: default_retention(),
            seed: default_seed(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from `ANALYZER_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ANALYZER").try_parsing(true))
            .build()?;

        Ok(Self::from_config(config))
    }

    /// Deserialize a built config, falling back to defaults when it is invalid
    pub fn from_config(config: config::Config) -> Self {
        match config.try_deserialize::<AnalyzerConfig>() {
            Ok(parsed) => parsed.sanitized(),
            Err(e) => {
                warn!(error = %e, "Invalid analyzer configuration, using defaults");
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if self.window_size == 0 {
            warn!("window_size must be positive, using default");
            self.window_size = default_window_size();
        }
        if self.processing_interval_secs == 0 {
            warn!("processing_interval_secs must be positive, using default");
            self.processing_interval_secs = default_processing_interval();
        }
        if self.retention == 0 {
            warn!("retention must be positive, using default");
            self.retention = default_retention();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, &str)]) -> AnalyzerConfig {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        AnalyzerConfig::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = build(&[]);
        assert_eq!(config.input_dir, PathBuf::from("/data"));
        assert_eq!(config.output_dir, PathBuf::from("/processed_data"));
        assert_eq!(config.window_size, 12);
        assert_eq!(config.processing_interval_secs, 600);
        assert_eq!(config.api_port, 8001);
        assert_eq!(config.retention, 48);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_overrides() {
        let config = build(&[("input_dir", "/snapshots"), ("window_size", "24")]);
        assert_eq!(config.input_dir, PathBuf::from("/snapshots"));
        assert_eq!(config.window_size, 24);
        assert_eq!(config.api_port, 8001);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = build(&[("api_port", "not-a-port")]);
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert_eq!(build(&[("window_size", "0")]).window_size, 12);
    }
}
