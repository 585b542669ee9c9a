//! Configuration management for the risk fusion pipeline

use crate::models::fusion::FusionConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming assessment requests
    pub request_subject: String,
    /// Subject for verdicts of requests without a reply subject
    pub verdict_subject: String,
}

/// ML models configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory with the payment-delay models (`delay_probability`, `delay_days`)
    pub payment_models_dir: String,
    /// Directory with the loan models (`acceptance`, `default`, `delay`, `fraud`)
    pub loan_models_dir: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Concurrent assessments (service permits and bulk worker pool size)
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// `RISK__<SECTION>__<KEY>` environment variables override file values.
    /// The `[fusion]` constants are validated after merging.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RISK").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .fusion
            .validate()
            .context("Invalid [fusion] configuration")?;

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "risk.assess".to_string(),
                verdict_subject: "risk.verdicts".to_string(),
            },
            models: ModelsConfig {
                payment_models_dir: "models/payment_delay".to_string(),
                loan_models_dir: "models/loan".to_string(),
                onnx_threads: 1,
            },
            fusion: FusionConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "risk.assess");
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.fusion.loan.default, 0.40);
        assert_eq!(config.fusion.anomaly.center, -0.5);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.nats.request_subject, defaults.nats.request_subject);
        assert_eq!(config.models.payment_models_dir, defaults.models.payment_models_dir);
        assert_eq!(config.fusion, defaults.fusion);
        assert_eq!(config.pipeline.workers, defaults.pipeline.workers);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load_from_path("/nonexistent/config.toml").is_err());
    }

    #[test]
    fn test_zero_anomaly_width_is_rejected() {
        let shipped = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml"));
        let broken = shipped.replace("width = 0.5", "width = 0.0");
        assert_ne!(shipped, broken);

        let path = std::env::temp_dir().join(format!("risk-fusion-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, broken).unwrap();
        let result = AppConfig::load_from_path(&path);
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("anomaly.width"));
    }
}
