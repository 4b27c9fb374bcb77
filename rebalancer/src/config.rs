//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sleevebook::{Cents, HarvestThresholds, Method, RebalanceRequest};

use crate::error::{Error, Result};

/// Top-level configuration. Every section and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Defaults applied to every rebalance request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub allow_overinvestment: bool,
    pub max_overinvestment_pct: f64,
    pub harvest_min_loss_pct: f64,
    pub harvest_min_loss_usd: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let harvest = HarvestThresholds::default();
        Self {
            allow_overinvestment: false,
            max_overinvestment_pct: 5.0,
            harvest_min_loss_pct: harvest.min_loss_pct,
            harvest_min_loss_usd: harvest.min_loss as f64 / 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".into(),
            audit_file: "audit.jsonl".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        let e = &self.engine;
        if !e.max_overinvestment_pct.is_finite() || e.max_overinvestment_pct < 0.0 {
            return Err(Error::Config("max_overinvestment_pct must be >= 0".into()));
        }
        if e.max_overinvestment_pct > 100.0 {
            return Err(Error::Config(
                "max_overinvestment_pct must be <= 100".into(),
            ));
        }
        if !e.harvest_min_loss_pct.is_finite() || e.harvest_min_loss_pct < 0.0 {
            return Err(Error::Config("harvest_min_loss_pct must be >= 0".into()));
        }
        if !e.harvest_min_loss_usd.is_finite() || e.harvest_min_loss_usd < 0.0 {
            return Err(Error::Config("harvest_min_loss_usd must be >= 0".into()));
        }
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Harvest thresholds with the dollar minimum converted to cents.
    pub fn harvest_thresholds(&self) -> HarvestThresholds {
        HarvestThresholds {
            min_loss_pct: self.engine.harvest_min_loss_pct,
            min_loss: (self.engine.harvest_min_loss_usd * 100.0).round() as Cents,
        }
    }

    /// A request for `portfolio_id` carrying the configured engine defaults.
    pub fn request(&self, portfolio_id: &str, method: Method) -> RebalanceRequest {
        let mut request = RebalanceRequest::new(portfolio_id, method);
        request.allow_overinvestment = self.engine.allow_overinvestment;
        request.max_overinvestment_percent = self.engine.max_overinvestment_pct;
        request.harvest = self.harvest_thresholds();
        request
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
