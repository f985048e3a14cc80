//! Curve Configuration
//!
//! Factory-wide settings loaded from TOML:
//!
//! ```toml
//! admin = "treasury"          # 64-char hex address or a label
//! default_k = 1000000000000
//! log_level = "info"
//!
//! [fees]
//! total_bps = 8
//! creator_bps = 5
//! admin_bps = 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use lib_types::{Address, Amount};

use crate::factory::FactorySettings;
use crate::fees::FeeSchedule;
use crate::DEFAULT_K;

/// Default admin label
pub const DEFAULT_ADMIN_LABEL: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Admin fee recipient: hex address, or a label hashed into one
    pub admin: String,
    /// Curve constant for new pairs
    pub default_k: Amount,
    /// Fee schedule for new pairs
    pub fees: FeeSchedule,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN_LABEL.to_string(),
            default_k: DEFAULT_K,
            fees: FeeSchedule::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CurveConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: CurveConfig = toml::from_str(raw).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_k == 0 {
            anyhow::bail!("default_k must be greater than zero");
        }
        self.fees.validate()?;
        if self.admin_address()?.is_zero() {
            anyhow::bail!("admin must not be the zero address");
        }
        Ok(())
    }

    /// Resolve `admin` to an address
    pub fn admin_address(&self) -> Result<Address> {
        resolve_address(&self.admin)
    }

    /// Factory settings for a new ledger
    pub fn factory_settings(&self) -> Result<FactorySettings> {
        Ok(FactorySettings {
            admin: self.admin_address()?,
            default_k: self.default_k,
            fees: self.fees,
        })
    }
}

/// Hex address (optionally `0x`-prefixed) or a non-empty label
pub fn resolve_address(value: &str) -> Result<Address> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("address must not be empty");
    }

    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return trimmed
            .parse::<Address>()
            .with_context(|| format!("Invalid address {}", trimmed));
    }
    Ok(Address::from_label(trimmed))
}
