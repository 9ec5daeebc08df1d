//! Ledger configuration.
//!
//! Two historical deployments of this ledger exist: a 6-decimal-point /
//! version-1 read view, and the current version-2 view which adds the
//! `points_per_token` rate and the custody balance. Rather than
//! hard-coding one, the scales and the read-view schema are
//! configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use lumen_types::{Amount, DEFAULT_POINT_SCALE, DEFAULT_TOKEN_SCALE};

use crate::epoch::EpochConfig;
use crate::{LedgerError, Result};

/// Which field set the system read view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSchema {
    /// Legacy view: no inverse rate, no custody balance.
    V1,
    /// Current view (authoritative): adds `points_per_token` and
    /// `ledger_balance`.
    #[default]
    V2,
}

/// Complete ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Decimal scale of user points.
    #[serde(default = "default_point_scale")]
    pub point_scale: u8,
    /// Decimal scale of the reward token.
    #[serde(default = "default_token_scale")]
    pub token_scale: u8,
    /// Read-view schema version.
    #[serde(default)]
    pub schema: ViewSchema,
    /// Epoch schedule settings.
    #[serde(default)]
    pub epoch: EpochSettings,
}

/// Epoch schedule settings as written in the config file.
///
/// The reserve is given in whole tokens; it is scaled up to the token
/// scale when the ledger is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSettings {
    /// Unix timestamp (seconds) at which the schedule starts.
    #[serde(default)]
    pub start_time: u64,
    /// Length of one epoch in seconds.
    #[serde(default = "default_epoch_length")]
    pub epoch_length_secs: u64,
    /// Number of epochs over which the reserve unlocks.
    #[serde(default = "default_total_epochs")]
    pub total_epochs: u64,
    /// Total reserve in whole tokens.
    #[serde(default)]
    pub total_reserve_tokens: u64,
}

// Default value functions

fn default_point_scale() -> u8 {
    DEFAULT_POINT_SCALE
}

fn default_token_scale() -> u8 {
    DEFAULT_TOKEN_SCALE
}

fn default_epoch_length() -> u64 {
    86_400
}

fn default_total_epochs() -> u64 {
    10
}

impl Default for EpochSettings {
    fn default() -> Self {
        Self {
            start_time: 0,
            epoch_length_secs: default_epoch_length(),
            total_epochs: default_total_epochs(),
            total_reserve_tokens: 0,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            point_scale: default_point_scale(),
            token_scale: default_token_scale(),
            schema: ViewSchema::V2,
            epoch: EpochSettings::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LedgerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Build the validated epoch schedule from these settings.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidConfig`] if the schedule parameters are invalid
    /// - [`LedgerError::Overflow`] if the reserve does not fit the token scale
    pub fn epoch_config(&self) -> Result<EpochConfig> {
        let total_reserve =
            Amount::from_units(u128::from(self.epoch.total_reserve_tokens), self.token_scale)
                .map_err(|_| {
                    LedgerError::InvalidConfig("total reserve overflows token scale".to_string())
                })?;
        let config = EpochConfig {
            start_time: self.epoch.start_time,
            epoch_length_secs: self.epoch.epoch_length_secs,
            total_epochs: self.epoch.total_epochs,
            total_reserve,
        };
        config.validate()?;
        Ok(config)
    }
}
