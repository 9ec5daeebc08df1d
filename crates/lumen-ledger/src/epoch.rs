//! Epoch schedule and unlock curve.
//!
//! The total reserve unlocks piecewise-linearly and continuously over
//! `total_epochs` epochs of `epoch_length_secs` each, starting at
//! `start_time`. Both functions here are pure: the ledger calls
//! [`unlockable_by_now`] at the start of every state-mutating operation
//! and ratchets its unlocked counter up to the result, never down.

use serde::{Deserialize, Serialize};

use lumen_types::Amount;

use crate::convert::mul_div_floor;
use crate::{LedgerError, Result};

/// Immutable epoch schedule parameters, fixed at ledger initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Unix timestamp (seconds) at which the schedule starts.
    pub start_time: u64,
    /// Length of one epoch in seconds.
    pub epoch_length_secs: u64,
    /// Number of epochs over which the reserve unlocks.
    pub total_epochs: u64,
    /// Total token reserve released by the schedule (token scale).
    pub total_reserve: Amount,
}

impl EpochConfig {
    /// Validate the schedule parameters.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidConfig`] if the epoch length or count is zero,
    ///   or the total duration overflows
    pub fn validate(&self) -> Result<()> {
        if self.epoch_length_secs == 0 {
            return Err(LedgerError::InvalidConfig(
                "epoch length must be positive".to_string(),
            ));
        }
        if self.total_epochs == 0 {
            return Err(LedgerError::InvalidConfig(
                "epoch count must be positive".to_string(),
            ));
        }
        if self.epoch_length_secs.checked_mul(self.total_epochs).is_none() {
            return Err(LedgerError::InvalidConfig(
                "schedule duration overflows".to_string(),
            ));
        }
        Ok(())
    }

    /// Total schedule duration in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.epoch_length_secs.saturating_mul(self.total_epochs)
    }
}

/// Current epoch index at time `now`.
///
/// Clamped to 0 before `start_time` and to `total_epochs - 1` after the
/// schedule ends.
pub fn epoch_index(now: u64, config: &EpochConfig) -> u64 {
    let elapsed = now.saturating_sub(config.start_time);
    let index = elapsed / config.epoch_length_secs.max(1);
    index.min(config.total_epochs.saturating_sub(1))
}

/// Cumulative tokens that should be unlocked by time `now`.
///
/// Linear in elapsed time, floor-rounded, capped at the total reserve:
/// `total_reserve * min(1, elapsed / (epoch_length * total_epochs))`.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn unlockable_by_now(now: u64, config: &EpochConfig) -> Result<Amount> {
    let elapsed = now.saturating_sub(config.start_time);
    let duration = config.duration_secs();
    if elapsed >= duration {
        return Ok(config.total_reserve);
    }
    let raw = mul_div_floor(
        config.total_reserve.raw(),
        u128::from(elapsed),
        u128::from(duration),
    )?;
    Ok(Amount::from_raw(raw, config.total_reserve.scale()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn ten_day_config(start_time: u64) -> EpochConfig {
        EpochConfig {
            start_time,
            epoch_length_secs: DAY,
            total_epochs: 10,
            total_reserve: Amount::from_units(1_000_000, 18).expect("reserve"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_length() {
        let mut config = ten_day_config(0);
        config.epoch_length_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_epochs() {
        let mut config = ten_day_config(0);
        config.total_epochs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_epoch_index_before_start() {
        let config = ten_day_config(1_000_000);
        assert_eq!(epoch_index(0, &config), 0);
        assert_eq!(epoch_index(999_999, &config), 0);
    }

    #[test]
    fn test_epoch_index_progression() {
        let config = ten_day_config(1_000_000);
        assert_eq!(epoch_index(1_000_000, &config), 0);
        assert_eq!(epoch_index(1_000_000 + DAY - 1, &config), 0);
        assert_eq!(epoch_index(1_000_000 + DAY, &config), 1);
        assert_eq!(epoch_index(1_000_000 + 5 * DAY, &config), 5);
    }

    #[test]
    fn test_epoch_index_clamped_to_last() {
        let config = ten_day_config(1_000_000);
        assert_eq!(epoch_index(1_000_000 + 10 * DAY, &config), 9);
        assert_eq!(epoch_index(u64::MAX, &config), 9);
    }

    #[test]
    fn test_unlock_linear_schedule() {
        // 1,000,000 tokens over 10 one-day epochs: zero at start,
        // half at day 5, all at day 10.
        let config = ten_day_config(1_000_000);

        let at_start = unlockable_by_now(1_000_000, &config).expect("unlock");
        assert!(at_start.is_zero());

        let at_day_5 = unlockable_by_now(1_000_000 + 5 * DAY, &config).expect("unlock");
        assert_eq!(at_day_5, Amount::from_units(500_000, 18).expect("half"));

        let at_day_10 = unlockable_by_now(1_000_000 + 10 * DAY, &config).expect("unlock");
        assert_eq!(at_day_10, config.total_reserve);
    }

    #[test]
    fn test_unlock_before_start_is_zero() {
        let config = ten_day_config(1_000_000);
        let unlocked = unlockable_by_now(500, &config).expect("unlock");
        assert!(unlocked.is_zero());
    }

    #[test]
    fn test_unlock_capped_after_end() {
        let config = ten_day_config(1_000_000);
        let unlocked = unlockable_by_now(u64::MAX, &config).expect("unlock");
        assert_eq!(unlocked, config.total_reserve);
    }

    #[test]
    fn test_unlock_is_monotone() {
        let config = ten_day_config(0);
        let mut last = Amount::zero(18);
        for hour in 0..(10 * 24 + 5) {
            let unlocked = unlockable_by_now(hour * 3600, &config).expect("unlock");
            assert!(unlocked.try_cmp(&last).expect("cmp").is_ge());
            last = unlocked;
        }
    }
}
