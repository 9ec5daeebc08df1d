//! # lumen-ledger
//!
//! Points-to-token reward distribution ledger.
//!
//! Users accumulate points which convert, at a time-varying rate, into a
//! fungible token that unlocks linearly over a sequence of epochs. The
//! ledger tracks the global unlock schedule, per-user point balances and
//! cumulative claims, and computes the system-wide conversion rate from
//! `(available_tokens, unclaimed_points)` fresh on every claim, so the
//! pool of unclaimed points is always exactly redeemable against the
//! pool of unlocked-but-undistributed tokens.
//!
//! ## Modules
//!
//! - [`epoch`] — epoch schedule and linear unlock curve
//! - [`unlock`] — global unlock/distribution counters
//! - [`account`] — per-user records and the unclaimed-points aggregate
//! - [`convert`] — floor-rounded points→tokens conversion
//! - [`custody`] — token custody and clock capability traits
//! - [`config`] — TOML-loadable ledger configuration
//! - [`ledger`] — the [`RewardLedger`] orchestrator
//! - [`migrate`] — versioned state snapshots and migration

pub mod account;
pub mod config;
pub mod convert;
pub mod custody;
pub mod epoch;
pub mod ledger;
pub mod migrate;
pub mod unlock;

pub use config::{LedgerConfig, ViewSchema};
pub use ledger::{RewardLedger, RewardSystemInfo, UserRewardInfo};

use lumen_types::{Amount, AmountError};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Mixed fixed-point scales in one operation.
    #[error("scale mismatch: expected {expected}, got {actual}")]
    ScaleMismatch {
        /// Scale the ledger expected.
        expected: u8,
        /// Scale the caller supplied.
        actual: u8,
    },

    /// Claim exceeds the caller's point balance (or is zero).
    #[error("insufficient points: requested {requested}, available {available}")]
    InsufficientPoints {
        /// Points requested.
        requested: Amount,
        /// Points held by the caller.
        available: Amount,
    },

    /// Safety net: a payout would exceed the unlocked reserve.
    ///
    /// Unreachable under correct conversion arithmetic; if it fires it
    /// indicates an accounting or rounding bug and is logged at error
    /// level by the ledger.
    #[error("insufficient unlocked reserve: requested {requested}, available {available}")]
    InsufficientUnlockedReserve {
        /// Tokens the claim would pay.
        requested: Amount,
        /// Tokens actually available.
        available: Amount,
    },

    /// External custody transfer failed; no state was changed.
    #[error("token transfer failed: {0}")]
    TransferFailed(String),

    /// Arithmetic overflow in ledger bookkeeping.
    #[error("arithmetic overflow")]
    Overflow,

    /// Invalid ledger configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot carries a version this build cannot restore.
    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshotVersion(u32),
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::ScaleMismatch { expected, actual } => {
                LedgerError::ScaleMismatch { expected, actual }
            }
            AmountError::Overflow => LedgerError::Overflow,
            AmountError::UnsupportedScale(s) => {
                LedgerError::InvalidConfig(format!("unsupported scale {s}"))
            }
        }
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
