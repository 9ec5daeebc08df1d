//! # lumen-types
//!
//! Shared domain types for the Lumen reward ledger workspace.
//! All token and point quantities are fixed-point integers ([`Amount`])
//! carrying an explicit decimal-scale tag; the deployed scales are part
//! of ledger configuration, not compile-time constants.

pub mod amount;

pub use amount::{Amount, AmountError};

/// Account identifier (address hash).
pub type AccountId = [u8; 32];

/// Default decimal scale for user points (6 decimals).
pub const DEFAULT_POINT_SCALE: u8 = 6;

/// Default decimal scale for the reward token (18 decimals).
pub const DEFAULT_TOKEN_SCALE: u8 = 18;

/// Largest decimal scale representable in a `u128` raw value (10^38).
pub const MAX_SCALE: u8 = 38;
