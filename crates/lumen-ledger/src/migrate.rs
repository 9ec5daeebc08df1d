//! Versioned ledger snapshots.
//!
//! The ledger's persistent form is a plain serialized snapshot with an
//! explicit version number, decoupled from any deployment or upgrade
//! mechanism. Version 1 snapshots predate the explicit
//! `total_distributed` counter; [`upgrade`] derives it from the per-user
//! claim totals. Raw values are stored unscaled alongside the two scale
//! tags, so a snapshot is self-describing.

use serde::{Deserialize, Serialize};

use lumen_types::AccountId;

use crate::{LedgerError, Result};

/// Snapshot version written by this build.
pub const SNAPSHOT_VERSION: u32 = 2;

/// One user's row in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Account identifier.
    pub account: AccountId,
    /// Raw point balance (point scale).
    pub points: u128,
    /// Raw lifetime claimed tokens (token scale).
    pub total_claimed: u128,
}

/// Serialized ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Decimal scale of point values.
    pub point_scale: u8,
    /// Decimal scale of token values.
    pub token_scale: u8,
    /// Raw lifetime contributed tokens.
    pub total_contributed: u128,
    /// Raw lifetime unlocked tokens.
    pub total_unlocked: u128,
    /// Raw lifetime distributed tokens. Absent in version 1.
    #[serde(default)]
    pub total_distributed: Option<u128>,
    /// All user records.
    pub users: Vec<UserEntry>,
}

/// Upgrade a snapshot to the current version.
///
/// - Version 1: `total_distributed` was never stored; it is derived as
///   the sum of all user `total_claimed` values (every distributed token
///   was claimed by some user).
/// - Version 2: passed through, requiring the counter to be present.
///
/// # Errors
///
/// - [`LedgerError::UnsupportedSnapshotVersion`] for unknown versions
/// - [`LedgerError::Overflow`] if the derived counter overflows
/// - [`LedgerError::InvalidConfig`] if a version-2 snapshot lacks the counter
pub fn upgrade(mut snapshot: LedgerSnapshot) -> Result<LedgerSnapshot> {
    match snapshot.version {
        1 => {
            let mut distributed: u128 = 0;
            for user in &snapshot.users {
                distributed = distributed
                    .checked_add(user.total_claimed)
                    .ok_or(LedgerError::Overflow)?;
            }
            snapshot.total_distributed = Some(distributed);
            snapshot.version = SNAPSHOT_VERSION;
            tracing::info!(distributed, "upgraded v1 snapshot");
            Ok(snapshot)
        }
        SNAPSHOT_VERSION => {
            if snapshot.total_distributed.is_none() {
                return Err(LedgerError::InvalidConfig(
                    "version 2 snapshot missing total_distributed".to_string(),
                ));
            }
            Ok(snapshot)
        }
        version => Err(LedgerError::UnsupportedSnapshotVersion(version)),
    }
}
