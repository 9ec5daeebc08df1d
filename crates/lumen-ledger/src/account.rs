//! Per-user accounts and the unclaimed-points aggregate.
//!
//! [`UserBook`] owns the full user map. Records are created lazily on
//! first point credit (or first read) with zero defaults and are never
//! deleted. The book also maintains `unclaimed_points`, the sum of all
//! point balances, as a running aggregate updated on every credit and
//! debit, so claims never scan the map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lumen_types::{AccountId, Amount};

use crate::{LedgerError, Result};

/// Per-user point balance and lifetime claimed tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Outstanding claimable points (point scale).
    pub points: Amount,
    /// Lifetime tokens claimed (token scale), non-decreasing.
    pub total_claimed: Amount,
}

impl UserRecord {
    /// Zeroed record at the given scales.
    pub fn new(point_scale: u8, token_scale: u8) -> Self {
        Self {
            points: Amount::zero(point_scale),
            total_claimed: Amount::zero(token_scale),
        }
    }
}

/// The full user map plus the running unclaimed-points aggregate.
#[derive(Debug, Clone)]
pub struct UserBook {
    point_scale: u8,
    token_scale: u8,
    users: HashMap<AccountId, UserRecord>,
    unclaimed_points: Amount,
}

impl UserBook {
    /// Empty book at the given scales.
    pub fn new(point_scale: u8, token_scale: u8) -> Self {
        Self {
            point_scale,
            token_scale,
            users: HashMap::new(),
            unclaimed_points: Amount::zero(point_scale),
        }
    }

    /// Sum of all outstanding point balances.
    pub fn unclaimed_points(&self) -> Amount {
        self.unclaimed_points
    }

    /// The user's record, or a zeroed default if none exists yet.
    pub fn record(&self, user: &AccountId) -> UserRecord {
        self.users
            .get(user)
            .cloned()
            .unwrap_or_else(|| UserRecord::new(self.point_scale, self.token_scale))
    }

    /// Credit points to a user, creating the record lazily.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ScaleMismatch`] if `points` is not point-scale
    /// - [`LedgerError::Overflow`] on balance or aggregate overflow
    pub fn credit_points(&mut self, user: AccountId, points: Amount) -> Result<()> {
        // Update the aggregate first; it also validates the scale.
        let aggregate = self.unclaimed_points.checked_add(&points)?;
        let record = self
            .users
            .entry(user)
            .or_insert_with(|| UserRecord::new(self.point_scale, self.token_scale));
        record.points = record.points.checked_add(&points)?;
        self.unclaimed_points = aggregate;
        Ok(())
    }

    /// Debit points from a user and from the aggregate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientPoints`] if `points` is zero or exceeds
    ///   the user's balance
    /// - [`LedgerError::ScaleMismatch`] if `points` is not point-scale
    pub fn debit_points(&mut self, user: &AccountId, points: Amount) -> Result<()> {
        let record = self.record(user);
        points.ensure_same_scale(&record.points)?;
        if points.is_zero() || points.raw() > record.points.raw() {
            return Err(LedgerError::InsufficientPoints {
                requested: points,
                available: record.points,
            });
        }
        let aggregate = self.unclaimed_points.checked_sub(&points)?;
        if let Some(record) = self.users.get_mut(user) {
            record.points = record.points.checked_sub(&points)?;
        }
        self.unclaimed_points = aggregate;
        Ok(())
    }

    /// Add claimed tokens to the user's lifetime counter.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ScaleMismatch`] if `tokens` is not token-scale
    /// - [`LedgerError::Overflow`] on counter overflow
    pub fn record_claim(&mut self, user: AccountId, tokens: Amount) -> Result<()> {
        let record = self
            .users
            .entry(user)
            .or_insert_with(|| UserRecord::new(self.point_scale, self.token_scale));
        record.total_claimed = record.total_claimed.checked_add(&tokens)?;
        Ok(())
    }

    /// Put back a previously captured record and aggregate, used to roll
    /// back a claim whose outbound transfer failed.
    pub fn restore(&mut self, user: AccountId, record: UserRecord, unclaimed: Amount) {
        self.users.insert(user, record);
        self.unclaimed_points = unclaimed;
    }

    /// Iterate all records (for snapshots).
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &UserRecord)> {
        self.users.iter()
    }
}
