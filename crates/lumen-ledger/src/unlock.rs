//! Global unlock and distribution counters.
//!
//! [`UnlockState`] carries the three lifetime counters of the ledger:
//! tokens contributed into custody, tokens unlocked by the schedule, and
//! tokens paid out to claimers. All three are monotonically
//! non-decreasing, and `total_distributed <= total_unlocked <=
//! total_contributed` holds after every operation.

use serde::{Deserialize, Serialize};

use lumen_types::Amount;

use crate::Result;

/// Lifetime unlock/distribution counters (token scale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockState {
    /// Tokens transferred into ledger custody.
    pub total_contributed: Amount,
    /// Tokens released by the epoch schedule (capped by funding).
    pub total_unlocked: Amount,
    /// Tokens paid out to claimers.
    pub total_distributed: Amount,
}

impl UnlockState {
    /// All-zero counters at the given token scale.
    pub fn new(token_scale: u8) -> Self {
        Self {
            total_contributed: Amount::zero(token_scale),
            total_unlocked: Amount::zero(token_scale),
            total_distributed: Amount::zero(token_scale),
        }
    }

    /// Ratchet the unlocked counter up to the schedule's current value.
    ///
    /// The effective unlock is `min(unlockable, total_contributed)` —
    /// tokens that were never funded cannot unlock — and the counter
    /// never decreases.
    ///
    /// # Errors
    ///
    /// - [`crate::LedgerError::ScaleMismatch`] if `unlockable` is not token-scale
    pub fn refresh(&mut self, unlockable: Amount) -> Result<()> {
        let capped = unlockable.try_min(&self.total_contributed)?;
        let refreshed = self.total_unlocked.try_max(&capped)?;
        if refreshed != self.total_unlocked {
            tracing::trace!(
                unlocked = %refreshed,
                previous = %self.total_unlocked,
                "unlock counter refreshed"
            );
            self.total_unlocked = refreshed;
        }
        Ok(())
    }

    /// Record a confirmed contribution.
    ///
    /// # Errors
    ///
    /// - [`crate::LedgerError::ScaleMismatch`] if `amount` is not token-scale
    /// - [`crate::LedgerError::Overflow`] on counter overflow
    pub fn record_contribution(&mut self, amount: Amount) -> Result<()> {
        self.total_contributed = self.total_contributed.checked_add(&amount)?;
        Ok(())
    }

    /// Record a distribution of claimed tokens.
    ///
    /// # Errors
    ///
    /// - [`crate::LedgerError::ScaleMismatch`] if `tokens` is not token-scale
    /// - [`crate::LedgerError::Overflow`] on counter overflow
    pub fn record_distribution(&mut self, tokens: Amount) -> Result<()> {
        self.total_distributed = self.total_distributed.checked_add(&tokens)?;
        Ok(())
    }

    /// Tokens unlocked but not yet distributed.
    ///
    /// # Errors
    ///
    /// - [`crate::LedgerError::Overflow`] if the distributed counter exceeds
    ///   the unlocked counter (an invariant violation)
    pub fn available_tokens(&self) -> Result<Amount> {
        Ok(self.total_unlocked.checked_sub(&self.total_distributed)?)
    }
}
