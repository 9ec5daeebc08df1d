//! The reward ledger orchestrator.
//!
//! [`RewardLedger`] composes the epoch schedule, unlock counters, user
//! book, and conversion math behind a single exclusive lock. Every
//! state-mutating call (`contribute`, `award_points`, `claim`) holds the
//! lock for its entire read-refresh-validate-mutate-transfer sequence,
//! so there is no interleaving of two in-flight mutations and no torn
//! reads. An in-progress claim either fully commits or fully fails: the
//! outbound token transfer is performed last, and a failed transfer
//! rolls the bookkeeping back before the error is returned.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use lumen_types::{AccountId, Amount, MAX_SCALE};

use crate::account::UserBook;
use crate::config::{LedgerConfig, ViewSchema};
use crate::convert;
use crate::custody::{Clock, TokenCustody};
use crate::epoch::{self, EpochConfig};
use crate::migrate::{self, LedgerSnapshot, UserEntry, SNAPSHOT_VERSION};
use crate::unlock::UnlockState;
use crate::{LedgerError, Result};

/// Per-user read view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRewardInfo {
    /// Outstanding claimable points.
    pub points: Amount,
    /// Tokens a full claim would pay at the current rate.
    pub estimated_reward: Amount,
    /// Lifetime claimed tokens.
    pub total_claimed: Amount,
}

/// System-wide read view.
///
/// The optional fields are populated under [`ViewSchema::V2`] only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSystemInfo {
    /// Current epoch index.
    pub epoch: u64,
    /// Schedule start time (unix seconds).
    pub start_time: u64,
    /// Total reserve released by the schedule.
    pub total_unlockable: Amount,
    /// Tokens unlocked so far (refreshed as of this call).
    pub unlocked_tokens: Amount,
    /// Tokens distributed so far.
    pub distributed_tokens: Amount,
    /// Tokens unlocked but not yet distributed.
    pub available_tokens: Amount,
    /// Sum of all outstanding points.
    pub unclaimed_points: Amount,
    /// Tokens per whole point at the current pool state.
    pub token_per_point: Amount,
    /// Lifetime distributed counter, under its version-2 wire name
    /// (schema V2; equal to `distributed_tokens`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distributed: Option<Amount>,
    /// Points per whole token (schema V2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_per_token: Option<Amount>,
    /// Tokens held in ledger custody (schema V2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_balance: Option<Amount>,
}

struct Inner {
    point_scale: u8,
    token_scale: u8,
    schema: ViewSchema,
    epoch: EpochConfig,
    unlock: UnlockState,
    book: UserBook,
    custody: Box<dyn TokenCustody + Send>,
    clock: Box<dyn Clock + Send>,
}

impl Inner {
    /// Ratchet the persisted unlock counter to the schedule's value at
    /// `clock.now()`. Called at the start of every mutation.
    fn refresh_unlock(&mut self) -> Result<()> {
        let unlockable = epoch::unlockable_by_now(self.clock.now(), &self.epoch)?;
        self.unlock.refresh(unlockable)
    }

    /// The unlocked amount as of `clock.now()` without persisting it
    /// (used by the read views, which must not be staler than now).
    fn effective_unlocked(&self) -> Result<Amount> {
        let unlockable = epoch::unlockable_by_now(self.clock.now(), &self.epoch)?;
        let capped = unlockable.try_min(&self.unlock.total_contributed)?;
        Ok(self.unlock.total_unlocked.try_max(&capped)?)
    }

    fn ensure_token_scale(&self, amount: &Amount) -> Result<()> {
        if amount.scale() != self.token_scale {
            return Err(LedgerError::ScaleMismatch {
                expected: self.token_scale,
                actual: amount.scale(),
            });
        }
        Ok(())
    }

    fn ensure_point_scale(&self, amount: &Amount) -> Result<()> {
        if amount.scale() != self.point_scale {
            return Err(LedgerError::ScaleMismatch {
                expected: self.point_scale,
                actual: amount.scale(),
            });
        }
        Ok(())
    }
}

/// Points-to-token reward distribution ledger.
///
/// One instance owns its [`UnlockState`] and user map exclusively;
/// collaborators (token custody, clock) are injected at construction
/// and never discovered dynamically.
pub struct RewardLedger {
    inner: Mutex<Inner>,
}

// Manual impl: the boxed custody and clock are not Debug.
impl fmt::Debug for RewardLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RewardLedger");
        match self.inner.try_lock() {
            Ok(inner) => s
                .field("point_scale", &inner.point_scale)
                .field("token_scale", &inner.token_scale)
                .field("unlock", &inner.unlock)
                .finish_non_exhaustive(),
            Err(_) => s.field("inner", &"<locked>").finish(),
        }
    }
}

impl RewardLedger {
    /// Create a fresh ledger with all-zero counters.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidConfig`] if the scales or epoch schedule
    ///   are invalid
    pub fn new(
        config: &LedgerConfig,
        custody: Box<dyn TokenCustody + Send>,
        clock: Box<dyn Clock + Send>,
    ) -> Result<Self> {
        if config.point_scale > MAX_SCALE || config.token_scale > MAX_SCALE {
            return Err(LedgerError::InvalidConfig(format!(
                "scales must not exceed {MAX_SCALE}"
            )));
        }
        let epoch = config.epoch_config()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                point_scale: config.point_scale,
                token_scale: config.token_scale,
                schema: config.schema,
                epoch,
                unlock: UnlockState::new(config.token_scale),
                book: UserBook::new(config.point_scale, config.token_scale),
                custody,
                clock,
            }),
        })
    }

    /// Restore a ledger from a snapshot, upgrading old versions.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnsupportedSnapshotVersion`] for unknown versions
    /// - [`LedgerError::InvalidConfig`] if the snapshot's scales disagree
    ///   with the configuration or its counters violate ledger invariants
    pub fn restore(
        config: &LedgerConfig,
        snapshot: LedgerSnapshot,
        custody: Box<dyn TokenCustody + Send>,
        clock: Box<dyn Clock + Send>,
    ) -> Result<Self> {
        let snapshot = migrate::upgrade(snapshot)?;
        if snapshot.point_scale != config.point_scale
            || snapshot.token_scale != config.token_scale
        {
            return Err(LedgerError::InvalidConfig(format!(
                "snapshot scales {}/{} disagree with configured {}/{}",
                snapshot.point_scale,
                snapshot.token_scale,
                config.point_scale,
                config.token_scale
            )));
        }

        let ledger = Self::new(config, custody, clock)?;
        {
            let mut inner = ledger.lock_inner();
            inner.unlock = UnlockState {
                total_contributed: Amount::from_raw(snapshot.total_contributed, config.token_scale),
                total_unlocked: Amount::from_raw(snapshot.total_unlocked, config.token_scale),
                total_distributed: Amount::from_raw(
                    snapshot.total_distributed.unwrap_or_default(),
                    config.token_scale,
                ),
            };
            if snapshot.total_distributed.unwrap_or_default() > snapshot.total_unlocked
                || snapshot.total_unlocked > snapshot.total_contributed
            {
                return Err(LedgerError::InvalidConfig(
                    "snapshot counters violate ledger invariants".to_string(),
                ));
            }
            for entry in &snapshot.users {
                inner.book.credit_points(
                    entry.account,
                    Amount::from_raw(entry.points, config.point_scale),
                )?;
                inner.book.record_claim(
                    entry.account,
                    Amount::from_raw(entry.total_claimed, config.token_scale),
                )?;
            }
        }
        Ok(ledger)
    }

    /// Serialize the current state as a version-2 snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.lock_inner();
        let mut users: Vec<UserEntry> = inner
            .book
            .iter()
            .map(|(account, record)| UserEntry {
                account: *account,
                points: record.points.raw(),
                total_claimed: record.total_claimed.raw(),
            })
            .collect();
        users.sort_by_key(|entry| entry.account);
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            point_scale: inner.point_scale,
            token_scale: inner.token_scale,
            total_contributed: inner.unlock.total_contributed.raw(),
            total_unlocked: inner.unlock.total_unlocked.raw(),
            total_distributed: Some(inner.unlock.total_distributed.raw()),
            users,
        }
    }

    /// Decimal scale of point values.
    pub fn point_scale(&self) -> u8 {
        self.lock_inner().point_scale
    }

    /// Decimal scale of token values.
    pub fn token_scale(&self) -> u8 {
        self.lock_inner().token_scale
    }

    /// Fund the reserve: transfer `amount` from `from` into custody and
    /// record it. Transfer-then-record: the counters are only touched
    /// after the transfer has been confirmed, so a failed transfer
    /// leaves the ledger unmodified.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ScaleMismatch`] if `amount` is not token-scale
    /// - [`LedgerError::TransferFailed`] if custody rejects the transfer
    pub fn contribute(&self, from: &AccountId, amount: Amount) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.ensure_token_scale(&amount)?;
        inner.refresh_unlock()?;

        inner
            .custody
            .transfer_in(from, amount)
            .map_err(|e| LedgerError::TransferFailed(e.to_string()))?;

        inner.unlock.record_contribution(amount)?;
        // Newly funded tokens may already be unlockable.
        inner.refresh_unlock()?;

        tracing::info!(
            amount = %amount,
            total_contributed = %inner.unlock.total_contributed,
            "contribution recorded"
        );
        Ok(())
    }

    /// Credit points to a user (privileged; authorization is the
    /// embedding application's concern).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ScaleMismatch`] if `points` is not point-scale
    /// - [`LedgerError::Overflow`] on balance overflow
    pub fn award_points(&self, user: &AccountId, points: Amount) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.ensure_point_scale(&points)?;
        inner.refresh_unlock()?;
        inner.book.credit_points(*user, points)?;

        tracing::info!(
            points = %points,
            unclaimed = %inner.book.unclaimed_points(),
            "points awarded"
        );
        Ok(())
    }

    /// Convert `points` of the caller's balance into tokens at the
    /// current rate and pay them out. Returns the tokens paid.
    ///
    /// The rate is computed fresh from the pre-debit pool state, so
    /// every claim changes the rate seen by subsequent claimers while
    /// keeping the pool exactly solvent.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientPoints`] if `points` is zero or
    ///   exceeds the caller's balance
    /// - [`LedgerError::InsufficientUnlockedReserve`] if the payout would
    ///   exceed the unlocked reserve (safety net; indicates an
    ///   accounting bug)
    /// - [`LedgerError::TransferFailed`] if the outbound transfer fails
    ///   (all bookkeeping is rolled back)
    pub fn claim(&self, caller: &AccountId, points: Amount) -> Result<Amount> {
        let mut inner = self.lock_inner();
        inner.ensure_point_scale(&points)?;
        inner.refresh_unlock()?;

        let record = inner.book.record(caller);
        if points.is_zero() || points.raw() > record.points.raw() {
            tracing::warn!(
                requested = %points,
                available = %record.points,
                "claim rejected: insufficient points"
            );
            return Err(LedgerError::InsufficientPoints {
                requested: points,
                available: record.points,
            });
        }

        // Quote against the pre-debit aggregates.
        let available = inner.unlock.available_tokens()?;
        let unclaimed = inner.book.unclaimed_points();
        let tokens = convert::quote_tokens_for_points(&points, &available, &unclaimed)?;

        // Final safety net; unreachable under correct conversion math.
        let distributed_after = inner.unlock.total_distributed.checked_add(&tokens)?;
        if distributed_after.raw() > inner.unlock.total_unlocked.raw() {
            tracing::error!(
                tokens = %tokens,
                available = %available,
                "claim would exceed unlocked reserve; accounting bug suspected"
            );
            return Err(LedgerError::InsufficientUnlockedReserve {
                requested: tokens,
                available,
            });
        }

        // Debit and credit, keeping the pre-claim state for rollback.
        let saved_record = record.clone();
        let saved_unclaimed = unclaimed;
        let saved_unlock = inner.unlock.clone();

        inner.book.debit_points(caller, points)?;
        inner.book.record_claim(*caller, tokens)?;
        inner.unlock.record_distribution(tokens)?;

        // Transfer last: a failed transfer rolls back the bookkeeping.
        if let Err(e) = inner.custody.transfer_out(caller, tokens) {
            inner.book.restore(*caller, saved_record, saved_unclaimed);
            inner.unlock = saved_unlock;
            tracing::warn!(error = %e, "claim transfer failed; state rolled back");
            return Err(LedgerError::TransferFailed(e.to_string()));
        }

        tracing::info!(
            points = %points,
            tokens = %tokens,
            total_distributed = %inner.unlock.total_distributed,
            "claim processed"
        );
        Ok(tokens)
    }

    /// Per-user view: points, estimated reward at the current rate, and
    /// lifetime claimed tokens. Pure read; does not mutate state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn get_user_reward_info(&self, user: &AccountId) -> Result<UserRewardInfo> {
        let inner = self.lock_inner();
        let record = inner.book.record(user);
        let available = inner
            .effective_unlocked()?
            .checked_sub(&inner.unlock.total_distributed)?;
        let estimated_reward = convert::quote_tokens_for_points(
            &record.points,
            &available,
            &inner.book.unclaimed_points(),
        )?;
        Ok(UserRewardInfo {
            points: record.points,
            estimated_reward,
            total_claimed: record.total_claimed,
        })
    }

    /// System-wide view, reflecting the unlock amount as of now. Pure
    /// read; two calls with no intervening mutation return identical
    /// results.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn get_reward_system_info(&self) -> Result<RewardSystemInfo> {
        let inner = self.lock_inner();
        let now = inner.clock.now();
        let unlocked = inner.effective_unlocked()?;
        let available = unlocked.checked_sub(&inner.unlock.total_distributed)?;
        let unclaimed = inner.book.unclaimed_points();

        let (total_distributed, points_per_token, ledger_balance) = match inner.schema {
            ViewSchema::V1 => (None, None, None),
            ViewSchema::V2 => (
                Some(inner.unlock.total_distributed),
                Some(convert::points_per_token(&available, &unclaimed)?),
                Some(inner.custody.balance()),
            ),
        };

        Ok(RewardSystemInfo {
            epoch: epoch::epoch_index(now, &inner.epoch),
            start_time: inner.epoch.start_time,
            total_unlockable: inner.epoch.total_reserve,
            unlocked_tokens: unlocked,
            distributed_tokens: inner.unlock.total_distributed,
            available_tokens: available,
            unclaimed_points: unclaimed,
            token_per_point: convert::token_per_point(&available, &unclaimed)?,
            total_distributed,
            points_per_token,
            ledger_balance,
        })
    }

    /// Lock the ledger state, tolerating a poisoned mutex (state is
    /// only mutated under invariant-checked operations).
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
