//! Token custody and clock capabilities.
//!
//! The ledger never discovers its collaborators dynamically: it depends
//! on a [`TokenCustody`] capability for moving the underlying token in
//! and out of ledger custody, and a [`Clock`] capability for wall-clock
//! time, both injected at construction. [`InMemoryCustody`] is a
//! complete in-process implementation for embedding and tests;
//! [`SystemClock`] and [`ManualClock`] cover production and
//! deterministic time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lumen_types::{AccountId, Amount};

/// Error type for custody transfers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    /// The source account has not approved or does not hold the amount.
    #[error("insufficient allowance or balance")]
    InsufficientAllowance,

    /// Ledger custody does not hold the amount being paid out.
    #[error("insufficient custody balance")]
    InsufficientBalance,

    /// The transfer was rejected by the token backend.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Atomic custody operations over the underlying token.
///
/// Both transfers either fully succeed or leave balances untouched; the
/// ledger records amounts only after `transfer_in` has succeeded and
/// performs `transfer_out` last, after all internal bookkeeping.
pub trait TokenCustody {
    /// Move `amount` from `from` into ledger custody.
    fn transfer_in(&mut self, from: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Move `amount` from ledger custody to `to`.
    fn transfer_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), CustodyError>;

    /// Tokens currently held in ledger custody.
    fn balance(&self) -> Amount;
}

/// Wall-clock time source.
pub trait Clock {
    /// Current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Share it with the ledger through an `Arc` and move time forward with
/// [`ManualClock::set`] or [`ManualClock::advance`].
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    /// Clock frozen at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    /// Advance by `secs` seconds.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

/// In-process token custody backed by a balance map.
#[derive(Debug, Clone)]
pub struct InMemoryCustody {
    token_scale: u8,
    accounts: HashMap<AccountId, u128>,
    ledger_balance: u128,
}

impl InMemoryCustody {
    /// Empty custody at the given token scale.
    pub fn new(token_scale: u8) -> Self {
        Self {
            token_scale,
            accounts: HashMap::new(),
            ledger_balance: 0,
        }
    }

    /// Mint tokens into an external account (test/bootstrap helper).
    pub fn mint(&mut self, account: AccountId, amount: Amount) {
        let balance = self.accounts.entry(account).or_default();
        *balance = balance.saturating_add(amount.raw());
    }

    /// Balance of an external account.
    pub fn account_balance(&self, account: &AccountId) -> Amount {
        Amount::from_raw(
            self.accounts.get(account).copied().unwrap_or(0),
            self.token_scale,
        )
    }
}

impl TokenCustody for InMemoryCustody {
    fn transfer_in(&mut self, from: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        if amount.scale() != self.token_scale {
            return Err(CustodyError::Rejected(format!(
                "scale {} does not match token scale {}",
                amount.scale(),
                self.token_scale
            )));
        }
        let balance = self.accounts.get(from).copied().unwrap_or(0);
        if balance < amount.raw() {
            return Err(CustodyError::InsufficientAllowance);
        }
        self.accounts.insert(*from, balance - amount.raw());
        self.ledger_balance = self.ledger_balance.saturating_add(amount.raw());
        Ok(())
    }

    fn transfer_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        if amount.scale() != self.token_scale {
            return Err(CustodyError::Rejected(format!(
                "scale {} does not match token scale {}",
                amount.scale(),
                self.token_scale
            )));
        }
        if self.ledger_balance < amount.raw() {
            return Err(CustodyError::InsufficientBalance);
        }
        self.ledger_balance -= amount.raw();
        let balance = self.accounts.entry(*to).or_default();
        *balance = balance.saturating_add(amount.raw());
        Ok(())
    }

    fn balance(&self) -> Amount {
        Amount::from_raw(self.ledger_balance, self.token_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: AccountId = [0x01; 32];

    fn tokens(units: u128) -> Amount {
        Amount::from_units(units, 18).expect("amount")
    }

    #[test]
    fn test_transfer_in_and_out() {
        let mut custody = InMemoryCustody::new(18);
        custody.mint(ALICE, tokens(100));

        custody.transfer_in(&ALICE, tokens(60)).expect("in");
        assert_eq!(custody.balance(), tokens(60));
        assert_eq!(custody.account_balance(&ALICE), tokens(40));

        custody.transfer_out(&ALICE, tokens(25)).expect("out");
        assert_eq!(custody.balance(), tokens(35));
        assert_eq!(custody.account_balance(&ALICE), tokens(65));
    }

    #[test]
    fn test_transfer_in_insufficient() {
        let mut custody = InMemoryCustody::new(18);
        custody.mint(ALICE, tokens(10));

        let err = custody.transfer_in(&ALICE, tokens(11)).expect_err("over");
        assert_eq!(err, CustodyError::InsufficientAllowance);
        assert_eq!(custody.account_balance(&ALICE), tokens(10));
        assert!(custody.balance().is_zero());
    }

    #[test]
    fn test_transfer_out_insufficient() {
        let mut custody = InMemoryCustody::new(18);
        let err = custody.transfer_out(&ALICE, tokens(1)).expect_err("empty");
        assert_eq!(err, CustodyError::InsufficientBalance);
    }

    #[test]
    fn test_wrong_scale_rejected() {
        let mut custody = InMemoryCustody::new(18);
        custody.mint(ALICE, tokens(10));
        let wrong = Amount::from_units(1, 6).expect("amount");
        assert!(custody.transfer_in(&ALICE, wrong).is_err());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now(), 1_500);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(ManualClock::new(7));
        let shared: Arc<ManualClock> = Arc::clone(&clock);
        assert_eq!(Clock::now(&shared), 7);
        clock.advance(3);
        assert_eq!(Clock::now(&shared), 10);
    }
}
