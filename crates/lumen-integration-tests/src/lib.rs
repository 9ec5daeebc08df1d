//! Shared helpers for the ledger integration tests.

use lumen_ledger::custody::{CustodyError, TokenCustody};
use lumen_types::{AccountId, Amount};

/// Install a test subscriber once; repeat calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Custody double whose outbound transfers always fail, for exercising
/// the claim rollback path. Inbound transfers succeed so a ledger can
/// still be funded through it.
#[derive(Debug, Default)]
pub struct FailingCustody {
    token_scale: u8,
    ledger_balance: u128,
}

impl FailingCustody {
    /// Custody at the given token scale.
    pub fn new(token_scale: u8) -> Self {
        Self {
            token_scale,
            ledger_balance: 0,
        }
    }
}

impl TokenCustody for FailingCustody {
    fn transfer_in(&mut self, _from: &AccountId, amount: Amount) -> Result<(), CustodyError> {
        self.ledger_balance = self.ledger_balance.saturating_add(amount.raw());
        Ok(())
    }

    fn transfer_out(&mut self, _to: &AccountId, _amount: Amount) -> Result<(), CustodyError> {
        Err(CustodyError::Rejected("backend offline".to_string()))
    }

    fn balance(&self) -> Amount {
        Amount::from_raw(self.ledger_balance, self.token_scale)
    }
}
