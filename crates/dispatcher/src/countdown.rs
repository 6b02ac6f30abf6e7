//! Countdown - blocking outstanding-work counter
//!
//! Backed by a `tokio::sync::watch` channel so waiters are woken on every
//! change and a waiter that arrives after the count hit zero returns at once.

use tokio::sync::watch;
use tracing::error;

use contracts::ContractError;

/// Watched state: outstanding units and units completed beyond expectation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    outstanding: u64,
    excess: u64,
}

/// Outstanding unit counter with an awaitable zero
#[derive(Debug)]
pub struct Countdown {
    /// Category name (used for logging/errors)
    category: &'static str,
    tx: watch::Sender<Tally>,
}

impl Countdown {
    pub fn new(category: &'static str) -> Self {
        let (tx, _rx) = watch::channel(Tally::default());
        Self { category, tx }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Expect `n` more units of work
    pub fn add(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.tx.send_modify(|tally| tally.outstanding += n);
    }

    /// Mark `n` units as completed in a single step.
    ///
    /// Completing more than is outstanding saturates at zero and records
    /// the excess, which stays visible to every later `wait`.
    pub fn done(&self, n: u64) -> Result<(), ContractError> {
        if n == 0 {
            return Ok(());
        }

        let mut excess = 0;
        self.tx.send_modify(|tally| {
            excess = n.saturating_sub(tally.outstanding);
            tally.outstanding = tally.outstanding.saturating_sub(n);
            tally.excess += excess;
        });

        if excess > 0 {
            error!(
                category = self.category,
                excess, "Completed more work than expected"
            );
            return Err(ContractError::counter_underflow(self.category, excess));
        }
        Ok(())
    }

    /// Currently outstanding units
    pub fn outstanding(&self) -> u64 {
        self.tx.borrow().outstanding
    }

    /// Total units completed beyond expectation so far
    pub fn excess(&self) -> u64 {
        self.tx.borrow().excess
    }

    /// Wait until nothing is outstanding.
    ///
    /// # Errors
    /// Returns `CounterUnderflow` as soon as any excess has been recorded,
    /// whether before or during the wait.
    pub async fn wait(&self) -> Result<(), ContractError> {
        let mut rx = self.tx.subscribe();
        let tally = *rx
            .wait_for(|tally| tally.outstanding == 0 || tally.excess > 0)
            .await
            .map_err(|_| ContractError::CounterClosed {
                category: self.category.to_string(),
            })?;

        if tally.excess > 0 {
            return Err(ContractError::counter_underflow(self.category, tally.excess));
        }
        Ok(())
    }
}
