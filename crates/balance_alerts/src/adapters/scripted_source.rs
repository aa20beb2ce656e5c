// Rust guideline compliant 2026-10-19

//! Scripted adapters for the `BalanceSource` port, used by the simulator.
//!
//! - [`ScriptedSource`] returns whatever reading was set last, or a fetch
//!   error while an outage is scripted.
//! - [`RandomWalkSource`] drains the balance at a jittered spend rate and
//!   occasionally tops it up, driven by a seeded RNG so runs are repeatable.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use domain::{BalanceSnapshot, BalanceSource, FetchError};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

/// `BalanceSource` adapter returning a settable reading.
///
/// Clones share the reading.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    reading: Rc<Cell<BalanceSnapshot>>,
    outage: Rc<Cell<bool>>,
}

impl ScriptedSource {
    /// Start with `balance` and `spend_per_hr`.
    #[must_use]
    pub fn new(balance: f64, spend_per_hr: f64) -> Self {
        Self {
            reading: Rc::new(Cell::new(BalanceSnapshot { balance, spend_per_hr })),
            outage: Rc::new(Cell::new(false)),
        }
    }

    /// Replace the reading returned by subsequent fetches.
    pub fn set(&self, balance: f64, spend_per_hr: f64) {
        self.reading.set(BalanceSnapshot { balance, spend_per_hr });
    }

    /// While `down` is `true`, every fetch fails.
    pub fn set_outage(&self, down: bool) {
        self.outage.set(down);
    }
}

impl BalanceSource for ScriptedSource {
    async fn fetch(&self) -> Result<BalanceSnapshot, FetchError> {
        if self.outage.get() {
            return Err(FetchError::Transport { reason: "scripted outage".to_owned() });
        }
        Ok(self.reading.get())
    }
}

/// `BalanceSource` adapter simulating an account being drained.
#[derive(Debug)]
pub struct RandomWalkSource {
    rng: RefCell<StdRng>,
    balance: Cell<f64>,
    base_spend: f64,
    hours_per_fetch: f64,
    top_up: f64,
}

impl RandomWalkSource {
    /// Start at `balance`, spending about `base_spend` per hour, with each
    /// fetch advancing the account by `hours_per_fetch`.
    ///
    /// Roughly one fetch in fifty adds `top_up` to the balance; one in ten
    /// reports a stopped account (zero spend).
    #[must_use]
    pub fn new(seed: u64, balance: f64, base_spend: f64, hours_per_fetch: f64, top_up: f64) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            balance: Cell::new(balance),
            base_spend,
            hours_per_fetch,
            top_up,
        }
    }
}

impl BalanceSource for RandomWalkSource {
    async fn fetch(&self) -> Result<BalanceSnapshot, FetchError> {
        let mut rng = self.rng.borrow_mut();
        let spend_per_hr = if rng.random_bool(0.1) {
            0.0
        } else {
            self.base_spend * rng.random_range(0.5..1.5)
        };
        let mut balance = self.balance.get() - spend_per_hr * self.hours_per_fetch;
        if rng.random_bool(0.02) {
            balance += self.top_up;
        }
        self.balance.set(balance);
        Ok(BalanceSnapshot { balance, spend_per_hr })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{RandomWalkSource, ScriptedSource};
    use domain::{BalanceSnapshot, BalanceSource as _, FetchError};

    #[tokio::test]
    async fn scripted_reading_follows_set() {
        let source = ScriptedSource::new(100.0, 2.5);
        let handle = source.clone();
        assert_eq!(source.fetch().await.unwrap(), BalanceSnapshot { balance: 100.0, spend_per_hr: 2.5 });
        handle.set(-5.0, 0.0);
        assert_eq!(source.fetch().await.unwrap(), BalanceSnapshot { balance: -5.0, spend_per_hr: 0.0 });
    }

    #[tokio::test]
    async fn scripted_outage_fails_fetch() {
        let source = ScriptedSource::new(100.0, 2.5);
        source.set_outage(true);
        assert!(matches!(source.fetch().await, Err(FetchError::Transport { .. })));
        source.set_outage(false);
        assert!(source.fetch().await.is_ok());
    }

    #[tokio::test]
    async fn random_walk_is_repeatable_per_seed() {
        let a = RandomWalkSource::new(7, 50.0, 2.0, 0.25, 40.0);
        let b = RandomWalkSource::new(7, 50.0, 2.0, 0.25, 40.0);
        for _ in 0..100 {
            assert_eq!(a.fetch().await.unwrap(), b.fetch().await.unwrap());
        }
    }

    #[tokio::test]
    async fn random_walk_spend_is_never_negative() {
        let source = RandomWalkSource::new(42, 50.0, 2.0, 0.25, 40.0);
        for _ in 0..500 {
            let snap = source.fetch().await.unwrap();
            assert!(snap.spend_per_hr >= 0.0);
            assert!(snap.balance.is_finite());
        }
    }
}
