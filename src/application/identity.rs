use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::{Card, MAX_ACCOUNT_NUMBER, MAX_PIN, format_account_number};
use crate::storage::{CardStore, StoreError};

/// Draws account numbers and PINs and turns them into fresh cards.
///
/// Uniqueness is checked against the store rather than any in-memory
/// registry. The check is advisory: the store's duplicate rejection on
/// insert is what finally guarantees a unique card number.
pub struct IdentityGenerator {
    rng: Mutex<StdRng>,
}

impl IdentityGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Generator with a reproducible draw sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw_account_number(&self) -> u32 {
        self.rng.lock().gen_range(0..=MAX_ACCOUNT_NUMBER)
    }

    fn draw_pin(&self) -> u16 {
        self.rng.lock().gen_range(0..=MAX_PIN)
    }

    /// Produce a card whose account number is not in use at the time of the
    /// check. Redraws until a free number is found; never gives up and
    /// accepts a taken one.
    pub async fn generate(&self, store: &CardStore) -> Result<Card, StoreError> {
        loop {
            let account = self.draw_account_number();
            let account_number = format_account_number(account);
            if store.exists(&account_number).await? {
                debug!(account_number = %account_number, "Account number taken, redrawing");
                continue;
            }
            return Ok(Card::issue(account, self.draw_pin()));
        }
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}
