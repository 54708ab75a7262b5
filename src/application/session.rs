use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Proof of a successful login, held by the caller.
///
/// The ledger keeps no session state of its own; a session is only the
/// authenticated card number plus bookkeeping for the caller. It never
/// carries the PIN.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    card_number: String,
    issued_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(card_number: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_number,
            issued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}
