use tracing::{debug, info, warn};

use crate::domain::{Amount, Card, passes_luhn};
use crate::storage::{CardStore, CardTx, Credit, Debit, StoreError};

use super::{AppError, CardLocks, IdentityGenerator, Session};

/// Application service providing the card ledger operations.
/// This is the primary interface for any client (CLI, tests, ...).
///
/// Balance mutations are serialized per card through [`CardLocks`] and
/// applied inside a single store transaction, so a transfer's two legs
/// commit together or not at all.
pub struct LedgerService {
    store: CardStore,
    generator: IdentityGenerator,
    locks: CardLocks,
}

/// Aggregate figures over the whole ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub card_count: i64,
    /// Wider than [`Amount`] since the sum of valid balances can exceed it
    pub total_balance: i128,
}

/// Roll back `tx` and fail with `err`.
async fn abort<T>(tx: CardTx, err: AppError) -> Result<T, AppError> {
    tx.rollback().await?;
    Err(err)
}

fn not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(card_number) => AppError::CardNotFound(card_number),
        other => other.into(),
    }
}

impl LedgerService {
    /// Create a new ledger service over the given store.
    pub fn new(store: CardStore) -> Self {
        Self::with_generator(store, IdentityGenerator::new())
    }

    /// Create a ledger service that issues cards from `generator`.
    pub fn with_generator(store: CardStore, generator: IdentityGenerator) -> Self {
        Self {
            store,
            generator,
            locks: CardLocks::new(),
        }
    }

    /// Initialize a database at the given path, creating the file if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = CardStore::init(&db_url).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = CardStore::connect(&db_url).await?;
        Ok(Self::new(store))
    }

    // ========================
    // Card lifecycle
    // ========================

    /// Issue a new card with a zero balance.
    ///
    /// The returned card is the only place the PIN is ever handed out.
    pub async fn create(&self) -> Result<Card, AppError> {
        let candidate = self.generator.generate(&self.store).await?;
        self.insert_or_redraw(candidate).await
    }

    /// Store `candidate`, drawing a fresh card whenever the store reports the
    /// number as taken. Another issuer may claim a number between the
    /// generator's availability check and this insert.
    pub(crate) async fn insert_or_redraw(&self, mut candidate: Card) -> Result<Card, AppError> {
        loop {
            match self.store.insert(&candidate).await {
                Ok(()) => {
                    info!(card_number = %candidate.card_number, "Card issued");
                    return Ok(candidate);
                }
                Err(StoreError::Duplicate(card_number)) => {
                    debug!(card_number = %card_number, "Lost insert race, redrawing");
                    candidate = self.generator.generate(&self.store).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Check a card number and PIN. Returns a session only when both match
    /// exactly. There is no attempt counter or lockout.
    pub async fn authenticate(
        &self,
        card_number: &str,
        pin: &str,
    ) -> Result<Option<Session>, AppError> {
        match self.store.find(card_number).await? {
            Some(card) if card.pin_matches(pin) => {
                debug!(card_number = %card_number, "Authenticated");
                Ok(Some(Session::new(card.card_number)))
            }
            _ => {
                warn!(card_number = %card_number, "Authentication failed");
                Ok(None)
            }
        }
    }

    /// Delete a card regardless of its balance. Any remaining balance is
    /// discarded with the record.
    pub async fn close_account(&self, card_number: &str) -> Result<(), AppError> {
        let _guard = self.locks.lock(card_number).await;

        let card = self
            .store
            .find(card_number)
            .await?
            .ok_or_else(|| AppError::CardNotFound(card_number.to_string()))?;
        if card.balance > 0 {
            warn!(
                card_number = %card_number,
                balance = card.balance,
                "Closing card with a non-zero balance"
            );
        }

        self.store.delete(card_number).await.map_err(not_found)?;
        info!(card_number = %card_number, "Card closed");
        Ok(())
    }

    // ========================
    // Balance operations
    // ========================

    /// Current balance of a card.
    pub async fn get_balance(&self, card_number: &str) -> Result<Amount, AppError> {
        self.store
            .find(card_number)
            .await?
            .map(|card| card.balance)
            .ok_or_else(|| AppError::CardNotFound(card_number.to_string()))
    }

    /// Add a positive amount to a card.
    pub async fn deposit(&self, card_number: &str, amount: Amount) -> Result<(), AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(amount));
        }

        let _guard = self.locks.lock(card_number).await;
        let mut tx = self.store.begin().await?;
        match tx.credit(card_number, amount).await? {
            Credit::Applied => {}
            Credit::Missing => {
                return abort(tx, AppError::CardNotFound(card_number.to_string())).await;
            }
            Credit::WouldOverflow { balance } => {
                let err = AppError::BalanceOverflow {
                    card_number: card_number.to_string(),
                    balance,
                    amount,
                };
                return abort(tx, err).await;
            }
        }
        tx.commit().await?;

        info!(card_number = %card_number, amount, "Deposit applied");
        Ok(())
    }

    /// Move `amount` from one card to another.
    ///
    /// Checks run in a fixed order: destination checksum, self-transfer,
    /// destination existence, amount sign, then available funds. The funds
    /// check is the debit itself, so it cannot act on a stale balance.
    pub async fn transfer(
        &self,
        from_card: &str,
        to_card: &str,
        amount: Amount,
    ) -> Result<(), AppError> {
        if !passes_luhn(to_card) {
            return Err(AppError::InvalidDestination(to_card.to_string()));
        }
        if from_card == to_card {
            return Err(AppError::SelfTransfer(from_card.to_string()));
        }
        if self.store.find(to_card).await?.is_none() {
            return Err(AppError::DestinationNotFound(to_card.to_string()));
        }
        if amount <= 0 {
            return Err(AppError::InvalidAmount(amount));
        }

        let _guards = self.locks.lock_pair(from_card, to_card).await;
        let mut tx = self.store.begin().await?;

        match tx.debit(from_card, amount).await? {
            Debit::Applied => {}
            Debit::Insufficient { balance } => {
                let err = AppError::InsufficientFunds {
                    card_number: from_card.to_string(),
                    balance,
                    required: amount,
                };
                return abort(tx, err).await;
            }
            Debit::Missing => {
                return abort(tx, AppError::CardNotFound(from_card.to_string())).await;
            }
        }

        match tx.credit(to_card, amount).await? {
            Credit::Applied => {}
            // Closed between the existence check and taking the locks
            Credit::Missing => {
                return abort(tx, AppError::DestinationNotFound(to_card.to_string())).await;
            }
            Credit::WouldOverflow { balance } => {
                let err = AppError::BalanceOverflow {
                    card_number: to_card.to_string(),
                    balance,
                    amount,
                };
                return abort(tx, err).await;
            }
        }

        tx.commit().await?;

        info!(
            from = %from_card,
            to = %to_card,
            amount,
            "Transfer committed"
        );
        Ok(())
    }

    // ========================
    // Reporting
    // ========================

    /// Number of cards currently stored.
    pub async fn card_count(&self) -> Result<i64, AppError> {
        Ok(self.store.count().await?)
    }

    /// Card count and the sum of all balances.
    pub async fn stats(&self) -> Result<LedgerStats, AppError> {
        Ok(LedgerStats {
            card_count: self.store.count().await?,
            total_balance: self.store.total_balance().await?,
        })
    }
}
