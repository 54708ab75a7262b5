use anyhow::Context;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::domain::{Amount, Card};

use super::{MIGRATION_001_CARDS, StoreError};

type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of a guarded debit inside a [`CardTx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debit {
    Applied,
    /// The card exists but holds less than the requested amount.
    Insufficient { balance: Amount },
    Missing,
}

/// Outcome of a guarded credit inside a [`CardTx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Applied,
    /// Adding the amount would overflow the balance column.
    WouldOverflow { balance: Amount },
    Missing,
}

/// Durable mapping from card number to account number, PIN and balance.
///
/// The store holds no business rules beyond defending card-number
/// uniqueness; callers decide what a valid balance change is.
pub struct CardStore {
    pool: SqlitePool,
}

impl CardStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_CARDS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Whether any card already uses this account number.
    pub async fn exists(&self, account_number: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM card WHERE account_number = ? LIMIT 1")
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up account number")?;
        Ok(row.is_some())
    }

    /// Store a new card. Fails with [`StoreError::Duplicate`] if the card
    /// number or account number is already taken.
    pub async fn insert(&self, card: &Card) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO card (account_number, number, pin, balance)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&card.account_number)
        .bind(&card.card_number)
        .bind(&card.pin)
        .bind(card.balance)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(card.card_number.clone()))
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to save card").into()),
        }
    }

    /// Get a card by card number.
    pub async fn find(&self, card_number: &str) -> Result<Option<Card>> {
        let row = sqlx::query(
            r#"
            SELECT account_number, number, pin, balance
            FROM card
            WHERE number = ?
            "#,
        )
        .bind(card_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch card")?;

        Ok(row.as_ref().map(Self::row_to_card))
    }

    /// Overwrite the balance of a card.
    pub async fn update_balance(&self, card_number: &str, new_balance: Amount) -> Result<()> {
        let result = sqlx::query("UPDATE card SET balance = ? WHERE number = ?")
            .bind(new_balance)
            .bind(card_number)
            .execute(&self.pool)
            .await
            .context("Failed to update balance")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(card_number.to_string()));
        }
        Ok(())
    }

    /// Hard-delete a card.
    pub async fn delete(&self, card_number: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM card WHERE number = ?")
            .bind(card_number)
            .execute(&self.pool)
            .await
            .context("Failed to delete card")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(card_number.to_string()));
        }
        Ok(())
    }

    /// Number of stored cards.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM card")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count cards")?;
        Ok(row.get("count"))
    }

    /// Sum of every stored balance.
    ///
    /// Summed in Rust: the ledger total may exceed `i64::MAX` even though each
    /// balance fits, and SQLite's `SUM` errors on integer overflow.
    pub async fn total_balance(&self) -> Result<i128> {
        let rows = sqlx::query("SELECT balance FROM card")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch balances")?;

        Ok(rows
            .iter()
            .map(|row| i128::from(row.get::<Amount, _>("balance")))
            .sum())
    }

    /// Start a transaction for balance changes. Dropping the returned
    /// [`CardTx`] without calling [`CardTx::commit`] rolls it back.
    pub async fn begin(&self) -> Result<CardTx> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(CardTx { tx })
    }

    fn row_to_card(row: &sqlx::sqlite::SqliteRow) -> Card {
        Card {
            account_number: row.get("account_number"),
            card_number: row.get("number"),
            pin: row.get("pin"),
            balance: row.get("balance"),
        }
    }
}

/// A balance transaction over one or more cards.
///
/// Every change is a single guarded `UPDATE`, so the condition and the write
/// happen in one statement and the transaction's first statement is always
/// a write.
pub struct CardTx {
    tx: Transaction<'static, Sqlite>,
}

impl CardTx {
    /// Subtract `amount` from a card if its balance covers it.
    pub async fn debit(&mut self, card_number: &str, amount: Amount) -> Result<Debit> {
        let result = sqlx::query(
            r#"
            UPDATE card
            SET balance = balance - ?
            WHERE number = ? AND balance >= ?
            "#,
        )
        .bind(amount)
        .bind(card_number)
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .context("Failed to debit card")?;

        if result.rows_affected() == 1 {
            return Ok(Debit::Applied);
        }
        Ok(match self.balance(card_number).await? {
            Some(balance) => Debit::Insufficient { balance },
            None => Debit::Missing,
        })
    }

    /// Add `amount` to a card unless the result would overflow.
    pub async fn credit(&mut self, card_number: &str, amount: Amount) -> Result<Credit> {
        let ceiling = Amount::MAX.saturating_sub(amount);
        let result = sqlx::query(
            r#"
            UPDATE card
            SET balance = balance + ?
            WHERE number = ? AND balance <= ?
            "#,
        )
        .bind(amount)
        .bind(card_number)
        .bind(ceiling)
        .execute(&mut *self.tx)
        .await
        .context("Failed to credit card")?;

        if result.rows_affected() == 1 {
            return Ok(Credit::Applied);
        }
        Ok(match self.balance(card_number).await? {
            Some(balance) => Credit::WouldOverflow { balance },
            None => Credit::Missing,
        })
    }

    /// Balance as seen inside this transaction.
    pub async fn balance(&mut self, card_number: &str) -> Result<Option<Amount>> {
        let row = sqlx::query("SELECT balance FROM card WHERE number = ?")
            .bind(card_number)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch balance")?;
        Ok(row.map(|r| r.get("balance")))
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")?;
        Ok(())
    }
}
