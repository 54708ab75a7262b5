// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use cardbank::application::LedgerService;
use cardbank::domain::{Amount, Card};
use cardbank::storage::CardStore;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a bare card store with a temporary database
pub async fn test_store() -> Result<(CardStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());
    let store = CardStore::init(&url).await?;
    Ok((store, temp_dir))
}

/// Issue a card and fund it with `amount` (skipped when zero)
pub async fn funded_card(service: &LedgerService, amount: Amount) -> Result<Card> {
    let card = service.create().await?;
    if amount > 0 {
        service.deposit(&card.card_number, amount).await?;
    }
    Ok(card)
}
