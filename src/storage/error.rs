use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A card with the same card or account number is already stored.
    #[error("Card already exists: {0}")]
    Duplicate(String),

    #[error("Card not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}
