use thiserror::Error;

use crate::domain::Amount;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Destination card not found: {0}")]
    DestinationNotFound(String),

    #[error("Destination card number fails the Luhn check: {0}")]
    InvalidDestination(String),

    #[error("Cannot transfer to the same card: {0}")]
    SelfTransfer(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Amount),

    #[error("Insufficient funds on card {card_number}: balance {balance}, required {required}")]
    InsufficientFunds {
        card_number: String,
        balance: Amount,
        required: Amount,
    },

    #[error("Balance of card {card_number} would overflow: balance {balance}, credit {amount}")]
    BalanceOverflow {
        card_number: String,
        balance: Amount,
        amount: Amount,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}
