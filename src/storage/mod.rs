mod error;
mod store;

pub use error::*;
pub use store::*;

/// SQL migration for the card table
pub const MIGRATION_001_CARDS: &str = include_str!("migrations/001_cards.sql");
