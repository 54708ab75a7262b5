mod card;
pub mod luhn;
mod money;

pub use card::*;
pub use luhn::passes_luhn;
pub use money::*;
