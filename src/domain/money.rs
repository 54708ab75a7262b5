use std::fmt;

/// Balances and transfer amounts are whole currency units. No fractional
/// values exist in the ledger.
pub type Amount = i64;

/// Parse a whole, non-negative amount as typed by a user.
/// Example: "50" -> 50, " 1200 " -> 1200
///
/// Sign and positivity rules live in the ledger service; this only rejects
/// input that is not an integer at all.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }
    if input.contains('.') || input.contains(',') {
        return Err(ParseAmountError::Fractional);
    }
    input
        .parse::<Amount>()
        .map_err(|_| ParseAmountError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    Fractional,
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::Fractional => write!(f, "fractional amounts are not supported"),
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
