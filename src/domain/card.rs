use std::fmt;

use serde::Serialize;

use super::{Amount, luhn};

/// Issuer prefix shared by every card number.
pub const BANK_PREFIX: &str = "400000";

pub const ACCOUNT_NUMBER_WIDTH: usize = 9;
pub const PIN_WIDTH: usize = 4;
pub const CARD_NUMBER_LEN: usize = BANK_PREFIX.len() + ACCOUNT_NUMBER_WIDTH + 1;

pub const MAX_ACCOUNT_NUMBER: u32 = 999_999_999;
pub const MAX_PIN: u16 = 9_999;

/// Render an account number draw as a fixed-width, zero-padded identifier.
pub fn format_account_number(value: u32) -> String {
    assert!(
        value <= MAX_ACCOUNT_NUMBER,
        "account number out of range: {value}"
    );
    format!("{:0width$}", value, width = ACCOUNT_NUMBER_WIDTH)
}

/// Render a PIN draw as a fixed-width, zero-padded string.
pub fn format_pin(value: u16) -> String {
    assert!(value <= MAX_PIN, "PIN out of range: {value}");
    format!("{:0width$}", value, width = PIN_WIDTH)
}

/// An issued payment card and its balance.
///
/// Account number, card number and PIN are identifiers, kept as strings so
/// leading zeros survive storage and comparison.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub account_number: String,
    pub card_number: String,
    pub pin: String,
    /// Balance in whole currency units, never negative
    pub balance: Amount,
}

impl Card {
    /// Build a fresh card with a zero balance from an account number and PIN
    /// draw. The card number is `BANK_PREFIX + account_number + check digit`.
    pub fn issue(account_number: u32, pin: u16) -> Self {
        let account_number = format_account_number(account_number);
        let payload: Vec<u8> = BANK_PREFIX
            .bytes()
            .chain(account_number.bytes())
            .map(|b| b - b'0')
            .collect();
        let checksum = luhn::checksum_for_digits(&payload);

        Self {
            card_number: format!("{BANK_PREFIX}{account_number}{checksum}"),
            account_number,
            pin: format_pin(pin),
            balance: 0,
        }
    }

    /// The trailing Luhn check digit of the card number.
    pub fn checksum_digit(&self) -> u8 {
        self.card_number.as_bytes()[CARD_NUMBER_LEN - 1] - b'0'
    }

    pub fn pin_matches(&self, pin: &str) -> bool {
        self.pin == pin
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("account_number", &self.account_number)
            .field("card_number", &self.card_number)
            .field("pin", &"****")
            .field("balance", &self.balance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_composes_card_number() {
        let card = Card::issue(3_424_062, 42);
        assert_eq!(card.account_number, "003424062");
        assert_eq!(card.card_number, "4000000034240624");
        assert_eq!(card.checksum_digit(), 4);
        assert_eq!(card.pin, "0042");
        assert_eq!(card.balance, 0);
    }

    #[test]
    fn test_issue_range_edges() {
        let low = Card::issue(0, 0);
        assert_eq!(low.card_number, "4000000000000002");
        assert_eq!(low.pin, "0000");

        let high = Card::issue(MAX_ACCOUNT_NUMBER, MAX_PIN);
        assert_eq!(high.card_number, "4000009999999991");
        assert_eq!(high.pin, "9999");
    }

    #[test]
    fn test_issued_cards_pass_luhn() {
        let mut value = 0u32;
        while value <= MAX_ACCOUNT_NUMBER {
            let card = Card::issue(value, 1234);
            assert_eq!(card.card_number.len(), CARD_NUMBER_LEN);
            assert!(card.card_number.starts_with(BANK_PREFIX));
            assert!(luhn::passes_luhn(&card.card_number), "{}", card.card_number);
            value += 7_919_191;
        }
    }

    #[test]
    fn test_debug_redacts_pin() {
        let card = Card::issue(1, 4321);
        let rendered = format!("{card:?}");
        assert!(!rendered.contains("4321"));
        assert!(rendered.contains("****"));
    }

    #[test]
    #[should_panic(expected = "account number out of range")]
    fn test_account_number_out_of_range() {
        format_account_number(1_000_000_000);
    }
}
