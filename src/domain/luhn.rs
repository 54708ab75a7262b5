//! Luhn checksum used to build and to validate card numbers.
//!
//! Both directions share [`control_sum`], so a generated number always
//! validates and the two can never disagree.

use super::CARD_NUMBER_LEN;

/// Sum of the payload digits after doubling every digit at an even index
/// (0, 2, 4, ...) and reducing doubled values above 9 by 9.
fn control_sum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum()
}

fn digits(s: &str) -> Option<Vec<u8>> {
    s.bytes()
        .map(|b| b.is_ascii_digit().then(|| b - b'0'))
        .collect()
}

/// Check digit for a payload given as digit values (0..=9).
pub fn checksum_for_digits(payload: &[u8]) -> u8 {
    let control = control_sum(payload);
    ((10 - control % 10) % 10) as u8
}

/// Check digit for a decimal payload string.
/// Returns `None` if the payload is empty or contains a non-digit.
pub fn checksum_digit(payload: &str) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }
    digits(payload).map(|d| checksum_for_digits(&d))
}

/// Returns true if `number` is a 16-digit string whose last digit is the
/// Luhn check digit of the first fifteen.
pub fn passes_luhn(number: &str) -> bool {
    if number.len() != CARD_NUMBER_LEN {
        return false;
    }
    let Some(digits) = digits(number) else {
        return false;
    };
    let (payload, check) = digits.split_at(digits.len() - 1);
    (control_sum(payload) + u32::from(check[0])) % 10 == 0
}
