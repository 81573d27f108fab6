//! Input mask for the phone field: `+998 XX XXX XX XX`.

use shared::PHONE_PREFIX;

const COUNTRY_CODE_DIGITS: &str = "998";
/// Character length of a fully populated canonical number.
pub const COMPLETE_PHONE_LEN: usize = 17;
/// Subscriber digit ranges rendered as space-separated groups.
const GROUPS: [(usize, usize); 4] = [(0, 2), (2, 5), (5, 7), (7, 9)];

/// Maps raw keystrokes to the canonical display form. Only the digits of
/// `raw` matter; anything past nine subscriber digits is dropped.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let subscriber = subscriber_digits(&digits);

    let mut formatted = String::with_capacity(COMPLETE_PHONE_LEN);
    formatted.push_str(PHONE_PREFIX);
    for (start, end) in GROUPS {
        if subscriber.len() <= start {
            break;
        }
        formatted.push(' ');
        formatted.push_str(&subscriber[start..end.min(subscriber.len())]);
    }
    formatted
}

/// Digits after the country code. A leading `998` is the code itself; a
/// shorter prefix of it is a half-typed code; anything else is a bare
/// national number. A national number that itself starts with `998`
/// (operator 99, subscriber 8...) is therefore read as carrying the code
/// and loses those three digits; typing the `+998` first avoids that.
fn subscriber_digits(digits: &str) -> &str {
    if let Some(rest) = digits.strip_prefix(COUNTRY_CODE_DIGITS) {
        rest
    } else if COUNTRY_CODE_DIGITS.starts_with(digits) {
        ""
    } else {
        digits
    }
}

pub fn is_complete(phone: &str) -> bool {
    phone.chars().count() >= COMPLETE_PHONE_LEN
}

#[cfg(test)]
#[path = "tests/phone_tests.rs"]
mod tests;
