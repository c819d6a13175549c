use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Message shown to the user for every kind of bad duration input.
pub const DURATION_USER_MESSAGE: &str = "Введите корректное число для времени";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("duration '{input}' is not a number")]
    NotANumber { input: String },
    #[error("duration must be greater than 0, got {value}")]
    NotPositive { value: f64 },
    #[error("duration {value} s is too long to wait for")]
    OutOfRange { value: f64 },
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        DURATION_USER_MESSAGE
    }
}

/// A strictly positive, finite number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DurationSecs(f64);

impl DurationSecs {
    pub fn get(self) -> f64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        // The value was range checked when parsed.
        Duration::from_secs_f64(self.0)
    }
}

impl fmt::Display for DurationSecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug formatting of f64 keeps the fractional part (1.0, 2.5, 0.05).
        // Exponents are written signed and at least two digits wide: 1e-07.
        let shortest = format!("{:?}", self.0);
        match shortest.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                write!(f, "{mantissa}e{sign}{digits:0>2}")
            }
            None => f.write_str(&shortest),
        }
    }
}

/// Removes `_` digit separators, which are only valid between two digits.
fn strip_digit_separators(text: &str) -> Option<Cow<'_, str>> {
    if !text.contains('_') {
        return Some(Cow::Borrowed(text));
    }
    let bytes = text.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'_' {
            continue;
        }
        let before = index.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(index + 1).copied();
        let is_digit = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_digit());
        if !is_digit(before) || !is_digit(after) {
            return None;
        }
    }
    Some(Cow::Owned(text.replace('_', "")))
}

pub fn parse_duration(raw: &str) -> Result<DurationSecs, ValidationError> {
    let value: f64 = strip_digit_separators(raw.trim())
        .and_then(|text| text.parse().ok())
        .filter(|value: &f64| value.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            input: raw.to_string(),
        })?;
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { value });
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(ValidationError::OutOfRange { value });
    }
    Ok(DurationSecs(value))
}
