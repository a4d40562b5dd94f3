use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest accepted magnitude of the base-10 exponent
pub const MAX_EXPONENT: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct ParseDecimalError(String);

/// Exact decimal number kept as coefficient digits and a base-10 exponent.
///
/// Values are built from text, never from a binary float, so `123.45`
/// stays `123.45`. Trailing zeros are significant (`1.50` keeps two decimal
/// places).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    // ASCII digits without leading zeros, "0" for zero
    coefficient: String,
    exponent: i64,
}

impl Decimal {
    pub fn is_sign_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == "0"
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Coefficient digits, most significant first
    pub fn digits(&self) -> &str {
        &self.coefficient
    }

    /// Total digit count and digits after the decimal point.
    ///
    /// The exponent is bounded by [`MAX_EXPONENT`] at parse time.
    pub fn digits_and_decimals(&self) -> (usize, usize) {
        let len = self.coefficient.len();
        if self.exponent >= 0 {
            let mut digits = len;
            if !self.is_zero() {
                digits = digits.saturating_add(self.exponent.unsigned_abs() as usize);
            }
            (digits, 0)
        } else {
            let places = self.exponent.unsigned_abs() as usize;
            if places > len {
                (places, places)
            } else {
                (len, places)
            }
        }
    }

    /// Nearest binary float, used for range checks
    pub fn to_f64(&self) -> f64 {
        let text = format!(
            "{}{}e{}",
            if self.negative { "-" } else { "" },
            self.coefficient,
            self.exponent
        );
        text.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(text.to_string());
        let trimmed = text.trim();

        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(pos) => {
                let exp = rest[pos + 1..].parse::<i64>().map_err(|_| invalid())?;
                (&rest[..pos], exp)
            }
            None => (rest, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let joined = format!("{int_part}{frac_part}");
        let stripped = joined.trim_start_matches('0');
        let coefficient = if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        };

        let exponent = i64::try_from(frac_part.len())
            .ok()
            .and_then(|places| exponent.checked_sub(places))
            .filter(|exponent| exponent.unsigned_abs() <= MAX_EXPONENT)
            .ok_or_else(invalid)?;

        Ok(Decimal {
            negative,
            coefficient,
            exponent,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let digits = &self.coefficient;
        let len = i64::try_from(digits.len()).unwrap_or(i64::MAX);
        let adjusted = self.exponent.saturating_add(len - 1);

        if self.exponent <= 0 && adjusted >= -6 {
            if self.exponent == 0 {
                return f.write_str(digits);
            }
            let point = len.saturating_add(self.exponent);
            if point > 0 {
                let (int_part, frac_part) = digits.split_at(point as usize);
                write!(f, "{int_part}.{frac_part}")
            } else {
                let zeros = "0".repeat(point.unsigned_abs() as usize);
                write!(f, "0.{zeros}{digits}")
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            write!(f, "E{}{}", if adjusted >= 0 { "+" } else { "" }, adjusted)
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Decimal, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
        if !value.is_finite() {
            return Err(E::custom(ParseDecimalError(value.to_string())));
        }
        self.visit_str(&value.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
