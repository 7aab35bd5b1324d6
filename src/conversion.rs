use std::fmt;

use atoi::{FromRadix10Checked, FromRadix10SignedChecked};

/// Largest scale which still allows the mantissa to hold at least one digit before the radix.
pub const MAX_SCALE: u32 = 38;

/// Exact fixed point number. The value is `mantissa * 10^-scale`. E.g. `123.45` with scale 3 is
/// represented by the mantissa `123450`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    /// # Panics
    ///
    /// If `scale` is larger than [`MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u32) -> Self {
        assert!(scale <= MAX_SCALE, "Scale of decimal must not exceed {MAX_SCALE}.");
        Self { mantissa, scale }
    }

    /// Parses the invariant text representation of a decimal (`[+-]digits[.digits]`), as emitted by
    /// data sources for `NUMERIC` and `DECIMAL` columns fetched as text. Leading and trailing
    /// whitespace is ignored.
    ///
    /// The scale of the result is the larger of `declared_scale` and the number of digits after
    /// the radix character. Data sources may choose to omit trailing zeroes, so `10.0` with a
    /// declared scale of `5` is parsed as `10.00000`. `None` if the text is not a decimal, or does
    /// not fit into 38 digits.
    pub fn from_text(text: &[u8], declared_scale: i16) -> Option<Self> {
        let text = text.trim_ascii();
        let negative = text.first() == Some(&b'-');
        let sign_len = usize::from(matches!(text.first(), Some(b'+' | b'-')));

        // High is now the number before the decimal point
        let (high, used_high) = i128::from_radix_10_signed_checked(text);
        let high = high?;
        let num_digits_high = used_high.saturating_sub(sign_len);

        let rest = &text[used_high..];
        let (low, num_digits_low) = match rest.split_first() {
            None => (0, 0),
            Some((b'.', fraction)) => {
                let (low, num_digits_low) = i128::from_radix_10_checked(fraction);
                if num_digits_low != fraction.len() {
                    return None;
                }
                (low?, num_digits_low)
            }
            Some(_) => return None,
        };
        if num_digits_high + num_digits_low == 0 {
            return None;
        }

        let num_digits_low = u32::try_from(num_digits_low).ok()?;
        let scale = num_digits_low.max(u32::try_from(declared_scale.max(0)).ok()?);
        if scale > MAX_SCALE {
            return None;
        }

        // Left shift high so it is compatible with low
        let n = high.checked_mul(10i128.checked_pow(num_digits_low)?)?;
        // We want to increase the absolute of high by low without changing highs sign
        let n = if negative {
            n.checked_sub(low)?
        } else {
            n.checked_add(low)?
        };
        // Pad with the zeroes the data source omitted.
        let mantissa = n.checked_mul(10i128.checked_pow(scale - num_digits_low)?)?;
        Some(Self { mantissa, scale })
    }

    /// Value times `10^scale`.
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Number of digits after the radix character.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Nearest binary floating point number. May lose precision.
    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.mantissa.unsigned_abs();
        let divisor = 10u128.pow(self.scale);
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        write!(f, "{}", abs / divisor)?;
        if self.scale > 0 {
            let width = self.scale as usize;
            write!(f, ".{:0width$}", abs % divisor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::Decimal;

    #[test_case(b"123.45", 2, 12345, 2; "exact scale")]
    #[test_case(b"10.0", 5, 1_000_000, 5; "omitted trailing zeroes")]
    #[test_case(b"-10.00000", 5, -1_000_000, 5; "negative")]
    #[test_case(b"-0.1", 5, -10_000, 5; "negative below one")]
    #[test_case(b"+7", 0, 7, 0; "explicit plus sign")]
    #[test_case(b"42", 2, 4200, 2; "integer text")]
    #[test_case(b"1.2345", 2, 12345, 4; "more digits than declared")]
    #[test_case(b" 3.5 ", 1, 35, 1; "padded with whitespace")]
    #[test_case(b".5", 1, 5, 1; "no integer digits")]
    fn parse_decimal(text: &[u8], declared: i16, mantissa: i128, scale: u32) {
        let actual = Decimal::from_text(text, declared).unwrap();
        assert_eq!(Decimal::new(mantissa, scale), actual);
    }

    #[test_case(b""; "empty")]
    #[test_case(b"-"; "sign only")]
    #[test_case(b"1e5"; "exponent")]
    #[test_case(b"10,5"; "comma as radix")]
    #[test_case(b"1.2.3"; "two radix characters")]
    #[test_case(b"abc"; "not a number")]
    #[test_case(b"123456789012345678901234567890123456789012"; "too many digits")]
    fn reject_invalid_decimal(text: &[u8]) {
        assert_eq!(None, Decimal::from_text(text, 0));
    }

    #[test]
    fn display_keeps_scale() {
        assert_eq!("-0.0100", Decimal::new(-100, 4).to_string());
        assert_eq!("12", Decimal::new(12, 0).to_string());
        assert_eq!("3.14", Decimal::from_text(b"3.14", 0).unwrap().to_string());
    }

    #[test]
    fn approximate_as_float() {
        assert_eq!(1.5, Decimal::new(15, 1).to_f64());
    }
}
