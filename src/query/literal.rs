//! Range checks and conversion of numeric literals

use super::token::NumberLiteral;
use crate::credential::AttributeValue;

/// Converts a lexed numeric literal, with an optional leading minus, to a value
///
/// Integers without `L` are 32-bit: decimal ones must fit the signed range
/// (`2147483648` only when negated), while hex, octal and binary ones may
/// use all 32 bits as two's complement. The same rules apply to `L`
/// literals at 64 bits. Floats that overflow, or that round a non-zero
/// value to zero, are rejected.
pub fn decode_number(literal: &NumberLiteral, negative: bool) -> Result<AttributeValue, String> {
    match literal {
        NumberLiteral::Integer {
            radix,
            digits,
            long,
        } => decode_integer(*radix, digits, *long, negative).map(AttributeValue::Int),
        NumberLiteral::Decimal { text, single } => {
            let value = if *single {
                text.parse::<f32>().map(f64::from)
            } else {
                text.parse::<f64>()
            }
            .map_err(|e| format!("malformed floating-point literal: {}", e))?;
            check_float(value, *single, has_nonzero_digit(text.split(['e', 'E']).next()))?;
            Ok(AttributeValue::Float(if negative { -value } else { value }))
        }
        NumberLiteral::HexFloat {
            mantissa,
            exponent,
            single,
        } => {
            let value = hex_float_value(mantissa, exponent)?;
            let value = if *single {
                f64::from(value as f32)
            } else {
                value
            };
            check_float(value, *single, has_nonzero_digit(Some(mantissa)))?;
            Ok(AttributeValue::Float(if negative { -value } else { value }))
        }
    }
}

fn decode_integer(radix: u32, digits: &str, long: bool, negative: bool) -> Result<i64, String> {
    let too_large = || {
        format!(
            "integer number too large{}",
            if long { "" } else { " (use an 'L' suffix for 64-bit values)" }
        )
    };
    let magnitude = u64::from_str_radix(digits, radix).map_err(|_| too_large())?;

    if radix == 10 {
        let limit: u64 = if long {
            i64::MAX as u64
        } else {
            i32::MAX as u64
        };
        let limit = if negative { limit + 1 } else { limit };
        if magnitude > limit {
            return Err(too_large());
        }
        let value = magnitude as i128;
        return Ok((if negative { -value } else { value }) as i64);
    }

    if long {
        let value = magnitude as i64;
        Ok(if negative { value.wrapping_neg() } else { value })
    } else {
        let bits = u32::try_from(magnitude).map_err(|_| too_large())?;
        let value = bits as i32;
        Ok(i64::from(if negative { value.wrapping_neg() } else { value }))
    }
}

fn has_nonzero_digit(text: Option<&str>) -> bool {
    text.map(|t| t.chars().any(|c| c.is_ascii_hexdigit() && c != '0'))
        .unwrap_or(false)
}

fn check_float(value: f64, single: bool, nonzero_written: bool) -> Result<(), String> {
    let kind = if single { "float" } else { "double" };
    if value.is_infinite() {
        return Err(format!("floating-point number too large for {}", kind));
    }
    if value == 0.0 && nonzero_written {
        return Err(format!("floating-point number too small for {}", kind));
    }
    Ok(())
}

/// Value of `0x<mantissa>p<exponent>`, where `mantissa` is `whole.fraction`
fn hex_float_value(mantissa: &str, exponent: &str) -> Result<f64, String> {
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", whole, fraction);
    let digits = digits.trim_start_matches('0');

    if digits.is_empty() {
        return Ok(0.0);
    }

    let exponent: i64 = exponent.parse().unwrap_or_else(|_| {
        if exponent.starts_with('-') {
            i64::MIN / 4
        } else {
            i64::MAX / 4
        }
    });

    // 15 hex digits fit exactly in 60 bits; later digits only matter as a
    // sticky bit for rounding
    let significant = &digits[..digits.len().min(15)];
    let mut bits = u64::from_str_radix(significant, 16).map_err(|e| e.to_string())?;
    let dropped = digits.len() - significant.len();
    if digits[significant.len()..].chars().any(|c| c != '0') {
        bits |= 1;
    }

    let scale = exponent
        .saturating_sub(4 * fraction.len() as i64)
        .saturating_add(4 * dropped as i64);
    Ok(scale_by_power_of_two(bits as f64, scale))
}

fn scale_by_power_of_two(mut value: f64, mut exponent: i64) -> f64 {
    const STEP: i64 = 960;
    while exponent > STEP && value.is_finite() {
        value *= 2f64.powi(STEP as i32);
        exponent -= STEP;
    }
    while exponent < -STEP && value != 0.0 {
        value *= 2f64.powi(-STEP as i32);
        exponent += STEP;
    }
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    value * 2f64.powi(exponent as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(radix: u32, digits: &str, long: bool) -> NumberLiteral {
        NumberLiteral::Integer {
            radix,
            digits: digits.to_string(),
            long,
        }
    }

    #[test]
    fn test_decimal_int_bounds() {
        assert_eq!(decode_number(&int(10, "2147483647", false), false), Ok(AttributeValue::Int(2147483647)));
        assert!(decode_number(&int(10, "2147483648", false), false).is_err());
        assert_eq!(
            decode_number(&int(10, "2147483648", false), true),
            Ok(AttributeValue::Int(-2147483648))
        );
        assert_eq!(
            decode_number(&int(10, "9223372036854775808", true), true),
            Ok(AttributeValue::Int(i64::MIN))
        );
        assert!(decode_number(&int(10, "9223372036854775808", true), false).is_err());
        assert!(decode_number(&int(10, "99999999999999999999", true), false).is_err());
    }

    #[test]
    fn test_non_decimal_ints_are_twos_complement() {
        assert_eq!(decode_number(&int(16, "ffffffff", false), false), Ok(AttributeValue::Int(-1)));
        assert!(decode_number(&int(16, "100000000", false), false).is_err());
        assert_eq!(
            decode_number(&int(16, "100000000", true), false),
            Ok(AttributeValue::Int(0x1_0000_0000))
        );
        assert_eq!(decode_number(&int(8, "777", false), false), Ok(AttributeValue::Int(511)));
        assert_eq!(decode_number(&int(2, "1010", false), true), Ok(AttributeValue::Int(-10)));
        assert_eq!(
            decode_number(&int(16, "ffffffffffffffff", true), false),
            Ok(AttributeValue::Int(-1))
        );
    }

    #[test]
    fn test_float_range() {
        let dec = |text: &str, single: bool| NumberLiteral::Decimal {
            text: text.to_string(),
            single,
        };
        assert_eq!(decode_number(&dec("1.5", false), true), Ok(AttributeValue::Float(-1.5)));
        assert!(decode_number(&dec("1.0e39", true), false).is_err());
        assert!(decode_number(&dec("1.0e39", false), false).is_ok());
        assert!(decode_number(&dec("1.0e-50", true), false).is_err());
        assert!(decode_number(&dec("1.0e400", false), false).is_err());
        assert!(decode_number(&dec("1.0e-400", false), false).is_err());
        assert_eq!(decode_number(&dec("0.0e-400", false), false), Ok(AttributeValue::Float(0.0)));
    }

    #[test]
    fn test_hex_float() {
        let hex = |mantissa: &str, exponent: &str| NumberLiteral::HexFloat {
            mantissa: mantissa.to_string(),
            exponent: exponent.to_string(),
            single: false,
        };
        assert_eq!(decode_number(&hex("1.8", "1"), false), Ok(AttributeValue::Float(3.0)));
        assert_eq!(decode_number(&hex(".8", "0"), false), Ok(AttributeValue::Float(0.5)));
        assert_eq!(decode_number(&hex("1.", "-2"), false), Ok(AttributeValue::Float(0.25)));
        assert_eq!(decode_number(&hex("0.0", "99"), false), Ok(AttributeValue::Float(0.0)));
        assert!(decode_number(&hex("1.", "2000"), false).is_err());
        assert!(decode_number(&hex("1.", "-2000"), false).is_err());
        assert_eq!(
            decode_number(&hex("1.fffffffffffff", "1023"), false),
            Ok(AttributeValue::Float(f64::MAX))
        );
    }
}
