//! Deferred conversion of numeric literals.
//!
//! The lexer only validates literal shape; these helpers turn a [`Literal`]
//! into a concrete value once the parser knows the target type, rejecting
//! anything outside the target's range. Hex floats convert through
//! `fhex::FromHex` so f32 and f64 each round independently from the source
//! digits.

use super::token::{Base, Literal, LiteralKind, Sign};
use fhex::FromHex;

/// Strips the sign prefix and underscores, leaving bare digits.
fn digits(literal: &Literal) -> String {
    let text = literal
        .text
        .strip_prefix(['+', '-'])
        .unwrap_or(&literal.text);
    if literal.info.has_underscores {
        text.chars().filter(|&c| c != '_').collect()
    } else {
        text.to_string()
    }
}

fn magnitude(literal: &Literal) -> Option<u64> {
    let text = digits(literal);
    match literal.info.base {
        Base::Hex => u64::from_str_radix(text.strip_prefix("0x")?, 16).ok(),
        Base::Decimal => text.parse().ok(),
    }
}

/// An unsigned 32-bit natural (indices, counts, alignments).
pub fn nat32(literal: &Literal) -> Option<u32> {
    if literal.info.sign != Sign::None || literal.info.kind != LiteralKind::Normal {
        return None;
    }
    u32::try_from(magnitude(literal)?).ok()
}

/// An i32 constant. Unsigned spellings up to `u32::MAX` are accepted and
/// reinterpreted, matching the binary format's two's-complement storage.
pub fn int32(literal: &Literal) -> Option<i32> {
    if literal.info.kind != LiteralKind::Normal {
        return None;
    }
    let magnitude = magnitude(literal)?;
    if literal.info.sign == Sign::Minus {
        if magnitude > 1 << 31 {
            return None;
        }
        Some((magnitude as u32).wrapping_neg() as i32)
    } else {
        u32::try_from(magnitude).ok().map(|v| v as i32)
    }
}

/// An i64 constant, with the same unsigned-reinterpretation rule as
/// [`int32`].
pub fn int64(literal: &Literal) -> Option<i64> {
    if literal.info.kind != LiteralKind::Normal {
        return None;
    }
    let magnitude = magnitude(literal)?;
    if literal.info.sign == Sign::Minus {
        if magnitude > 1 << 63 {
            return None;
        }
        Some(magnitude.wrapping_neg() as i64)
    } else {
        Some(magnitude as i64)
    }
}

/// A lane literal for `v128.const`. Accepts the signed range of the lane
/// width and, permissively, the unsigned range too.
pub fn lane(literal: &Literal, bits: u32) -> Option<u64> {
    if literal.info.kind != LiteralKind::Normal {
        return None;
    }
    let magnitude = magnitude(literal)?;
    let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    if literal.info.sign == Sign::Minus {
        if magnitude > 1 << (bits - 1) {
            return None;
        }
        Some(magnitude.wrapping_neg() & mask)
    } else {
        if bits < 64 && magnitude > mask {
            return None;
        }
        Some(magnitude & mask)
    }
}

fn f32_from_payload(negative: bool, payload: u64) -> Option<f32> {
    if payload == 0 || payload >= 1 << 23 {
        return None;
    }
    let mut bits = 0x7f80_0000u32 | payload as u32;
    if negative {
        bits |= 0x8000_0000;
    }
    Some(f32::from_bits(bits))
}

fn f64_from_payload(negative: bool, payload: u64) -> Option<f64> {
    if payload == 0 || payload >= 1 << 52 {
        return None;
    }
    let mut bits = 0x7ff0_0000_0000_0000u64 | payload;
    if negative {
        bits |= 0x8000_0000_0000_0000;
    }
    Some(f64::from_bits(bits))
}

fn nan_payload(literal: &Literal) -> Option<u64> {
    let text = digits(literal);
    let hex = text.strip_prefix("nan:0x")?;
    u64::from_str_radix(hex, 16).ok()
}

pub fn float32(literal: &Literal) -> Option<f32> {
    let negative = literal.info.sign == Sign::Minus;
    match literal.info.kind {
        LiteralKind::Infinity => Some(if negative {
            f32::NEG_INFINITY
        } else {
            f32::INFINITY
        }),
        LiteralKind::Nan => Some(if negative { -f32::NAN } else { f32::NAN }),
        LiteralKind::NanPayload => f32_from_payload(negative, nan_payload(literal)?),
        LiteralKind::Normal => {
            let text = digits(literal);
            let value = match literal.info.base {
                Base::Hex => f32::from_hex(&text)?,
                Base::Decimal => text.parse::<f32>().ok().filter(|v| v.is_finite())?,
            };
            Some(if negative { -value } else { value })
        }
    }
}

pub fn float64(literal: &Literal) -> Option<f64> {
    let negative = literal.info.sign == Sign::Minus;
    match literal.info.kind {
        LiteralKind::Infinity => Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }),
        LiteralKind::Nan => Some(if negative { -f64::NAN } else { f64::NAN }),
        LiteralKind::NanPayload => f64_from_payload(negative, nan_payload(literal)?),
        LiteralKind::Normal => {
            let text = digits(literal);
            let value = match literal.info.base {
                Base::Hex => f64::from_hex(&text)?,
                Base::Decimal => text.parse::<f64>().ok().filter(|v| v.is_finite())?,
            };
            Some(if negative { -value } else { value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::token::LiteralInfo;

    fn lit(text: &str, sign: Sign, kind: LiteralKind, base: Base) -> Literal {
        Literal {
            text: text.to_string(),
            info: LiteralInfo {
                sign,
                kind,
                base,
                has_underscores: text.contains('_'),
            },
        }
    }

    fn nat(text: &str) -> Literal {
        let base = if text.starts_with("0x") {
            Base::Hex
        } else {
            Base::Decimal
        };
        lit(text, Sign::None, LiteralKind::Normal, base)
    }

    fn int(text: &str) -> Literal {
        let sign = if text.starts_with('-') {
            Sign::Minus
        } else {
            Sign::Plus
        };
        let base = if text[1..].starts_with("0x") {
            Base::Hex
        } else {
            Base::Decimal
        };
        lit(text, sign, LiteralKind::Normal, base)
    }

    #[test]
    fn nat32_range() {
        assert_eq!(nat32(&nat("0")), Some(0));
        assert_eq!(nat32(&nat("4294967295")), Some(u32::MAX));
        assert_eq!(nat32(&nat("4294967296")), None);
        assert_eq!(nat32(&nat("0xff")), Some(255));
        assert_eq!(nat32(&nat("1_000")), Some(1000));
    }

    #[test]
    fn int32_range() {
        assert_eq!(int32(&nat("0")), Some(0));
        assert_eq!(int32(&int("-1")), Some(-1));
        assert_eq!(int32(&int("-2147483648")), Some(i32::MIN));
        assert_eq!(int32(&int("-2147483649")), None);
        // Unsigned spelling of -1.
        assert_eq!(int32(&nat("4294967295")), Some(-1));
        assert_eq!(int32(&nat("4294967296")), None);
        assert_eq!(int32(&int("-0x80000000")), Some(i32::MIN));
    }

    #[test]
    fn int64_range() {
        assert_eq!(int64(&int("-9223372036854775808")), Some(i64::MIN));
        assert_eq!(int64(&int("-9223372036854775809")), None);
        assert_eq!(int64(&nat("18446744073709551615")), Some(-1));
        assert_eq!(int64(&nat("0xdeadbeefdeadbeef")), Some(0xdeadbeefdeadbeefu64 as i64));
    }

    #[test]
    fn lanes_accept_signed_and_unsigned() {
        assert_eq!(lane(&nat("255"), 8), Some(255));
        assert_eq!(lane(&int("-1"), 8), Some(255));
        assert_eq!(lane(&int("-128"), 8), Some(128));
        assert_eq!(lane(&int("-129"), 8), None);
        assert_eq!(lane(&nat("256"), 8), None);
        assert_eq!(lane(&nat("65535"), 16), Some(65535));
    }

    #[test]
    fn float_decimals() {
        assert_eq!(float32(&nat("3.5")), Some(3.5));
        assert_eq!(
            float64(&lit("-2.25", Sign::Minus, LiteralKind::Normal, Base::Decimal)),
            Some(-2.25)
        );
        assert_eq!(float64(&nat("1e10")), Some(1e10));
        // Naturals are valid float spellings.
        assert_eq!(float32(&nat("7")), Some(7.0));
    }

    #[test]
    fn float_hex() {
        let h = lit("0x1.8p1", Sign::None, LiteralKind::Normal, Base::Hex);
        assert_eq!(float64(&h), Some(3.0));
        assert_eq!(float32(&h), Some(3.0));
        let plain = lit("0x10", Sign::None, LiteralKind::Normal, Base::Hex);
        assert_eq!(float64(&plain), Some(16.0));
    }

    #[test]
    fn float_specials() {
        assert_eq!(
            float32(&lit("inf", Sign::None, LiteralKind::Infinity, Base::Decimal)),
            Some(f32::INFINITY)
        );
        assert_eq!(
            float64(&lit("-inf", Sign::Minus, LiteralKind::Infinity, Base::Decimal)),
            Some(f64::NEG_INFINITY)
        );
        assert!(float32(&lit("nan", Sign::None, LiteralKind::Nan, Base::Decimal))
            .unwrap()
            .is_nan());
    }

    #[test]
    fn nan_payloads() {
        let v = float32(&lit(
            "nan:0x600000",
            Sign::None,
            LiteralKind::NanPayload,
            Base::Hex,
        ))
        .unwrap();
        assert!(v.is_nan());
        assert_eq!(v.to_bits() & 0x7f_ffff, 0x60_0000);

        // Payload must fit the significand and be nonzero.
        assert_eq!(
            float32(&lit(
                "nan:0x800000",
                Sign::None,
                LiteralKind::NanPayload,
                Base::Hex
            )),
            None
        );
        let v = float64(&lit(
            "-nan:0x4",
            Sign::Minus,
            LiteralKind::NanPayload,
            Base::Hex,
        ))
        .unwrap();
        assert!(v.is_nan());
        assert!(v.is_sign_negative());
    }
}
