//! BN254 scalar field reduction and event identifier normalization.
//!
//! Every value handed to the proximity circuit or folded into a venue hash
//! passes through [`to_field`], so the representative is always in `[0, p)`
//! where `p` is the BN254 scalar field modulus (the `Field` type of the
//! deployed circuit).

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::{BigInt, BigUint, Sign};

/// BN254 scalar field modulus `r`, decimal.
pub const FIELD_MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Errors raised while turning raw inputs into field elements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Invalid integer {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },

    #[error("{what} must be a finite number, got {value}")]
    NonFinite { what: &'static str, value: String },

    #[error("Value is not a canonical field element (>= modulus)")]
    NonCanonical,
}

/// The field modulus as an unsigned big integer.
pub fn field_modulus() -> BigUint {
    BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be())
}

/// Reduce an arbitrary signed integer into the field.
///
/// Negative inputs map to `p - (|v| mod p)`, i.e. the non-negative
/// representative congruent to `v`.
pub fn to_field(value: &BigInt) -> Fr {
    let (sign, magnitude) = value.to_bytes_be();
    let reduced = Fr::from_be_bytes_mod_order(&magnitude);
    match sign {
        Sign::Minus => -reduced,
        Sign::NoSign | Sign::Plus => reduced,
    }
}

/// Canonical integer value of a field element.
pub fn field_to_biguint(value: &Fr) -> BigUint {
    BigUint::from_bytes_be(&value.into_bigint().to_bytes_be())
}

/// Decimal rendering used for circuit inputs. Zero renders as `"0"`.
pub fn field_to_decimal(value: &Fr) -> String {
    field_to_biguint(value).to_str_radix(10)
}

/// Parse a canonical decimal field element, rejecting anything `>= p`.
pub fn field_from_decimal(input: &str) -> Result<Fr, FieldError> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::Parse {
            input: input.to_string(),
            reason: "expected decimal digits",
        });
    }
    let value = BigUint::parse_bytes(input.as_bytes(), 10).ok_or_else(|| FieldError::Parse {
        input: input.to_string(),
        reason: "expected decimal digits",
    })?;
    if value >= field_modulus() {
        return Err(FieldError::NonCanonical);
    }
    Ok(Fr::from_be_bytes_mod_order(&value.to_bytes_be()))
}

/// Event identifier as supplied by a caller: either the raw text (bytes32
/// hex or decimal) or an already-parsed integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    Text(String),
    Integer(BigInt),
}

impl EventId {
    /// The integer this identifier denotes.
    pub fn to_bigint(&self) -> Result<BigInt, FieldError> {
        match self {
            EventId::Text(text) => parse_event_id(text),
            EventId::Integer(value) => Ok(value.clone()),
        }
    }

    pub fn to_field(&self) -> Result<Fr, FieldError> {
        event_id_to_field(self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Text(text) => f.write_str(text),
            EventId::Integer(value) => write!(f, "{}", value),
        }
    }
}

impl FromStr for EventId {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_event_id(s).map(EventId::Integer)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId::Text(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        EventId::Text(value)
    }
}

impl From<BigInt> for EventId {
    fn from(value: BigInt) -> Self {
        EventId::Integer(value)
    }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self {
        EventId::Integer(BigInt::from(value))
    }
}

/// Parse an event identifier string.
///
/// `0x`/`0X` selects hexadecimal (digits only, no sign). Anything else must be
/// an optionally signed run of decimal digits. Surrounding whitespace is
/// ignored; an empty string is rejected.
pub fn parse_event_id(input: &str) -> Result<BigInt, FieldError> {
    let parse_err = |reason: &'static str| FieldError::Parse {
        input: input.to_string(),
        reason,
    };
    let trimmed = input.trim();

    if let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if digits.is_empty() {
            return Err(parse_err("missing hex digits"));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(parse_err("invalid hex digit"));
        }
        return BigInt::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| parse_err("invalid hex"));
    }

    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() {
        return Err(parse_err("empty integer"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_err("invalid decimal digit"));
    }
    let magnitude =
        BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| parse_err("invalid decimal"))?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Reduce an event identifier into the field.
pub fn event_id_to_field(event_id: &EventId) -> Result<Fr, FieldError> {
    Ok(to_field(&event_id.to_bigint()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{One, Zero};
    use proptest::prelude::*;

    fn modulus_bigint() -> BigInt {
        BigInt::from(field_modulus())
    }

    #[test]
    fn test_modulus_matches_constant() {
        assert_eq!(field_modulus().to_str_radix(10), FIELD_MODULUS_DECIMAL);
    }

    #[test]
    fn test_to_field_small_values() {
        assert_eq!(to_field(&BigInt::zero()), Fr::from(0u64));
        assert_eq!(to_field(&BigInt::from(42)), Fr::from(42u64));
        assert_eq!(to_field(&modulus_bigint()), Fr::from(0u64));
        assert_eq!(to_field(&(modulus_bigint() + 5)), Fr::from(5u64));
    }

    #[test]
    fn test_to_field_negative_wraps() {
        let minus_one = to_field(&BigInt::from(-1));
        let expected = modulus_bigint() - BigInt::one();
        assert_eq!(BigInt::from(field_to_biguint(&minus_one)), expected);

        let minus_p = to_field(&-modulus_bigint());
        assert_eq!(minus_p, Fr::from(0u64));
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(field_to_decimal(&Fr::from(0u64)), "0");
        assert_eq!(field_to_decimal(&Fr::from(806_404u64)), "806404");
        assert_eq!(
            field_to_decimal(&to_field(&BigInt::from(-1_000_000))),
            "21888242871839275222246405745257275088548364400416034343698204186575807495617"
        );
    }

    #[test]
    fn test_field_from_decimal_rejects_modulus() {
        assert_eq!(field_from_decimal("17").unwrap(), Fr::from(17u64));
        assert_eq!(
            field_from_decimal(FIELD_MODULUS_DECIMAL),
            Err(FieldError::NonCanonical)
        );
        assert!(matches!(field_from_decimal("-1"), Err(FieldError::Parse { .. })));
        assert!(matches!(field_from_decimal(""), Err(FieldError::Parse { .. })));
    }

    #[test]
    fn test_event_id_hex_and_decimal() {
        assert_eq!(event_id_to_field(&"0x1".into()).unwrap(), Fr::from(1u64));
        assert_eq!(event_id_to_field(&"0X0a".into()).unwrap(), Fr::from(10u64));
        assert_eq!(event_id_to_field(&"255".into()).unwrap(), Fr::from(255u64));
        assert_eq!(event_id_to_field(&" 7 ".into()).unwrap(), Fr::from(7u64));
        assert_eq!(event_id_to_field(&EventId::from(9u64)).unwrap(), Fr::from(9u64));
    }

    #[test]
    fn test_event_id_bytes32_is_reduced() {
        let all_ones = format!("0x{}", "f".repeat(64));
        let field = event_id_to_field(&all_ones.as_str().into()).unwrap();
        let raw = BigInt::parse_bytes("f".repeat(64).as_bytes(), 16).unwrap();
        let expected = raw % modulus_bigint();
        assert_eq!(BigInt::from(field_to_biguint(&field)), expected);
    }

    #[test]
    fn test_event_id_parse_errors() {
        for bad in ["", "   ", "0x", "0xzz", "-0x5", "12a", "1_000", "--1", "+"] {
            assert!(
                matches!(parse_event_id(bad), Err(FieldError::Parse { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_event_id_from_str() {
        let parsed: EventId = "0x10".parse().unwrap();
        assert_eq!(parsed, EventId::Integer(BigInt::from(16)));
        assert!("nope".parse::<EventId>().is_err());
    }

    proptest! {
        #[test]
        fn prop_to_field_is_canonical_and_congruent(
            bytes in proptest::collection::vec(any::<u8>(), 0..80),
            negative in any::<bool>(),
        ) {
            let magnitude = BigInt::from_bytes_be(Sign::Plus, &bytes);
            let value = if negative { -magnitude } else { magnitude };
            let field = to_field(&value);
            let repr = BigInt::from(field_to_biguint(&field));
            let p = modulus_bigint();

            prop_assert!(repr >= BigInt::zero());
            prop_assert!(repr < p);
            prop_assert!(((&value - &repr) % &p).is_zero());
        }
    }
}
