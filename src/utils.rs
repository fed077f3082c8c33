//! Hex validation, Keccak hashing and field-element conversions.

use anyhow::Result;
use ark_ff::{BigInteger, PrimeField};
use ethers::types::U256;
use sha3::{Digest, Keccak256};

fn is_valid_hex_string(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

fn strip_hex_prefix(input: &str) -> &str {
    input
        .trim()
        .strip_prefix("0x")
        .or_else(|| input.trim().strip_prefix("0X"))
        .unwrap_or_else(|| input.trim())
}

/// Validates and strips hex prefix from a string.
///
/// # Arguments
///
/// * `input` - The hex string to validate (may include "0x" or "0X" prefix)
/// * `expected_len` - Expected length of the hex string after stripping prefix
///
/// # Errors
/// Returns an error if:
/// - The hex string has incorrect length
/// - The hex string contains non-hex characters
///
/// # Examples
///
/// ```
/// use zkp_identity_registry::utils::validate_and_strip_hex;
///
/// let result = validate_and_strip_hex("0x1234abcd", 8).unwrap();
/// assert_eq!(result, "1234abcd");
/// ```
pub fn validate_and_strip_hex(input: &str, expected_len: usize) -> Result<String> {
    let stripped = strip_hex_prefix(input);

    if stripped.len() != expected_len {
        return Err(anyhow::anyhow!(
            "Invalid hex string: must be {} characters (got {})",
            expected_len,
            stripped.len()
        ));
    }

    if !is_valid_hex_string(stripped) {
        return Err(anyhow::anyhow!(
            "Invalid hex string: contains non-hex characters"
        ));
    }

    Ok(stripped.to_string())
}

/// Keccak-256, the hash Solidity exposes as `keccak256`.
#[inline]
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Parses an unsigned 256-bit integer written in decimal or as `0x` hex.
///
/// snarkjs writes every field element as a decimal string, while ethers and
/// block explorers tend to print hex, so both are accepted.
pub fn parse_u256(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Invalid integer: empty string"));
    }

    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        let stripped = strip_hex_prefix(trimmed);
        if stripped.is_empty() || stripped.len() > 64 || !is_valid_hex_string(stripped) {
            return Err(anyhow::anyhow!(
                "Invalid hex integer '{trimmed}': expected at most 64 hex digits"
            ));
        }
        return U256::from_str_radix(stripped, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hex integer '{trimmed}': {e}"));
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow::anyhow!(
            "Invalid decimal integer '{trimmed}': contains non-digit characters"
        ));
    }

    U256::from_dec_str(trimmed)
        .map_err(|e| anyhow::anyhow!("Invalid decimal integer '{trimmed}': {e:?}"))
}

/// Modulus of the prime field `F` as a `U256`.
#[must_use]
pub fn field_modulus<F: PrimeField>() -> U256 {
    U256::from_little_endian(&F::MODULUS.to_bytes_le())
}

/// Converts a canonical integer into a field element.
///
/// Values at or above the modulus are rejected rather than reduced, matching
/// the range checks the Solidity verifier performs on its inputs.
pub fn u256_to_field<F: PrimeField>(value: U256) -> Result<F> {
    let modulus = field_modulus::<F>();
    if value >= modulus {
        return Err(anyhow::anyhow!(
            "Value {value} is not a canonical field element (modulus {modulus})"
        ));
    }

    let mut bytes = [0u8; 32];
    value.to_little_endian(&mut bytes);
    Ok(F::from_le_bytes_mod_order(&bytes))
}

/// Canonical integer representation of a field element.
#[must_use]
pub fn field_to_u256<F: PrimeField>(field: F) -> U256 {
    U256::from_little_endian(&field.into_bigint().to_bytes_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fq, Fr};

    #[test]
    fn test_validate_and_strip_hex_valid() {
        let result = validate_and_strip_hex("0x1234abcd", 8);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "1234abcd");
    }

    #[test]
    fn test_validate_and_strip_hex_uppercase_prefix() {
        let result = validate_and_strip_hex("0X1234ABCD", 8);
        assert_eq!(result.unwrap(), "1234ABCD");
    }

    #[test]
    fn test_validate_and_strip_hex_with_whitespace() {
        let result = validate_and_strip_hex("  0x1234abcd  ", 8);
        assert_eq!(result.unwrap(), "1234abcd");
    }

    #[test]
    fn test_validate_and_strip_hex_wrong_length() {
        let result = validate_and_strip_hex("0x1234abcd", 10);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be 10 characters"));
    }

    #[test]
    fn test_validate_and_strip_hex_invalid_characters() {
        let result = validate_and_strip_hex("0x1234xyzw", 8);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("non-hex characters"));
    }

    #[test]
    fn test_keccak256_matches_known_vector() {
        // keccak256("") as exposed by Solidity and ethers.
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(parse_u256("255").unwrap(), U256::from(255u64));
        assert_eq!(parse_u256("0xff").unwrap(), U256::from(255u64));
        assert_eq!(parse_u256(" 0XFF ").unwrap(), U256::from(255u64));
    }

    #[test]
    fn test_parse_u256_rejects_garbage() {
        assert!(parse_u256("").is_err());
        assert!(parse_u256("12a").is_err());
        assert!(parse_u256("-1").is_err());
        assert!(parse_u256("0x").is_err());
        assert!(parse_u256("0xzz").is_err());
    }

    #[test]
    fn test_field_modulus_is_bn254_scalar_order() {
        assert_eq!(
            field_modulus::<Fr>().to_string(),
            "21888242871839275222246405745257275088548364400416034343698204186575808495617"
        );
        assert_eq!(
            field_modulus::<Fq>().to_string(),
            "21888242871839275222246405745257275088696311157297823662689037894645226208583"
        );
    }

    #[test]
    fn test_u256_to_field_rejects_modulus() {
        let modulus = field_modulus::<Fr>();
        assert!(u256_to_field::<Fr>(modulus).is_err());
        assert!(u256_to_field::<Fr>(modulus - 1).is_ok());
    }

    #[test]
    fn test_field_conversion_is_lossless() {
        let value = U256::from_dec_str("1234567890123456789012345678901234567890").unwrap();
        let field: Fr = u256_to_field(value).unwrap();
        assert_eq!(field_to_u256(field), value);
    }
}
