//! Address and signer-key handling for the contract backend.

use crate::utils::validate_and_strip_hex;
use anyhow::{Context, Result};
use ethers::types::Address;

const ADDRESS_HEX_LENGTH: usize = 40;
const PRIVATE_KEY_HEX_LENGTH: usize = 64;

/// Parses a contract or admin address.
///
/// Accepts mixed-case input with or without `0x`. The zero address is
/// rejected: it cannot sign, and the registry refuses it as admin.
///
/// ```
/// use zkp_identity_registry::ethereum::parse_address;
///
/// let address = parse_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").unwrap();
/// assert_eq!(
///     format!("{address:?}"),
///     "0x742d35cc6634c0532925a3b844bc454e4438f44e"
/// );
/// assert!(parse_address("0x0000000000000000000000000000000000000000").is_err());
/// ```
pub fn parse_address(address: &str) -> Result<Address> {
    let stripped = validate_and_strip_hex(address, ADDRESS_HEX_LENGTH)
        .with_context(|| format!("Invalid Ethereum address '{}'", address.trim()))?;
    let bytes = hex::decode(stripped).context("Failed to decode address from hex")?;
    let parsed = Address::from_slice(&bytes);

    if parsed.is_zero() {
        return Err(anyhow::anyhow!(
            "The zero address cannot be used here. Please provide a real account or contract address."
        ));
    }

    Ok(parsed)
}

/// Checks that `private_key` is 32 bytes of hex and not all zeros.
pub fn validate_private_key(private_key: &str) -> Result<()> {
    let stripped = validate_and_strip_hex(private_key, PRIVATE_KEY_HEX_LENGTH)?;

    if stripped.chars().all(|c| c == '0') {
        return Err(anyhow::anyhow!(
            "Private key cannot be all zeros. Please provide a valid private key."
        ));
    }

    Ok(())
}

/// Reads the signer key from `var`, the way the deploy scripts read
/// `PRIVATE_KEY`. The value itself never appears in errors.
pub fn private_key_from_env(var: &str) -> Result<String> {
    let key = std::env::var(var)
        .with_context(|| format!("Environment variable {var} is not set"))?;
    validate_private_key(&key).with_context(|| format!("{var} does not hold a valid key"))?;
    Ok(key.trim().to_string())
}
