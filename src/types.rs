//! Type definitions for the identity registry.

use crate::utils::{field_to_u256, keccak256, parse_u256, u256_to_field, validate_and_strip_hex};
use anyhow::{Context, Result};
use ark_bn254::Fr;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HASH_SIZE: usize = 32;

/// Opaque 32-byte user identifier, the mapping key for every registry entry.
///
/// Usually `keccak256(utf8(label))`, the way the harness derives `User1`,
/// `User2`, ... ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId([u8; HASH_SIZE]);

impl UserId {
    #[must_use]
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Derives an id as `keccak256(label)`.
    ///
    /// ```
    /// use zkp_identity_registry::types::UserId;
    ///
    /// let id = UserId::from_label("User1");
    /// assert_eq!(id, UserId::from_label("User1"));
    /// assert_ne!(id, UserId::from_label("User2"));
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self(keccak256(label.as_bytes()))
    }

    /// Parses a 64-character hex id, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self> {
        let stripped = validate_and_strip_hex(input, HASH_SIZE * 2)
            .with_context(|| format!("Malformed user identifier '{}'", input.trim()))?;
        let bytes = hex::decode(stripped).context("Failed to decode user identifier")?;
        let mut id = [0u8; HASH_SIZE];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    #[must_use]
    pub const fn into_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.to_hex())
    }
}

impl FromStr for UserId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.to_hex()
    }
}

/// Commitment to a user's private identity attributes.
///
/// This is a BN254 scalar-field element (the circuit's single public input),
/// carried as the `uint256` the contract stores. Construction rejects
/// non-canonical values so a registered hash always names exactly one field
/// element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityHash(U256);

impl IdentityHash {
    pub fn from_u256(value: U256) -> Result<Self> {
        u256_to_field::<Fr>(value).context("Identity hash is outside the BN254 scalar field")?;
        Ok(Self(value))
    }

    /// Parses a decimal (snarkjs `public.json`) or `0x` hex value.
    pub fn parse(input: &str) -> Result<Self> {
        let value = parse_u256(input).context("Malformed identity hash")?;
        Self::from_u256(value)
    }

    #[must_use]
    pub fn from_field(field: Fr) -> Self {
        Self(field_to_u256(field))
    }

    #[must_use]
    pub fn to_field(&self) -> Fr {
        let mut bytes = [0u8; 32];
        self.0.to_little_endian(&mut bytes);
        <Fr as ark_ff::PrimeField>::from_le_bytes_mod_order(&bytes)
    }

    #[must_use]
    pub const fn as_u256(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityHash({})", self.0)
    }
}

impl FromStr for IdentityHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityHash {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IdentityHash> for String {
    fn from(hash: IdentityHash) -> Self {
        hash.to_string()
    }
}

/// Why an admin revoked an identity.
///
/// The on-chain contract takes a bare integer; these are the codes it is
/// called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The user asked to be removed. Registration is cleared.
    UserRequested,
    /// The admin withdrew the verification. The registered hash is kept, so
    /// the user may prove again.
    AdminInvalidated,
    /// The identity attributes leaked. Registration is cleared.
    Compromised,
}

impl RevocationReason {
    pub const ALL: [RevocationReason; 3] = [
        RevocationReason::UserRequested,
        RevocationReason::AdminInvalidated,
        RevocationReason::Compromised,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            RevocationReason::UserRequested => 0,
            RevocationReason::AdminInvalidated => 1,
            RevocationReason::Compromised => 2,
        }
    }

    /// Whether revoking for this reason also drops the registered hash.
    #[must_use]
    pub const fn clears_registration(self) -> bool {
        !matches!(self, RevocationReason::AdminInvalidated)
    }
}

impl TryFrom<u8> for RevocationReason {
    type Error = anyhow::Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.code() == code)
            .ok_or_else(|| anyhow::anyhow!("Unknown revocation reason code: {code}"))
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RevocationReason::UserRequested => "user-requested",
            RevocationReason::AdminInvalidated => "admin-invalidated",
            RevocationReason::Compromised => "compromised",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Where a user identifier stands in the registration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    Unregistered,
    PendingApproval,
    Approved,
    Verified,
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityStatus::Unregistered => "unregistered",
            IdentityStatus::PendingApproval => "pending approval",
            IdentityStatus::Approved => "approved",
            IdentityStatus::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Events emitted by the registry, one per successful state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum RegistryEvent {
    HashSubmitted {
        id: UserId,
        hash: IdentityHash,
    },
    IdentityApproved {
        id: UserId,
        hash: IdentityHash,
    },
    SubmissionRejected {
        id: UserId,
    },
    ProofVerified {
        id: UserId,
        result: bool,
    },
    IdentityRevoked {
        id: UserId,
        reason: RevocationReason,
    },
    AdminChanged {
        old_admin: Address,
        new_admin: Address,
    },
}

impl RegistryEvent {
    /// Event name as declared by the contract ABI.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            RegistryEvent::HashSubmitted { .. } => "HashSubmitted",
            RegistryEvent::IdentityApproved { .. } => "IdentityApproved",
            RegistryEvent::SubmissionRejected { .. } => "SubmissionRejected",
            RegistryEvent::ProofVerified { .. } => "ProofVerified",
            RegistryEvent::IdentityRevoked { .. } => "IdentityRevoked",
            RegistryEvent::AdminChanged { .. } => "AdminChanged",
        }
    }
}
