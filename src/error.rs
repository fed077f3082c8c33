//! Error taxonomy for registry calls.
//!
//! Every variant aborts the triggering call before any state is written. The
//! `Display` text doubles as the revert reason reported to off-chain callers,
//! and [`RegistryError::code`] gives them a stable value to branch on when
//! deciding whether to retry, re-submit or escalate to the admin.

use crate::types::UserId;
use ethers::types::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Only admin can perform this action (caller {caller:?})")]
    Unauthorized { caller: Address },

    #[error("No {what} found for user {id}")]
    NotFound { id: UserId, what: &'static str },

    #[error("Invalid proof for user {id}")]
    InvalidProof { id: UserId },

    #[error("{subject} is already {state}")]
    AlreadyInState { subject: String, state: &'static str },

    #[error("Admin cannot be the zero address")]
    ZeroAddress,

    #[error("Direct hash registration is disabled; submit the hash and have it approved")]
    DirectRegistrationDisabled,
}

impl RegistryError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            RegistryError::Unauthorized { .. } => "UNAUTHORIZED",
            RegistryError::NotFound { .. } => "NOT_FOUND",
            RegistryError::InvalidProof { .. } => "INVALID_PROOF",
            RegistryError::AlreadyInState { .. } => "ALREADY_IN_STATE",
            RegistryError::ZeroAddress => "ZERO_ADDRESS",
            RegistryError::DirectRegistrationDisabled => "DIRECT_REGISTRATION_DISABLED",
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Call #{sequence} ({call}) reverted: {source}")]
    Reverted {
        sequence: u64,
        call: &'static str,
        #[source]
        source: RegistryError,
    },

    #[error("Ledger state lock poisoned by a panicking call")]
    Poisoned,
}

impl LedgerError {
    /// The registry error behind a revert, if any.
    #[must_use]
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            LedgerError::Reverted { source, .. } => Some(source),
            LedgerError::Poisoned => None,
        }
    }
}
