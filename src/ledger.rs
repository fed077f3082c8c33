//! Serialised execution of registry calls.
//!
//! The ledger is the single ordering point for every state-changing call: a
//! call takes the lock, gets the next sequence number, runs to completion
//! (commit or revert) and releases it. Clients may fire calls from many
//! threads or tasks; their effects are ordered by lock acquisition only, and
//! each call's preconditions see the state left by every earlier call.

use crate::error::LedgerError;
use crate::proof::SolidityProof;
use crate::registry::IdentityRegistry;
use crate::types::{IdentityHash, IdentityStatus, RegistryEvent, RevocationReason, UserId};
use crate::verifier::ProofVerifier;
use ethers::types::Address;
use log::debug;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// A state-changing registry call, named after the contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SubmitHashByUser { id: UserId, hash: IdentityHash },
    ApproveIdentity { id: UserId },
    RejectSubmission { id: UserId },
    RegisterHash { id: UserId, hash: IdentityHash },
    SubmitProof { id: UserId, proof: SolidityProof },
    RevokeApprovedIdentity { id: UserId, reason: RevocationReason },
    SetAdmin { new_admin: Address },
}

impl Call {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Call::SubmitHashByUser { .. } => "submitHashByUser",
            Call::ApproveIdentity { .. } => "approveIdentity",
            Call::RejectSubmission { .. } => "rejectSubmission",
            Call::RegisterHash { .. } => "registerHash",
            Call::SubmitProof { .. } => "submitProof",
            Call::RevokeApprovedIdentity { .. } => "revokeApprovedIdentity",
            Call::SetAdmin { .. } => "setAdmin",
        }
    }
}

/// Outcome of a committed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub sequence: u64,
    pub caller: Address,
    pub call: &'static str,
    pub events: Vec<RegistryEvent>,
}

struct LedgerState<V> {
    registry: IdentityRegistry<V>,
    next_sequence: u64,
    log: Vec<(u64, RegistryEvent)>,
}

pub struct Ledger<V> {
    state: Mutex<LedgerState<V>>,
}

impl<V: ProofVerifier> Ledger<V> {
    #[must_use]
    pub fn new(registry: IdentityRegistry<V>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                registry,
                next_sequence: 0,
                log: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState<V>>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::Poisoned)
    }

    /// Runs `call` as `caller`. Reverted calls still consume a sequence
    /// number, as a mined-but-failed transaction does.
    pub fn execute(&self, caller: Address, call: Call) -> Result<Receipt, LedgerError> {
        let mut state = self.lock()?;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let name = call.name();
        let registry = &mut state.registry;
        let result = match call {
            Call::SubmitHashByUser { id, hash } => registry.submit_hash_by_user(caller, id, hash),
            Call::ApproveIdentity { id } => registry.approve_identity(caller, id),
            Call::RejectSubmission { id } => registry.reject_submission(caller, id),
            Call::RegisterHash { id, hash } => registry.register_hash(caller, id, hash),
            Call::SubmitProof { id, proof } => registry.submit_proof(caller, id, &proof),
            Call::RevokeApprovedIdentity { id, reason } => {
                registry.revoke_approved_identity(caller, id, reason)
            }
            Call::SetAdmin { new_admin } => registry.set_admin(caller, new_admin),
        };

        if let Err(source) = result {
            debug!("Call #{sequence} ({name}) reverted: {source}");
            return Err(LedgerError::Reverted {
                sequence,
                call: name,
                source,
            });
        }

        let events = state.registry.take_events();
        state
            .log
            .extend(events.iter().cloned().map(|event| (sequence, event)));
        debug!("Call #{sequence} ({name}) committed with {} event(s)", events.len());

        Ok(Receipt {
            sequence,
            caller,
            call: name,
            events,
        })
    }

    /// Runs a read-only query against the current state.
    pub fn read<R>(&self, query: impl FnOnce(&IdentityRegistry<V>) -> R) -> Result<R, LedgerError> {
        let state = self.lock()?;
        Ok(query(&state.registry))
    }

    pub fn is_verified(&self, id: &UserId) -> Result<bool, LedgerError> {
        self.read(|registry| registry.is_verified(id))
    }

    pub fn status(&self, id: &UserId) -> Result<IdentityStatus, LedgerError> {
        self.read(|registry| registry.status(id))
    }

    pub fn admin(&self) -> Result<Address, LedgerError> {
        self.read(|registry| registry.admin())
    }

    /// Number of calls executed so far, committed or reverted.
    pub fn call_count(&self) -> Result<u64, LedgerError> {
        Ok(self.lock()?.next_sequence)
    }

    /// Every committed event with the sequence number of its call.
    pub fn event_log(&self) -> Result<Vec<(u64, RegistryEvent)>, LedgerError> {
        Ok(self.lock()?.log.clone())
    }
}
