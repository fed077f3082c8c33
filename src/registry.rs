//! Identity registry state machine.
//!
//! Per user identifier the registry moves through
//! `Unregistered -> PendingApproval -> Approved -> Verified`:
//!
//! 1. anyone submits a hash for an id ([`IdentityRegistry::submit_hash_by_user`])
//! 2. the admin promotes it to the registered hash ([`IdentityRegistry::approve_identity`])
//! 3. a proof whose single public input is the registered hash marks the id
//!    verified ([`IdentityRegistry::submit_proof`])
//! 4. the admin may revoke ([`IdentityRegistry::revoke_approved_identity`])
//!
//! The approval step is what keeps the hash a proof is checked against out of
//! the prover's hands. Without it anyone holding a valid proof for some hash
//! could register that hash and "verify" an identity they do not possess.
//!
//! Every operation checks all of its preconditions before writing, so a
//! failed call leaves the state exactly as it found it.

use crate::error::RegistryError;
use crate::proof::SolidityProof;
use crate::types::{IdentityHash, IdentityStatus, RegistryEvent, RevocationReason, UserId};
use crate::verifier::ProofVerifier;
use ethers::types::Address;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whether the admin may write a registered hash in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Hashes only become trusted through submit-then-approve.
    #[default]
    TwoStep,
    /// Also allow the legacy `registerHash` shortcut (admin only).
    AllowDirect,
}

pub struct IdentityRegistry<V> {
    verifier: V,
    admin: Address,
    policy: RegistrationPolicy,
    pending: HashMap<UserId, IdentityHash>,
    registered: HashMap<UserId, IdentityHash>,
    verified: HashSet<UserId>,
    events: Vec<RegistryEvent>,
}

impl<V: ProofVerifier> IdentityRegistry<V> {
    /// Creates a registry administered by `admin`, the deployer.
    pub fn new(admin: Address, verifier: V) -> Result<Self, RegistryError> {
        if admin.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        Ok(Self {
            verifier,
            admin,
            policy: RegistrationPolicy::default(),
            pending: HashMap::new(),
            registered: HashMap::new(),
            verified: HashSet::new(),
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn ensure_admin(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.admin {
            warn!("Rejected admin call from {caller:?}");
            return Err(RegistryError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Writes the registered hash. A verification only ever vouches for the
    /// hash it was proven against, so replacing the hash drops it.
    fn register(&mut self, id: UserId, hash: IdentityHash) {
        let replaced = self
            .registered
            .insert(id, hash)
            .is_some_and(|previous| previous != hash);
        if replaced && self.verified.remove(&id) {
            info!("Verification of {id} cleared: registered hash replaced");
        }
    }

    fn emit(&mut self, event: RegistryEvent) {
        debug!("Emitting {}", event.name());
        self.events.push(event);
    }

    /// Records `hash` as the caller's pending submission for `id`,
    /// overwriting any earlier pending hash. Open to any caller.
    pub fn submit_hash_by_user(
        &mut self,
        caller: Address,
        id: UserId,
        hash: IdentityHash,
    ) -> Result<(), RegistryError> {
        if let Some(previous) = self.pending.insert(id, hash) {
            debug!("Pending hash for {id} replaced ({previous} -> {hash})");
        }
        info!("Hash submitted for {id} by {caller:?}");
        self.emit(RegistryEvent::HashSubmitted { id, hash });
        Ok(())
    }

    /// Promotes the pending hash of `id` to its registered hash.
    ///
    /// Approving an id that is already registered with nothing new pending
    /// fails with `AlreadyInState`, so a repeated approval never has a
    /// second effect.
    pub fn approve_identity(&mut self, caller: Address, id: UserId) -> Result<(), RegistryError> {
        self.ensure_admin(caller)?;

        let Some(hash) = self.pending.remove(&id) else {
            if self.registered.contains_key(&id) {
                return Err(RegistryError::AlreadyInState {
                    subject: id.to_string(),
                    state: "approved",
                });
            }
            return Err(RegistryError::NotFound {
                id,
                what: "pending submission",
            });
        };

        self.register(id, hash);
        info!("Identity {id} approved with hash {hash}");
        self.emit(RegistryEvent::IdentityApproved { id, hash });
        Ok(())
    }

    /// Discards the pending hash of `id` without registering it.
    pub fn reject_submission(&mut self, caller: Address, id: UserId) -> Result<(), RegistryError> {
        self.ensure_admin(caller)?;

        if self.pending.remove(&id).is_none() {
            return Err(RegistryError::NotFound {
                id,
                what: "pending submission",
            });
        }

        info!("Pending submission for {id} rejected");
        self.emit(RegistryEvent::SubmissionRejected { id });
        Ok(())
    }

    /// Legacy one-step registration. Only available under
    /// [`RegistrationPolicy::AllowDirect`].
    pub fn register_hash(
        &mut self,
        caller: Address,
        id: UserId,
        hash: IdentityHash,
    ) -> Result<(), RegistryError> {
        self.ensure_admin(caller)?;
        if self.policy != RegistrationPolicy::AllowDirect {
            return Err(RegistryError::DirectRegistrationDisabled);
        }

        self.register(id, hash);
        info!("Identity {id} registered directly with hash {hash}");
        self.emit(RegistryEvent::IdentityApproved { id, hash });
        Ok(())
    }

    /// Checks `proof` against the registered hash of `id` and marks the id
    /// verified when the verifier accepts it.
    ///
    /// The verifier always sees exactly `[RegisteredHash[id]]` as the public
    /// inputs. A proof made for any other hash therefore fails here rather
    /// than verifying the wrong identity.
    pub fn submit_proof(
        &mut self,
        caller: Address,
        id: UserId,
        proof: &SolidityProof,
    ) -> Result<(), RegistryError> {
        let Some(hash) = self.registered.get(&id).copied() else {
            return Err(RegistryError::NotFound {
                id,
                what: "registered hash",
            });
        };

        if !self.verifier.verify(proof, &[hash.as_u256()]) {
            warn!("Proof from {caller:?} for {id} rejected by verifier");
            return Err(RegistryError::InvalidProof { id });
        }

        self.verified.insert(id);
        info!("Proof verified for {id}");
        self.emit(RegistryEvent::ProofVerified { id, result: true });
        Ok(())
    }

    /// Clears the verification of `id`, and its registered hash when the
    /// reason demands it. Pending submissions are left alone.
    pub fn revoke_approved_identity(
        &mut self,
        caller: Address,
        id: UserId,
        reason: RevocationReason,
    ) -> Result<(), RegistryError> {
        self.ensure_admin(caller)?;

        let registered = self.registered.contains_key(&id);
        let verified = self.verified.contains(&id);
        if !registered && !verified {
            return Err(RegistryError::NotFound {
                id,
                what: "approved identity",
            });
        }
        if !verified && !reason.clears_registration() {
            return Err(RegistryError::AlreadyInState {
                subject: id.to_string(),
                state: "unverified",
            });
        }

        self.verified.remove(&id);
        if reason.clears_registration() {
            self.registered.remove(&id);
        }

        info!("Identity {id} revoked: {reason}");
        self.emit(RegistryEvent::IdentityRevoked { id, reason });
        Ok(())
    }

    /// Hands the admin role to `new_admin`. The caller loses it in the same
    /// step.
    pub fn set_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), RegistryError> {
        self.ensure_admin(caller)?;
        if new_admin.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        if new_admin == self.admin {
            return Err(RegistryError::AlreadyInState {
                subject: format!("{new_admin:?}"),
                state: "admin",
            });
        }

        let old_admin = std::mem::replace(&mut self.admin, new_admin);
        info!("Admin changed from {old_admin:?} to {new_admin:?}");
        self.emit(RegistryEvent::AdminChanged {
            old_admin,
            new_admin,
        });
        Ok(())
    }

    #[must_use]
    pub fn is_verified(&self, id: &UserId) -> bool {
        self.verified.contains(id)
    }

    #[must_use]
    pub const fn admin(&self) -> Address {
        self.admin
    }

    #[must_use]
    pub const fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    #[must_use]
    pub fn pending_hash(&self, id: &UserId) -> Option<IdentityHash> {
        self.pending.get(id).copied()
    }

    #[must_use]
    pub fn registered_hash(&self, id: &UserId) -> Option<IdentityHash> {
        self.registered.get(id).copied()
    }

    /// The furthest lifecycle stage `id` has reached.
    #[must_use]
    pub fn status(&self, id: &UserId) -> IdentityStatus {
        if self.verified.contains(id) {
            IdentityStatus::Verified
        } else if self.registered.contains_key(id) {
            IdentityStatus::Approved
        } else if self.pending.contains_key(id) {
            IdentityStatus::PendingApproval
        } else {
            IdentityStatus::Unregistered
        }
    }

    #[must_use]
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Drains the event log, handing the caller everything emitted so far.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub const fn verifier(&self) -> &V {
        &self.verifier
    }
}
