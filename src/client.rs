//! Backends the lifecycle benchmark can drive.
//!
//! [`RegistryClient`] is the call surface of the deployed contract. The
//! in-process [`LocalClient`] runs calls against a shared [`Ledger`]; the
//! JSON-RPC implementation lives in [`crate::contract`].

use crate::ledger::{Call, Ledger};
use crate::proof::SolidityProof;
use crate::types::{IdentityHash, RevocationReason, UserId};
use crate::verifier::ProofVerifier;
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::Arc;

/// What a committed call cost.
///
/// Gas figures are only known for on-chain backends. For the local backend
/// `block_number` is the ledger sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    pub gas_used: Option<U256>,
    pub gas_price: Option<U256>,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Short backend name for reports.
    fn backend(&self) -> &'static str;

    async fn submit_hash_by_user(&self, id: UserId, hash: IdentityHash) -> Result<TxOutcome>;

    async fn approve_identity(&self, id: UserId) -> Result<TxOutcome>;

    async fn submit_proof(&self, id: UserId, proof: &SolidityProof) -> Result<TxOutcome>;

    async fn revoke_approved_identity(
        &self,
        id: UserId,
        reason: RevocationReason,
    ) -> Result<TxOutcome>;

    async fn is_verified(&self, id: UserId) -> Result<bool>;
}

/// Drives a shared in-process ledger as a single caller.
pub struct LocalClient<V> {
    ledger: Arc<Ledger<V>>,
    caller: Address,
}

impl<V> LocalClient<V> {
    pub fn new(ledger: Arc<Ledger<V>>, caller: Address) -> Self {
        Self { ledger, caller }
    }

    #[must_use]
    pub const fn caller(&self) -> Address {
        self.caller
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger<V>> {
        &self.ledger
    }
}

impl<V: ProofVerifier> LocalClient<V> {
    fn execute(&self, call: Call) -> Result<TxOutcome> {
        let receipt = self.ledger.execute(self.caller, call)?;
        Ok(TxOutcome {
            block_number: Some(receipt.sequence),
            ..TxOutcome::default()
        })
    }
}

#[async_trait]
impl<V> RegistryClient for LocalClient<V>
where
    V: ProofVerifier + Send + Sync,
{
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn submit_hash_by_user(&self, id: UserId, hash: IdentityHash) -> Result<TxOutcome> {
        self.execute(Call::SubmitHashByUser { id, hash })
    }

    async fn approve_identity(&self, id: UserId) -> Result<TxOutcome> {
        self.execute(Call::ApproveIdentity { id })
    }

    async fn submit_proof(&self, id: UserId, proof: &SolidityProof) -> Result<TxOutcome> {
        self.execute(Call::SubmitProof {
            id,
            proof: proof.clone(),
        })
    }

    async fn revoke_approved_identity(
        &self,
        id: UserId,
        reason: RevocationReason,
    ) -> Result<TxOutcome> {
        self.execute(Call::RevokeApprovedIdentity { id, reason })
    }

    async fn is_verified(&self, id: UserId) -> Result<bool> {
        Ok(self.ledger.is_verified(&id)?)
    }
}
