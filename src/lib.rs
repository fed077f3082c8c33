//! Zero-knowledge identity registry.
//!
//! Users prove possession of identity attributes without revealing them: a
//! user submits an identity hash (a Poseidon commitment computed off-chain),
//! the admin approves it, and the user then submits a Groth16 proof whose
//! single public input is that hash. The registry marks the user verified
//! only when the proof checks out against the approved hash.
//!
//! # Components
//!
//! - [`IdentityRegistry`]: the identity state machine, admin role included
//! - [`Ledger`]: serialised, atomic execution of registry calls
//! - [`ProofVerifier`] / [`Groth16Verifier`]: the pairing-check capability
//! - [`ProofArtifacts`]: snarkjs `proof.json` / `public.json` loading
//! - [`RegistryClient`]: the in-process ledger or the deployed contract
//! - [`BenchmarkRunner`]: the submit / approve / prove / revoke benchmark
//! - [`MerkleTree`]: keccak allowlist over user identifiers
//!
//! # Example
//!
//! ```no_run
//! use ethers::types::Address;
//! use zkp_identity_registry::{
//!     config::Config, Groth16Verifier, IdentityRegistry, ProofArtifacts, UserId,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let verifier = Groth16Verifier::load(
//!     &config.artifacts.verification_key_path(),
//!     config.artifacts.effective_max_file_size(),
//! )?;
//! let artifacts = ProofArtifacts::load_from_config(&config.artifacts)?;
//!
//! let admin = Address::repeat_byte(0xad);
//! let user = UserId::from_label("User1");
//! let mut registry = IdentityRegistry::new(admin, verifier)?;
//! registry.submit_hash_by_user(admin, user, artifacts.identity_hash()?)?;
//! registry.approve_identity(admin, user)?;
//! registry.submit_proof(admin, user, &artifacts.proof)?;
//! assert!(registry.is_verified(&user));
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod ethereum;
pub mod ledger;
pub mod merkle;
pub mod proof;
pub mod registry;
pub mod types;
pub mod utils;
pub mod verifier;

#[cfg(test)]
mod merkle_tests;

pub use benchmark::{BenchmarkReport, BenchmarkRunner};
pub use client::{LocalClient, RegistryClient, TxOutcome};
pub use error::{LedgerError, RegistryError};
pub use ledger::{Call, Ledger, Receipt};
pub use merkle::{MerkleProof, MerkleTree};
pub use proof::{ProofArtifacts, SnarkjsProof, SnarkjsVerificationKey, SolidityProof};
pub use registry::{IdentityRegistry, RegistrationPolicy};
pub use types::{IdentityHash, IdentityStatus, RegistryEvent, RevocationReason, UserId};
pub use verifier::{FixedVerifier, Groth16Verifier, ProofVerifier};
