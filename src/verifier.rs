//! The proof-verification capability the registry depends on.
//!
//! The registry never checks pairings itself. It hands the proof and the
//! public-input vector to a [`ProofVerifier`] and trusts the boolean that
//! comes back. [`Groth16Verifier`] is the production capability, built from
//! the snarkjs verification key of the identity circuit. [`FixedVerifier`]
//! returns a fixed verdict and is what dry runs and unit tests inject.

use crate::proof::{read_json_file, SnarkjsVerificationKey, SolidityProof};
use crate::utils::u256_to_field;
use anyhow::{Context, Result};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, VerifyingKey};
use ethers::types::U256;
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// `verify(proofA, proofB, proofC, publicInputs) -> bool`.
///
/// Implementations must be deterministic and must return `false`, not panic,
/// on malformed proof encodings.
pub trait ProofVerifier {
    fn verify(&self, proof: &SolidityProof, public_inputs: &[U256]) -> bool;
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for &V {
    fn verify(&self, proof: &SolidityProof, public_inputs: &[U256]) -> bool {
        (**self).verify(proof, public_inputs)
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Box<V> {
    fn verify(&self, proof: &SolidityProof, public_inputs: &[U256]) -> bool {
        (**self).verify(proof, public_inputs)
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Arc<V> {
    fn verify(&self, proof: &SolidityProof, public_inputs: &[U256]) -> bool {
        (**self).verify(proof, public_inputs)
    }
}

/// Groth16 pairing check over BN254 with a prepared verification key.
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
    public_input_count: usize,
}

impl Groth16Verifier {
    #[must_use]
    pub fn from_verifying_key(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            pvk: prepare_verifying_key(vk),
            public_input_count: vk.gamma_abc_g1.len().saturating_sub(1),
        }
    }

    pub fn from_snarkjs(vk: &SnarkjsVerificationKey) -> Result<Self> {
        let vk = vk
            .to_verifying_key()
            .context("Invalid snarkjs verification key")?;
        Ok(Self::from_verifying_key(&vk))
    }

    /// Loads `verification_key.json` exported by snarkjs.
    pub fn load(path: &Path, max_file_size: u64) -> Result<Self> {
        let vk: SnarkjsVerificationKey = read_json_file(path, max_file_size)?;
        let verifier = Self::from_snarkjs(&vk)
            .with_context(|| format!("Failed to load verification key {}", path.display()))?;
        debug!(
            "Loaded Groth16 verification key with {} public input(s)",
            verifier.public_input_count
        );
        Ok(verifier)
    }

    #[must_use]
    pub const fn public_input_count(&self) -> usize {
        self.public_input_count
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &SolidityProof, public_inputs: &[U256]) -> bool {
        if public_inputs.len() != self.public_input_count {
            debug!(
                "Rejecting proof: {} public inputs supplied, key expects {}",
                public_inputs.len(),
                self.public_input_count
            );
            return false;
        }

        let proof = match proof.to_groth16() {
            Ok(proof) => proof,
            Err(e) => {
                debug!("Rejecting malformed proof: {e:#}");
                return false;
            }
        };

        let inputs = match public_inputs
            .iter()
            .map(|value| u256_to_field::<Fr>(*value))
            .collect::<Result<Vec<_>>>()
        {
            Ok(inputs) => inputs,
            Err(e) => {
                debug!("Rejecting public inputs: {e:#}");
                return false;
            }
        };

        match Groth16::<Bn254>::verify_proof(&self.pvk, &proof, &inputs) {
            Ok(valid) => valid,
            Err(e) => {
                debug!("Groth16 verification error: {e}");
                false
            }
        }
    }
}

/// Capability double that returns the same verdict for every proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVerifier(pub bool);

impl FixedVerifier {
    pub const ACCEPT: FixedVerifier = FixedVerifier(true);
    pub const REJECT: FixedVerifier = FixedVerifier(false);
}

impl ProofVerifier for FixedVerifier {
    fn verify(&self, _proof: &SolidityProof, _public_inputs: &[U256]) -> bool {
        self.0
    }
}
