//! Real Groth16 artifacts for tests, exported in snarkjs JSON form.
//!
//! The circuit proves knowledge of `a, b` with `a * b = c` for a public `c`,
//! which plays the identity hash. It has the same public shape as the
//! identity circuit: one public signal.
#![allow(dead_code)]

use ark_bn254::{Bn254, Fq, Fr, G1Affine, G2Affine};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;
use std::fs;
use std::path::Path;
use zkp_identity_registry::utils::field_to_u256;
use zkp_identity_registry::{
    Groth16Verifier, IdentityHash, ProofArtifacts, SnarkjsProof, SnarkjsVerificationKey,
};

#[derive(Clone)]
struct ProductCircuit {
    a: Option<Fr>,
    b: Option<Fr>,
}

impl ConstraintSynthesizer<Fr> for ProductCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let a = cs.new_witness_variable(|| self.a.ok_or(SynthesisError::AssignmentMissing))?;
        let b = cs.new_witness_variable(|| self.b.ok_or(SynthesisError::AssignmentMissing))?;
        let c = cs.new_input_variable(|| {
            let a = self.a.ok_or(SynthesisError::AssignmentMissing)?;
            let b = self.b.ok_or(SynthesisError::AssignmentMissing)?;
            Ok(a * b)
        })?;
        cs.enforce_constraint(lc!() + a, lc!() + b, lc!() + c)?;
        Ok(())
    }
}

fn fq(value: Fq) -> String {
    field_to_u256(value).to_string()
}

fn g1_json(point: &G1Affine) -> Vec<String> {
    vec![fq(point.x), fq(point.y), "1".to_string()]
}

fn g2_json(point: &G2Affine) -> Vec<Vec<String>> {
    vec![
        vec![fq(point.x.c0), fq(point.x.c1)],
        vec![fq(point.y.c0), fq(point.y.c1)],
        vec!["1".to_string(), "0".to_string()],
    ]
}

/// Seed for setup and proving, so every run sees the same keys.
const FIXTURE_SEED: u64 = 0x1d3e_7171;

fn fixture_rng() -> StdRng {
    StdRng::seed_from_u64(FIXTURE_SEED)
}

pub fn vk_json(vk: &VerifyingKey<Bn254>) -> SnarkjsVerificationKey {
    SnarkjsVerificationKey {
        protocol: "groth16".to_string(),
        curve: "bn128".to_string(),
        n_public: vk.gamma_abc_g1.len() - 1,
        vk_alpha_1: g1_json(&vk.alpha_g1),
        vk_beta_2: g2_json(&vk.beta_g2),
        vk_gamma_2: g2_json(&vk.gamma_g2),
        vk_delta_2: g2_json(&vk.delta_g2),
        ic: vk.gamma_abc_g1.iter().map(g1_json).collect(),
    }
}

/// A proving key plus its snarkjs verification key.
pub struct Groth16Fixture {
    pk: ProvingKey<Bn254>,
    pub vk: SnarkjsVerificationKey,
}

impl Groth16Fixture {
    pub fn setup() -> Self {
        let mut rng = fixture_rng();
        let circuit = ProductCircuit {
            a: Some(Fr::from(3u64)),
            b: Some(Fr::from(5u64)),
        };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng)
            .expect("Groth16 setup failed");
        Self {
            pk,
            vk: vk_json(&vk),
        }
    }

    /// Proves `a * b` and returns `proof.json` and `public.json` contents.
    pub fn prove(&self, a: u64, b: u64) -> (SnarkjsProof, Vec<String>) {
        let mut rng = fixture_rng();
        let (a, b) = (Fr::from(a), Fr::from(b));
        let circuit = ProductCircuit {
            a: Some(a),
            b: Some(b),
        };
        let proof = Groth16::<Bn254>::prove(&self.pk, circuit, &mut rng).expect("proving failed");

        let snarkjs = SnarkjsProof {
            pi_a: g1_json(&proof.a),
            pi_b: g2_json(&proof.b),
            pi_c: g1_json(&proof.c),
            protocol: Some("groth16".to_string()),
            curve: Some("bn128".to_string()),
        };
        (snarkjs, vec![field_to_u256(a * b).to_string()])
    }

    pub fn artifacts(&self, a: u64, b: u64) -> ProofArtifacts {
        let (proof, public) = self.prove(a, b);
        ProofArtifacts::from_snarkjs(&proof, &public).expect("fixture artifacts are valid")
    }

    pub fn identity_hash(a: u64, b: u64) -> IdentityHash {
        IdentityHash::from_field(Fr::from(a) * Fr::from(b))
    }

    pub fn verifier(&self) -> Groth16Verifier {
        Groth16Verifier::from_snarkjs(&self.vk).expect("fixture key is valid")
    }

    /// Writes `proof.json`, `public.json` and `verification_key.json` into
    /// `dir`, the layout snarkjs leaves in `build/`.
    pub fn write_build_dir(&self, dir: &Path, a: u64, b: u64) {
        let (proof, public) = self.prove(a, b);
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("proof.json"),
            serde_json::to_string_pretty(&proof).unwrap(),
        )
        .unwrap();
        fs::write(
            dir.join("public.json"),
            serde_json::to_string_pretty(&public).unwrap(),
        )
        .unwrap();
        fs::write(
            dir.join("verification_key.json"),
            serde_json::to_string_pretty(&self.vk).unwrap(),
        )
        .unwrap();
    }
}
