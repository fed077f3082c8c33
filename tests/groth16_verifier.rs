mod common;

use common::Groth16Fixture;
use ethers::types::U256;
use zkp_identity_registry::config::ArtifactsConfig;
use zkp_identity_registry::{Groth16Verifier, ProofArtifacts, ProofVerifier};

#[test]
fn test_valid_proof_verifies() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(3, 11);

    assert_eq!(verifier.public_input_count(), 1);
    assert!(verifier.verify(&artifacts.proof, &artifacts.public_inputs));
}

#[test]
fn test_proof_rejected_for_other_public_input() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(3, 11);

    assert!(!verifier.verify(&artifacts.proof, &[U256::from(34u64)]));
}

#[test]
fn test_wrong_input_count_is_rejected_not_panicking() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(3, 11);

    assert!(!verifier.verify(&artifacts.proof, &[]));
    assert!(!verifier.verify(&artifacts.proof, &[U256::from(33u64), U256::one()]));
}

#[test]
fn test_tampered_proof_is_rejected() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(3, 11);

    // Swapping A and C keeps both points on the curve.
    let mut swapped = artifacts.proof.clone();
    std::mem::swap(&mut swapped.a, &mut swapped.c);
    assert!(!verifier.verify(&swapped, &artifacts.public_inputs));

    // Off-curve point.
    let mut off_curve = artifacts.proof.clone();
    off_curve.a[1] += U256::one();
    assert!(!verifier.verify(&off_curve, &artifacts.public_inputs));

    // Coordinate above the base field modulus.
    let mut oversized = artifacts.proof.clone();
    oversized.c[0] = U256::MAX;
    assert!(!verifier.verify(&oversized, &artifacts.public_inputs));
}

#[test]
fn test_public_input_above_scalar_field_is_rejected() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(3, 11);

    assert!(!verifier.verify(&artifacts.proof, &[U256::MAX]));
}

#[test]
fn test_verifier_is_deterministic() {
    let fixture = Groth16Fixture::setup();
    let verifier = fixture.verifier();
    let artifacts = fixture.artifacts(7, 9);

    for _ in 0..3 {
        assert!(verifier.verify(&artifacts.proof, &artifacts.public_inputs));
    }
}

#[test]
fn test_load_artifacts_from_build_dir() {
    let fixture = Groth16Fixture::setup();
    let dir = tempfile::TempDir::new().unwrap();
    fixture.write_build_dir(dir.path(), 4, 6);

    let config = ArtifactsConfig {
        build_dir: dir.path().to_path_buf(),
        ..ArtifactsConfig::default()
    };
    let verifier = Groth16Verifier::load(
        &config.verification_key_path(),
        config.effective_max_file_size(),
    )
    .unwrap();
    let artifacts = ProofArtifacts::load_from_config(&config).unwrap();

    assert_eq!(
        artifacts.identity_hash().unwrap(),
        Groth16Fixture::identity_hash(4, 6)
    );
    assert!(verifier.verify(&artifacts.proof, &artifacts.public_inputs));
}

#[test]
fn test_oversized_verification_key_is_refused() {
    let fixture = Groth16Fixture::setup();
    let dir = tempfile::TempDir::new().unwrap();
    fixture.write_build_dir(dir.path(), 4, 6);

    let err = Groth16Verifier::load(&dir.path().join("verification_key.json"), 16)
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("too large"));
}

#[test]
fn test_fixture_setup_is_reproducible() {
    let first = Groth16Fixture::setup();
    let second = Groth16Fixture::setup();
    assert_eq!(first.vk, second.vk);

    // A proof made under one setup checks against the other's key.
    let artifacts = first.artifacts(3, 11);
    assert!(second.verifier().verify(&artifacts.proof, &artifacts.public_inputs));
}
