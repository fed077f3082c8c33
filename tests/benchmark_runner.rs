mod common;

use common::Groth16Fixture;
use ethers::signers::{LocalWallet, Signer};
use std::sync::Arc;
use zkp_identity_registry::config::BenchmarkConfig;
use zkp_identity_registry::{
    BenchmarkRunner, FixedVerifier, IdentityRegistry, Ledger, LocalClient, RegistryClient, UserId,
};

fn settings(output: std::path::PathBuf) -> BenchmarkConfig {
    BenchmarkConfig {
        iterations: 2,
        test_cases: 2,
        concurrency_levels: vec![3],
        retry_attempts: 0,
        retry_delay_ms: 0,
        revocation_reason: 1,
        output_file: output,
    }
}

#[tokio::test]
async fn test_local_benchmark_with_real_proofs() {
    let fixture = Groth16Fixture::setup();
    let artifacts = fixture.artifacts(3, 11);
    let admin = LocalWallet::new(&mut rand::thread_rng()).address();
    let registry = IdentityRegistry::new(admin, fixture.verifier()).unwrap();
    let ledger = Arc::new(Ledger::new(registry));
    let client = LocalClient::new(Arc::clone(&ledger), admin);

    let dir = tempfile::TempDir::new().unwrap();
    let output = dir.path().join("results").join("benchmark_results.json");
    let report = BenchmarkRunner::new(client, settings(output.clone()))
        .unwrap()
        .run(&artifacts)
        .await
        .unwrap();

    assert_eq!(report.backend, "local");
    assert_eq!(report.error_count(), 0, "{:?}", report.errors);
    // 2 iterations x 2 test cases per function.
    assert_eq!(report.metrics.transaction_times["submitProof"].len(), 4);
    assert!(report.metrics.gas_costs["submitProof"].is_empty());
    assert_eq!(report.averages.gas_costs["submitProof"], "N/A");
    assert!(report.averages.transaction_times["approveIdentity"].is_some());

    let concurrency = &report.concurrency_results[&3];
    assert_eq!(concurrency.metrics.transaction_times["submitHashByUser"].len(), 3);
    assert_eq!(concurrency.metrics.transaction_times["revokeApprovedIdentity"].len(), 3);

    // Every run ends with a revocation.
    for i in 1..=3 {
        let id = UserId::from_label(&format!("User{i}"));
        assert!(!ledger.is_verified(&id).unwrap());
    }

    report.write_to_file(&output).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(written["gasCosts"]["submitHashByUser"].is_array());
    assert!(written["concurrencyResults"]["3"]["totalTimeMs"].is_number());
    assert!(report.summary().contains("submitProof"));
}

#[tokio::test]
async fn test_failures_are_recorded_per_function() {
    let admin = LocalWallet::new(&mut rand::thread_rng()).address();
    let fixture = Groth16Fixture::setup();
    let artifacts = fixture.artifacts(3, 11);
    let registry = IdentityRegistry::new(admin, FixedVerifier::REJECT).unwrap();
    let client = LocalClient::new(Arc::new(Ledger::new(registry)), admin);
    assert_eq!(client.backend(), "local");

    let dir = tempfile::TempDir::new().unwrap();
    let mut settings = settings(dir.path().join("out.json"));
    settings.iterations = 1;
    settings.test_cases = 1;
    settings.concurrency_levels = Vec::new();

    let report = BenchmarkRunner::new(client, settings)
        .unwrap()
        .run(&artifacts)
        .await
        .unwrap();

    // The proof is rejected, so the revocation that follows has nothing
    // verified to clear either.
    assert_eq!(report.errors_by_function.get("submitProof"), Some(&1));
    assert_eq!(report.errors_by_function.get("revokeApprovedIdentity"), Some(&1));
    assert_eq!(report.errors_by_function.get("approveIdentity"), None);
    assert_eq!(report.errors[0].iteration, Some(0));
}

#[test]
fn test_invalid_revocation_reason_is_refused() {
    let admin = LocalWallet::new(&mut rand::thread_rng()).address();
    let registry = IdentityRegistry::new(admin, FixedVerifier::ACCEPT).unwrap();
    let client = LocalClient::new(Arc::new(Ledger::new(registry)), admin);

    let mut settings = settings(std::path::PathBuf::from("unused.json"));
    settings.revocation_reason = 9;
    assert!(BenchmarkRunner::new(client, settings).is_err());
}
