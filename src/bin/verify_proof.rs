use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};
use std::path::PathBuf;
use zkp_identity_registry::{config::Config, Groth16Verifier, ProofArtifacts, ProofVerifier};

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify a snarkjs Groth16 proof natively", long_about = None)]
struct Args {
    /// TOML config; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    build_dir: Option<PathBuf>,

    #[arg(short, long)]
    proof_file: Option<PathBuf>,

    #[arg(long)]
    public_file: Option<PathBuf>,

    #[arg(long)]
    verification_key: Option<PathBuf>,

    /// Print the Solidity `submitProof` arguments after verifying.
    #[arg(long)]
    calldata: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if let Some(build_dir) = &args.build_dir {
        config.artifacts.build_dir = build_dir.clone();
    }
    if let Some(proof_file) = &args.proof_file {
        config.artifacts.proof_file = proof_file.clone();
    }
    if let Some(public_file) = &args.public_file {
        config.artifacts.public_file = public_file.clone();
    }
    if let Some(verification_key) = &args.verification_key {
        config.artifacts.verification_key_file = verification_key.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let artifacts_config = &config.artifacts;
    let max_file_size = artifacts_config.effective_max_file_size();
    debug!("Artifact size limit: {max_file_size} bytes");

    let key_path = artifacts_config.verification_key_path();
    info!("Loading verification key from: {}", key_path.display());
    println!("Loading verification key from: {}", key_path.display());
    let verifier = Groth16Verifier::load(&key_path, max_file_size)?;

    info!(
        "Loading proof from: {} and {}",
        artifacts_config.proof_path().display(),
        artifacts_config.public_path().display()
    );
    println!("Loading proof from: {}", artifacts_config.proof_path().display());
    let artifacts = ProofArtifacts::load_from_config(artifacts_config)
        .context("Failed to load proof artifacts")?;

    println!("Proof details:");
    println!("  Public signals: {}", artifacts.public_inputs.len());
    for (i, signal) in artifacts.public_inputs.iter().enumerate() {
        println!("  [{i}] {signal}");
    }
    println!(
        "  Key expects {} public input(s)",
        verifier.public_input_count()
    );

    println!("Verifying proof...");
    if !verifier.verify(&artifacts.proof, &artifacts.public_inputs) {
        error!("Proof verification FAILED");
        println!("\n✗ Proof verification FAILED!");
        return Err(anyhow::anyhow!("Proof verification failed"));
    }

    info!("Proof verification PASSED");
    println!("\n✓ Proof verification PASSED!");
    if let Ok(hash) = artifacts.identity_hash() {
        println!("Identity hash: {hash}");
    }

    if args.calldata {
        let calldata = serde_json::json!({
            "a": artifacts.proof.a,
            "b": artifacts.proof.b,
            "c": artifacts.proof.c,
            "input": artifacts.public_inputs,
        });
        println!(
            "\nsubmitProof calldata:\n{}",
            serde_json::to_string_pretty(&calldata).context("Failed to encode calldata")?
        );
    }

    Ok(())
}
