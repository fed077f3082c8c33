use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::U256;
use log::{info, warn};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use zkp_identity_registry::{
    config::{BenchmarkConfig, Config},
    contract,
    ethereum::private_key_from_env,
    BenchmarkReport, BenchmarkRunner, FixedVerifier, Groth16Verifier, IdentityRegistry, Ledger,
    LocalClient, ProofArtifacts, ProofVerifier, RegistryClient, SolidityProof,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// In-process ledger with native Groth16 verification.
    Local,
    /// The deployed contract over JSON-RPC.
    Chain,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmark the identity registry lifecycle", long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Backend::Local)]
    backend: Backend,

    /// Accept every proof and skip loading snarkjs artifacts (local only).
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    iterations: Option<usize>,

    /// Concurrency levels, comma separated.
    #[arg(long, value_delimiter = ',')]
    concurrency: Option<Vec<usize>>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

type SharedVerifier = Box<dyn ProofVerifier + Send + Sync>;

/// Artifacts for a dry run: a random identity hash and a proof nobody checks.
fn placeholder_artifacts() -> ProofArtifacts {
    let hash = U256::from(rand::thread_rng().gen::<u64>());
    ProofArtifacts {
        proof: SolidityProof {
            a: [U256::zero(); 2],
            b: [[U256::zero(); 2]; 2],
            c: [U256::zero(); 2],
        },
        public_inputs: vec![hash],
    }
}

async fn run_with<C: RegistryClient>(
    client: C,
    settings: BenchmarkConfig,
    artifacts: &ProofArtifacts,
) -> Result<BenchmarkReport> {
    info!("Running benchmark against the {} backend", client.backend());
    BenchmarkRunner::new(client, settings)?.run(artifacts).await
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.dry_run && args.backend == Backend::Chain {
        return Err(anyhow::anyhow!(
            "--dry-run only applies to the local backend"
        ));
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(iterations) = args.iterations {
        config.benchmark.iterations = iterations;
    }
    if let Some(levels) = args.concurrency.clone() {
        config.benchmark.concurrency_levels = levels;
    }
    if let Some(output) = &args.output {
        config.benchmark.output_file = output.clone();
    }

    let artifacts = if args.dry_run {
        warn!("Dry run: proofs are not verified");
        placeholder_artifacts()
    } else {
        ProofArtifacts::load_from_config(&config.artifacts)
            .context("Failed to load proof artifacts")?
    };

    let report = match args.backend {
        Backend::Local => {
            let verifier: SharedVerifier = if args.dry_run {
                Box::new(FixedVerifier::ACCEPT)
            } else {
                Box::new(Groth16Verifier::load(
                    &config.artifacts.verification_key_path(),
                    config.artifacts.effective_max_file_size(),
                )?)
            };
            let admin = LocalWallet::new(&mut rand::thread_rng()).address();
            info!("Local registry admin: {admin:?}");

            let registry =
                IdentityRegistry::new(admin, verifier)?.with_policy(config.registry.policy);
            let client = LocalClient::new(Arc::new(Ledger::new(registry)), admin);
            run_with(client, config.benchmark.clone(), &artifacts).await?
        }
        Backend::Chain => {
            let private_key = private_key_from_env(&config.network.private_key_env)?;
            let client = contract::connect(&config.network, &private_key).await?;
            info!("Contract: {:?}", client.address());
            let admin = client.ensure_admin_signer().await?;
            info!("Contract admin: {admin:?}");
            run_with(client, config.benchmark.clone(), &artifacts).await?
        }
    };

    report.write_to_file(&config.benchmark.output_file)?;
    println!("{}", report.summary());
    println!(
        "\nResults written to {}",
        config.benchmark.output_file.display()
    );

    Ok(())
}
