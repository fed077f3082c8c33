//! Configuration file support for the registry tooling.
//!
//! Every section is optional in the TOML file; missing keys fall back to the
//! values the snarkjs build layout and the benchmark scripts use.

use crate::registry::RegistrationPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_BUILD_DIR: &str = "build";
const DEFAULT_PROOF_FILE: &str = "proof.json";
const DEFAULT_PUBLIC_FILE: &str = "public.json";
const DEFAULT_VERIFICATION_KEY_FILE: &str = "verification_key.json";
const DEFAULT_MAX_ARTIFACT_FILE_SIZE: u64 = 1024 * 1024;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_GAS_LIMIT: u64 = 3_000_000;
const DEFAULT_POLLING_INTERVAL_MS: u64 = 1000;
const DEFAULT_PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

const DEFAULT_ITERATIONS: usize = 1;
const DEFAULT_TEST_CASES: usize = 1;
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 3000;
const DEFAULT_REVOCATION_REASON: u8 = 1;
const DEFAULT_BENCHMARK_OUTPUT: &str = "benchmark_results.json";

/// Overrides `artifacts.max_file_size` when set.
pub const MAX_ARTIFACT_FILE_SIZE_ENV: &str = "ZKP_MAX_ARTIFACT_FILE_SIZE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Where snarkjs left its outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    #[serde(default = "default_proof_file")]
    pub proof_file: PathBuf,
    #[serde(default = "default_public_file")]
    pub public_file: PathBuf,
    #[serde(default = "default_verification_key_file")]
    pub verification_key_file: PathBuf,
    #[serde(default = "default_max_artifact_file_size")]
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Queried from the node when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Name of the environment variable holding the signer's private key.
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_test_cases")]
    pub test_cases: usize,
    #[serde(default = "default_concurrency_levels")]
    pub concurrency_levels: Vec<usize>,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_revocation_reason")]
    pub revocation_reason: u8,
    #[serde(default = "default_benchmark_output")]
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub policy: RegistrationPolicy,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            proof_file: default_proof_file(),
            public_file: default_public_file(),
            verification_key_file: default_verification_key_file(),
            max_file_size: DEFAULT_MAX_ARTIFACT_FILE_SIZE,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: None,
            chain_id: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            private_key_env: default_private_key_env(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            test_cases: DEFAULT_TEST_CASES,
            concurrency_levels: default_concurrency_levels(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            revocation_reason: DEFAULT_REVOCATION_REASON,
            output_file: default_benchmark_output(),
        }
    }
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

fn default_proof_file() -> PathBuf {
    PathBuf::from(DEFAULT_PROOF_FILE)
}

fn default_public_file() -> PathBuf {
    PathBuf::from(DEFAULT_PUBLIC_FILE)
}

fn default_verification_key_file() -> PathBuf {
    PathBuf::from(DEFAULT_VERIFICATION_KEY_FILE)
}

fn default_max_artifact_file_size() -> u64 {
    DEFAULT_MAX_ARTIFACT_FILE_SIZE
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_polling_interval_ms() -> u64 {
    DEFAULT_POLLING_INTERVAL_MS
}

fn default_private_key_env() -> String {
    DEFAULT_PRIVATE_KEY_ENV.to_string()
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

fn default_test_cases() -> usize {
    DEFAULT_TEST_CASES
}

fn default_concurrency_levels() -> Vec<usize> {
    vec![3]
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_revocation_reason() -> u8 {
    DEFAULT_REVOCATION_REASON
}

fn default_benchmark_output() -> PathBuf {
    PathBuf::from(DEFAULT_BENCHMARK_OUTPUT)
}

impl ArtifactsConfig {
    /// A relative file name resolves inside `build_dir`; an absolute one is
    /// used as given.
    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.build_dir.join(file)
        }
    }

    #[must_use]
    pub fn proof_path(&self) -> PathBuf {
        self.resolve(&self.proof_file)
    }

    #[must_use]
    pub fn public_path(&self) -> PathBuf {
        self.resolve(&self.public_file)
    }

    #[must_use]
    pub fn verification_key_path(&self) -> PathBuf {
        self.resolve(&self.verification_key_file)
    }

    /// `max_file_size`, unless `ZKP_MAX_ARTIFACT_FILE_SIZE` holds a valid
    /// number.
    #[must_use]
    pub fn effective_max_file_size(&self) -> u64 {
        std::env::var(MAX_ARTIFACT_FILE_SIZE_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.max_file_size)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn load_from_file_or_default(path: &Path) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
