//! Lifecycle benchmark: submit, approve, prove and revoke against any
//! [`RegistryClient`], recording gas, latency and failures.

use crate::client::{RegistryClient, TxOutcome};
use crate::config::BenchmarkConfig;
use crate::proof::{ProofArtifacts, SolidityProof};
use crate::types::{IdentityHash, RevocationReason, UserId};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ethers::types::U256;
use futures::future::join_all;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

/// One contract call of the lifecycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SubmitHash,
    Approve,
    SubmitProof,
    Revoke,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::SubmitHash, Step::Approve, Step::SubmitProof, Step::Revoke];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Step::SubmitHash => "submitHashByUser",
            Step::Approve => "approveIdentity",
            Step::SubmitProof => "submitProof",
            Step::Revoke => "revokeApprovedIdentity",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub label: String,
    pub id: UserId,
    pub hash: IdentityHash,
    pub proof: SolidityProof,
}

/// `count` users labelled `User1..UserN`, all proving the same identity
/// hash with the same proof.
pub fn generate_test_cases(count: usize, artifacts: &ProofArtifacts) -> Result<Vec<TestCase>> {
    let hash = artifacts.identity_hash()?;
    Ok((1..=count)
        .map(|i| {
            let label = format!("User{i}");
            TestCase {
                id: UserId::from_label(&label),
                label,
                hash,
                proof: artifacts.proof.clone(),
            }
        })
        .collect())
}

/// Runs `op` until it succeeds, at most `retries + 1` times, sleeping `delay`
/// between attempts.
pub async fn with_retry<T, F, Fut>(retries: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut remaining = retries;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining > 0 => {
                warn!("Retrying operation after error: {e:#}");
                remaining -= 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn dispatch<C: RegistryClient + ?Sized>(
    client: &C,
    step: Step,
    case: &TestCase,
    reason: RevocationReason,
) -> Result<TxOutcome> {
    match step {
        Step::SubmitHash => client.submit_hash_by_user(case.id, case.hash).await,
        Step::Approve => client.approve_identity(case.id).await,
        Step::SubmitProof => client.submit_proof(case.id, &case.proof).await,
        Step::Revoke => client.revoke_approved_identity(case.id, reason).await,
    }
}

/// Per-function samples. Gas figures are decimal strings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub gas_costs: BTreeMap<&'static str, Vec<String>>,
    pub transaction_times: BTreeMap<&'static str, Vec<f64>>,
    pub gas_prices: Vec<String>,
}

impl Metrics {
    fn new() -> Self {
        let mut metrics = Self::default();
        for step in Step::ALL {
            metrics.gas_costs.insert(step.name(), Vec::new());
            metrics.transaction_times.insert(step.name(), Vec::new());
        }
        metrics
    }

    fn record(&mut self, step: Step, outcome: &TxOutcome, elapsed: Duration) {
        if let Some(gas_used) = outcome.gas_used {
            self.gas_costs
                .entry(step.name())
                .or_default()
                .push(gas_used.to_string());
        }
        if let Some(gas_price) = outcome.gas_price {
            self.gas_prices.push(gas_price.to_string());
        }
        self.transaction_times
            .entry(step.name())
            .or_default()
            .push(elapsed.as_secs_f64() * 1000.0);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkError {
    pub function: &'static str,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyResult {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub errors: Vec<BenchmarkError>,
    pub total_time_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    /// Integer mean, or `"N/A"` when nothing was recorded.
    pub gas_costs: BTreeMap<&'static str, String>,
    pub transaction_times: BTreeMap<&'static str, Option<f64>>,
    pub gas_price: Option<String>,
}

fn mean_decimal(values: &[String]) -> Option<U256> {
    let parsed: Vec<U256> = values
        .iter()
        .filter_map(|value| U256::from_dec_str(value).ok())
        .collect();
    if parsed.is_empty() {
        return None;
    }
    let sum = parsed
        .iter()
        .fold(U256::zero(), |acc, value| acc.saturating_add(*value));
    Some(sum / U256::from(parsed.len()))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl Averages {
    #[must_use]
    pub fn from_metrics(metrics: &Metrics) -> Self {
        Self {
            gas_costs: metrics
                .gas_costs
                .iter()
                .map(|(name, costs)| {
                    let average = mean_decimal(costs)
                        .map_or_else(|| "N/A".to_string(), |value| value.to_string());
                    (*name, average)
                })
                .collect(),
            transaction_times: metrics
                .transaction_times
                .iter()
                .map(|(name, times)| (*name, mean(times)))
                .collect(),
            gas_price: mean_decimal(&metrics.gas_prices).map(|value| value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub backend: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub concurrency_results: BTreeMap<usize, ConcurrencyResult>,
    pub errors: Vec<BenchmarkError>,
    pub averages: Averages,
    pub errors_by_function: BTreeMap<&'static str, usize>,
}

impl BenchmarkReport {
    /// Total failures, including those of the concurrency phase.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
            + self
                .concurrency_results
                .values()
                .map(|result| result.errors.len())
                .sum::<usize>()
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize benchmark report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write benchmark report: {}", path.display()))?;
        Ok(())
    }

    /// Human-readable summary, one line per figure.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Backend: {}", self.backend)];
        for step in Step::ALL {
            let gas = self
                .averages
                .gas_costs
                .get(step.name())
                .map_or("N/A", String::as_str);
            let time = self
                .averages
                .transaction_times
                .get(step.name())
                .copied()
                .flatten()
                .map_or_else(|| "N/A".to_string(), |ms| format!("{ms:.2}ms"));
            lines.push(format!("{}: avg gas {gas}, avg time {time}", step.name()));
        }
        if let Some(price) = &self.averages.gas_price {
            lines.push(format!("Average gas price: {price} wei"));
        }
        for (level, result) in &self.concurrency_results {
            lines.push(format!(
                "Concurrency {level}: {:.2}ms total, {} error(s)",
                result.total_time_ms,
                result.errors.len()
            ));
        }
        lines.push(format!("Errors: {}", self.error_count()));
        for (function, count) in &self.errors_by_function {
            lines.push(format!("  {function}: {count}"));
        }
        lines.join("\n")
    }
}

pub struct BenchmarkRunner<C> {
    client: C,
    settings: BenchmarkConfig,
    reason: RevocationReason,
    metrics: Metrics,
    errors: Vec<BenchmarkError>,
    concurrency_results: BTreeMap<usize, ConcurrencyResult>,
}

impl<C: RegistryClient> BenchmarkRunner<C> {
    pub fn new(client: C, settings: BenchmarkConfig) -> Result<Self> {
        let reason = RevocationReason::try_from(settings.revocation_reason)
            .context("Invalid benchmark.revocation_reason")?;
        Ok(Self {
            client,
            settings,
            reason,
            metrics: Metrics::new(),
            errors: Vec::new(),
            concurrency_results: BTreeMap::new(),
        })
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.settings.retry_delay_ms)
    }

    async fn timed(&self, step: Step, case: &TestCase) -> (Result<TxOutcome>, Duration) {
        let start = Instant::now();
        let result = with_retry(self.settings.retry_attempts, self.retry_delay(), || {
            dispatch(&self.client, step, case, self.reason)
        })
        .await;
        (result, start.elapsed())
    }

    /// Runs the four lifecycle calls for one user. A failed step is recorded
    /// and the remaining steps still run.
    pub async fn run_test_case(&mut self, case: &TestCase, iteration: usize) {
        info!(
            "Running test case for {} ({}), iteration {}",
            case.label,
            case.id,
            iteration + 1
        );
        for step in Step::ALL {
            let (result, elapsed) = self.timed(step, case).await;
            match result {
                Ok(outcome) => {
                    info!(
                        "{} completed in {:.2}ms{}",
                        step.name(),
                        elapsed.as_secs_f64() * 1000.0,
                        outcome
                            .gas_used
                            .map(|gas| format!(", gas used {gas}"))
                            .unwrap_or_default()
                    );
                    self.metrics.record(step, &outcome, elapsed);
                }
                Err(e) => {
                    error!("Error in {}: {e:#}", step.name());
                    self.errors.push(BenchmarkError {
                        function: step.name(),
                        user_id: case.id,
                        iteration: Some(iteration),
                        error: format!("{e:#}"),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    /// Submits `level` hashes at once, then drives approval, proof and
    /// revocation for the same users in sequence.
    pub async fn run_concurrency_test(&mut self, level: usize, cases: &[TestCase]) {
        info!("Running concurrency test with {level} parallel submissions");
        let mut result = ConcurrencyResult {
            metrics: Metrics::new(),
            errors: Vec::new(),
            total_time_ms: 0.0,
        };
        let cases = &cases[..level.min(cases.len())];
        let start = Instant::now();

        let this = &*self;
        let submissions = join_all(cases.iter().map(|case| async move {
            (case, this.timed(Step::SubmitHash, case).await)
        }))
        .await;
        for (case, (outcome, elapsed)) in submissions {
            Self::collect(&mut result, Step::SubmitHash, case, outcome, elapsed);
        }

        for step in [Step::Approve, Step::SubmitProof, Step::Revoke] {
            for case in cases {
                let (outcome, elapsed) = self.timed(step, case).await;
                Self::collect(&mut result, step, case, outcome, elapsed);
            }
        }

        result.total_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Concurrency test with {level} transactions completed in {:.2}ms",
            result.total_time_ms
        );
        self.concurrency_results.insert(level, result);
    }

    fn collect(
        result: &mut ConcurrencyResult,
        step: Step,
        case: &TestCase,
        outcome: Result<TxOutcome>,
        elapsed: Duration,
    ) {
        match outcome {
            Ok(outcome) => result.metrics.record(step, &outcome, elapsed),
            Err(e) => {
                error!("Error in {} for {}: {e:#}", step.name(), case.label);
                result.errors.push(BenchmarkError {
                    function: step.name(),
                    user_id: case.id,
                    iteration: None,
                    error: format!("{e:#}"),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Runs every configured iteration and concurrency level and builds the
    /// report.
    pub async fn run(mut self, artifacts: &ProofArtifacts) -> Result<BenchmarkReport> {
        let started_at = Utc::now();
        let widest = self
            .settings
            .concurrency_levels
            .iter()
            .copied()
            .chain(std::iter::once(self.settings.test_cases))
            .max()
            .unwrap_or(0);
        let cases = generate_test_cases(widest, artifacts)?;

        for iteration in 0..self.settings.iterations {
            for case in &cases[..self.settings.test_cases.min(cases.len())] {
                self.run_test_case(case, iteration).await;
            }
        }

        let levels = self.settings.concurrency_levels.clone();
        for level in levels {
            self.run_concurrency_test(level, &cases).await;
        }

        Ok(self.finish(started_at))
    }

    #[must_use]
    pub fn finish(self, started_at: DateTime<Utc>) -> BenchmarkReport {
        let mut errors_by_function = BTreeMap::new();
        let all_errors = self.errors.iter().chain(
            self.concurrency_results
                .values()
                .flat_map(|result| result.errors.iter()),
        );
        for error in all_errors {
            *errors_by_function.entry(error.function).or_insert(0) += 1;
        }

        BenchmarkReport {
            backend: self.client.backend(),
            started_at,
            finished_at: Utc::now(),
            averages: Averages::from_metrics(&self.metrics),
            metrics: self.metrics,
            concurrency_results: self.concurrency_results,
            errors: self.errors,
            errors_by_function,
        }
    }
}
