//! JSON-RPC client for the deployed `IdentityZKP` contract.

use crate::client::{RegistryClient, TxOutcome};
use crate::config::NetworkConfig;
use crate::ethereum::parse_address;
use crate::proof::SolidityProof;
use crate::types::{IdentityHash, RevocationReason, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    contract::{abigen, ContractCall},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256},
};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

abigen!(
    IdentityZkp,
    r#"[
        function submitHashByUser(bytes32 userId, uint256 hash) external
        function approveIdentity(bytes32 userId) external
        function registerHash(bytes32 userId, uint256 hash) external
        function submitProof(bytes32 userId, uint256[2] a, uint256[2][2] b, uint256[2] c) external
        function revokeApprovedIdentity(bytes32 userId, uint256 reason) external
        function setAdmin(address newAdmin) external
        function isVerified(bytes32 userId) external view returns (bool)
        function admin() external view returns (address)
        event ProofVerified(bytes32 indexed userId, bool result)
    ]"#
);

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct ContractClient<M> {
    contract: IdentityZkp<M>,
    client: Arc<M>,
    gas_limit: u64,
}

/// Connects a local wallet to the contract named in `config`.
pub async fn connect(
    config: &NetworkConfig,
    private_key: &str,
) -> Result<ContractClient<SignerClient>> {
    let contract_address = config
        .contract_address
        .as_deref()
        .context("network.contract_address is not configured")?;
    let contract_address = parse_address(contract_address)?;

    info!("Connecting to RPC: {}", config.rpc_url);
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .with_context(|| format!("Invalid RPC URL: {}", config.rpc_url))?
        .interval(Duration::from_millis(config.polling_interval_ms));

    let chain_id = match config.chain_id {
        Some(chain_id) => chain_id,
        None => provider
            .get_chainid()
            .await
            .context("Failed to get chain ID")?
            .as_u64(),
    };

    let wallet: LocalWallet = private_key
        .trim()
        .parse()
        .context("Invalid private key")?;
    let wallet = wallet.with_chain_id(chain_id);
    info!("Wallet {:?} on chain {chain_id}", wallet.address());

    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    Ok(ContractClient::new(contract_address, client, config.gas_limit))
}

impl<M: Middleware + 'static> ContractClient<M> {
    pub fn new(address: Address, client: Arc<M>, gas_limit: u64) -> Self {
        Self {
            contract: IdentityZkp::new(address, Arc::clone(&client)),
            client,
            gas_limit,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub async fn admin(&self) -> Result<Address> {
        self.contract
            .admin()
            .call()
            .await
            .context("Failed to read admin")
    }

    /// Checks that the signer holds the on-chain admin role, which approval
    /// and revocation require. Returns the admin address.
    pub async fn ensure_admin_signer(&self) -> Result<Address> {
        let admin = self.admin().await?;
        match self.client.default_sender() {
            Some(sender) if sender == admin => Ok(admin),
            Some(sender) => Err(anyhow::anyhow!(
                "Signer {sender:?} is not the contract admin ({admin:?}); approveIdentity and revokeApprovedIdentity would revert"
            )),
            None => Err(anyhow::anyhow!(
                "No signer configured; the contract admin is {admin:?}"
            )),
        }
    }

    /// Sends with a fixed gas limit, skipping estimation, and waits for the
    /// receipt. A mined transaction with status 0 is an error.
    async fn send(&self, name: &str, call: ContractCall<M, ()>) -> Result<TxOutcome> {
        let call = call.gas(self.gas_limit);
        let pending = call
            .send()
            .await
            .with_context(|| format!("Failed to send {name}"))?;
        let tx_hash = *pending;
        debug!("{name} sent: {tx_hash:?}");

        let receipt = pending
            .await
            .with_context(|| format!("{name} transaction failed"))?
            .with_context(|| format!("No receipt for {name}"))?;

        if receipt.status == Some(0u64.into()) {
            return Err(anyhow::anyhow!(
                "{name} reverted in block {:?} ({tx_hash:?})",
                receipt.block_number
            ));
        }

        let gas_price = match receipt.effective_gas_price {
            Some(price) => Some(price),
            None => self.client.get_gas_price().await.ok(),
        };

        Ok(TxOutcome {
            gas_used: receipt.gas_used,
            gas_price,
            block_number: receipt.block_number.map(|number| number.as_u64()),
        })
    }
}

#[async_trait]
impl<M: Middleware + 'static> RegistryClient for ContractClient<M> {
    fn backend(&self) -> &'static str {
        "chain"
    }

    async fn submit_hash_by_user(&self, id: UserId, hash: IdentityHash) -> Result<TxOutcome> {
        let call = self
            .contract
            .submit_hash_by_user(id.into_bytes(), hash.as_u256());
        self.send("submitHashByUser", call).await
    }

    async fn approve_identity(&self, id: UserId) -> Result<TxOutcome> {
        let call = self.contract.approve_identity(id.into_bytes());
        self.send("approveIdentity", call).await
    }

    async fn submit_proof(&self, id: UserId, proof: &SolidityProof) -> Result<TxOutcome> {
        let call = self
            .contract
            .submit_proof(id.into_bytes(), proof.a, proof.b, proof.c);
        self.send("submitProof", call).await
    }

    async fn revoke_approved_identity(
        &self,
        id: UserId,
        reason: RevocationReason,
    ) -> Result<TxOutcome> {
        let call = self
            .contract
            .revoke_approved_identity(id.into_bytes(), U256::from(reason.code()));
        self.send("revokeApprovedIdentity", call).await
    }

    async fn is_verified(&self, id: UserId) -> Result<bool> {
        self.contract
            .is_verified(id.into_bytes())
            .call()
            .await
            .context("Failed to read isVerified")
    }
}
