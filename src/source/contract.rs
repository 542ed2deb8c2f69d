//! On-chain data source.
//!
//! Reads the `Admin` contract for Φ parameters and `SKYNTLaunchNFT` for token
//! metadata through `eth_call`. The NFT contract is optional in the
//! deployment record; token operations fail with
//! [`UpstreamError::NotDeployed`] when it is absent. A revert on a
//! per-token call is reported as [`UpstreamError::UnknownToken`], which the
//! service never answers from mock data.

use async_trait::async_trait;
use ethereum_types::U256;
use ethers::abi::Token;
use ethers::types::Address;

use crate::engine::{PhiParameterSet, RarityTier};
use crate::error::UpstreamError;

use super::abi::{Interface, Outputs};
use super::deployment::{ADMIN_CONTRACT, Deployment, NFT_CONTRACT};
use super::rpc::RpcClient;
use super::{DataSource, PhiSnapshot, Provenance, TokenMetadata, u256_to_u64};

/// [`DataSource`] backed by the deployed contracts.
#[derive(Debug)]
pub struct ContractSource {
    rpc: RpcClient,
    admin: Bound,
    nft: Option<Bound>,
}

/// A contract address paired with its interface.
#[derive(Debug)]
struct Bound {
    address: Address,
    interface: Interface,
}

impl ContractSource {
    /// Binds an RPC client to the addresses in a deployment record.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::NotDeployed`] if the `Admin` contract is
    /// missing from the record.
    pub fn new(rpc: RpcClient, deployment: &Deployment) -> Result<Self, UpstreamError> {
        let admin = deployment
            .address(ADMIN_CONTRACT)
            .ok_or_else(|| UpstreamError::NotDeployed(ADMIN_CONTRACT.into()))?;
        let admin = Bound {
            address: parse_address(ADMIN_CONTRACT, admin)?,
            interface: Interface::admin()?,
        };
        let nft = match deployment.address(NFT_CONTRACT) {
            Some(address) => Some(Bound {
                address: parse_address(NFT_CONTRACT, address)?,
                interface: Interface::nft()?,
            }),
            None => {
                tracing::info!("{NFT_CONTRACT} not in deployment record, token queries disabled");
                None
            }
        };
        Ok(Self { rpc, admin, nft })
    }

    fn nft(&self) -> Result<&Bound, UpstreamError> {
        self.nft
            .as_ref()
            .ok_or_else(|| UpstreamError::NotDeployed(NFT_CONTRACT.into()))
    }

    async fn call(
        &self,
        contract: &Bound,
        function: &'static str,
        args: &[Token],
    ) -> Result<Outputs, UpstreamError> {
        let data = contract.interface.encode(function, args)?;
        let output = self.rpc.eth_call(contract.address, data).await?;
        contract.interface.decode(function, &output)
    }

    /// Calls a per-token view function. The NFT contract reverts for ids it
    /// has not minted, so a JSON-RPC error here means the token is unknown.
    async fn token_call(&self, function: &'static str, token_id: u64) -> Result<Outputs, UpstreamError> {
        self.call(self.nft()?, function, &[Token::Uint(U256::from(token_id))])
            .await
            .map_err(|e| match e {
                UpstreamError::Rpc { code, message } => {
                    tracing::debug!(token_id, code, %message, "{function} reverted");
                    UpstreamError::UnknownToken(token_id)
                }
                other => other,
            })
    }
}

#[async_trait]
impl DataSource for ContractSource {
    fn provenance(&self) -> Provenance {
        Provenance::Contract
    }

    async fn phi_total(&self) -> Result<U256, UpstreamError> {
        self.call(&self.admin, "computePhi", &[]).await?.uint(0)
    }

    async fn phi_parameters(&self) -> Result<PhiSnapshot, UpstreamError> {
        let out = self.call(&self.admin, "getPhiDetails", &[]).await?;
        let weights = out.uint_array(0)?;
        let values = out.uint_array(1)?;
        let eigen_vectors = out.uint_array(2)?;
        let total = out.uint(3)?;

        let params = PhiParameterSet::new(weights, values, eigen_vectors)
            .map_err(|e| UpstreamError::Malformed(format!("contract parameter set: {e}")))?;
        Ok(PhiSnapshot { params, total })
    }

    async fn total_supply(&self) -> Result<u64, UpstreamError> {
        let out = self.call(self.nft()?, "totalSupply", &[]).await?;
        u256_to_u64(out.uint(0)?, "totalSupply")
    }

    async fn token_metadata(&self, token_id: u64) -> Result<TokenMetadata, UpstreamError> {
        let out = self.token_call("getMetadata", token_id).await?;
        Ok(TokenMetadata {
            rarity: out.uint(0)?,
            phi_value: out.uint(1)?,
            mint_time: out.uint(2)?,
            supply: out.uint(3)?,
            demand: out.uint(4)?,
            rarity_tier: parse_tier(&out.string(5)?)?,
        })
    }

    async fn token_owner(&self, token_id: u64) -> Result<String, UpstreamError> {
        self.token_call("ownerOf", token_id).await?.address(0)
    }

    async fn rarity_tier(&self, token_id: u64) -> Result<RarityTier, UpstreamError> {
        parse_tier(&self.token_call("getRarityTier", token_id).await?.string(0)?)
    }
}

fn parse_address(contract: &str, address: &str) -> Result<Address, UpstreamError> {
    address
        .parse()
        .map_err(|e| UpstreamError::Malformed(format!("{contract} address '{address}': {e}")))
}

fn parse_tier(name: &str) -> Result<RarityTier, UpstreamError> {
    name.parse()
        .map_err(|e| UpstreamError::Malformed(format!("contract rarity tier: {e}")))
}
