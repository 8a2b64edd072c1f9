//! Static description of the deployed Momentum contracts on HeLa testnet.
//!
//! Three contracts make up the system:
//! - `MockUSDC`: 6-decimal test token with a public faucet
//! - `ContestFactory`: creates contests (owner only) and aggregates stats
//! - `Contest`: one binary staking round per deployment
//!
//! Addresses here are fallbacks; `Config` can override each of them.

pub mod abi;

use alloy::primitives::{Address, U256};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ContractsConfig;

pub const MOCK_USDC_ADDRESS: &str = "0xa6559C3496c50fd09Cffbc36946E3278A909B18e";
pub const CONTEST_FACTORY_ADDRESS: &str = "0x4452262C3c480F0B759f119489354c4D1ae5f8d8";
pub const ADMIN_ADDRESS: &str = "0x8b189BE61dc48428bb4b85A60520550670406Eeb";

/// Every contest runs for 24 hours from creation.
pub const CONTEST_DURATION_SECS: u64 = 86_400;
/// $1 in token units.
pub const MINIMUM_STAKE: u64 = 1_000_000;
pub const PLATFORM_FEE_PERCENT: u64 = 2;
/// 100 mUSDC per faucet call.
pub const FAUCET_AMOUNT: u64 = 100_000_000;
pub const TOKEN_DECIMALS: u32 = 6;
pub const TOKEN_SYMBOL: &str = "mUSDC";

pub fn minimum_stake() -> U256 {
    U256::from(MINIMUM_STAKE)
}

#[derive(Error, Debug)]
pub enum ContractsError {
    #[error("invalid {label} address: {value}")]
    InvalidAddress { label: &'static str, value: String },
}

/// Parse a hex address, tolerating surrounding whitespace and any checksum casing.
pub fn parse_address(label: &'static str, value: &str) -> Result<Address, ContractsError> {
    Address::from_str(value.trim()).map_err(|_| ContractsError::InvalidAddress {
        label,
        value: value.to_string(),
    })
}

/// Resolved contract addresses for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSet {
    pub token: Address,
    pub factory: Address,
    pub admin: Address,
}

impl ContractSet {
    pub fn from_config(config: &ContractsConfig) -> Result<Self, ContractsError> {
        Ok(Self {
            token: parse_address("token", &config.token)?,
            factory: parse_address("factory", &config.factory)?,
            admin: parse_address("admin", &config.admin)?,
        })
    }
}
