//! HeLa testnet identity and wallet network requests.
//!
//! The client only ever writes to one chain. Anything else the node (or a
//! browser wallet) reports is a wrong-network state that needs an explicit
//! switch. The request payloads mirror EIP-3085 / EIP-3326 / EIP-747 so a
//! browser front-end can forward them to `window.ethereum.request` verbatim.

use alloy::primitives::{Address, B256};
use serde::Serialize;

use crate::contracts::{TOKEN_DECIMALS, TOKEN_SYMBOL};

pub const HELLA_CHAIN_ID: u64 = 666_888;
pub const HELLA_CHAIN_NAME: &str = "HeLa Testnet";
pub const HELLA_RPC_URL: &str = "https://testnet-rpc.helachain.com";
pub const HELLA_EXPLORER_URL: &str = "https://testnet-blockexplorer.helachain.com";

/// Wallet error code for "unrecognised chain" on `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN_ERROR: i64 = 4902;

#[derive(Debug, Clone, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameter object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Network the client is pinned to.
#[derive(Debug, Clone)]
pub struct NetworkIdentity {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
}

/// Result of comparing a connected chain against the pinned one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCheck {
    Correct,
    WrongNetwork { expected: u64, actual: u64 },
}

impl NetworkIdentity {
    pub fn new(chain_id: u64, rpc_url: &str, explorer_url: &str) -> Self {
        Self {
            chain_id,
            name: network_name(chain_id),
            rpc_url: rpc_url.to_string(),
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn hella() -> Self {
        Self::new(HELLA_CHAIN_ID, HELLA_RPC_URL, HELLA_EXPLORER_URL)
    }

    pub fn check(&self, connected_chain_id: u64) -> NetworkCheck {
        if connected_chain_id == self.chain_id {
            NetworkCheck::Correct
        } else {
            NetworkCheck::WrongNetwork {
                expected: self.chain_id,
                actual: connected_chain_id,
            }
        }
    }

    /// Hex chain id as wallets expect it, e.g. `0xa2d08`.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.name.clone(),
            native_currency: NativeCurrency {
                name: "HLUSD".to_string(),
                symbol: "HLUSD".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }

    /// `wallet_switchEthereumChain` request body.
    pub fn switch_request(&self) -> serde_json::Value {
        serde_json::json!({
            "method": "wallet_switchEthereumChain",
            "params": [{ "chainId": self.chain_id_hex() }],
        })
    }

    /// `wallet_addEthereumChain` request body, sent after a switch fails with 4902.
    pub fn add_chain_request(&self) -> serde_json::Value {
        serde_json::json!({
            "method": "wallet_addEthereumChain",
            "params": [self.add_chain_params()],
        })
    }

    /// `wallet_watchAsset` request body registering the staking token.
    pub fn watch_token_request(&self, token: Address) -> serde_json::Value {
        serde_json::json!({
            "method": "wallet_watchAsset",
            "params": {
                "type": "ERC20",
                "options": {
                    "address": token.to_checksum(None),
                    "symbol": TOKEN_SYMBOL,
                    "decimals": TOKEN_DECIMALS,
                },
            },
        })
    }

    pub fn tx_url(&self, tx_hash: B256) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    pub fn address_url(&self, address: Address) -> String {
        format!("{}/address/{}", self.explorer_url, address.to_checksum(None))
    }
}

pub fn is_on_hella(chain_id: u64) -> bool {
    chain_id == HELLA_CHAIN_ID
}

pub fn network_name(chain_id: u64) -> String {
    match chain_id {
        HELLA_CHAIN_ID => HELLA_CHAIN_NAME.to_string(),
        1 => "Ethereum Mainnet".to_string(),
        11_155_111 => "Sepolia Testnet".to_string(),
        8453 => "Base Mainnet".to_string(),
        84_532 => "Base Sepolia".to_string(),
        other => format!("Unknown Network ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_hex() {
        assert_eq!(NetworkIdentity::hella().chain_id_hex(), "0xa2d08");
    }

    #[test]
    fn test_network_check() {
        let hella = NetworkIdentity::hella();
        assert_eq!(hella.check(666_888), NetworkCheck::Correct);
        assert_eq!(
            hella.check(11_155_111),
            NetworkCheck::WrongNetwork {
                expected: 666_888,
                actual: 11_155_111
            }
        );
        assert!(is_on_hella(666_888));
        assert!(!is_on_hella(1));
    }

    #[test]
    fn test_network_names() {
        assert_eq!(network_name(666_888), "HeLa Testnet");
        assert_eq!(network_name(84_532), "Base Sepolia");
        assert_eq!(network_name(42), "Unknown Network (42)");
    }

    #[test]
    fn test_add_chain_payload_shape() {
        let value = NetworkIdentity::hella().add_chain_request();
        assert_eq!(value["method"], "wallet_addEthereumChain");
        let params = &value["params"][0];
        assert_eq!(params["chainId"], "0xa2d08");
        assert_eq!(params["rpcUrls"][0], HELLA_RPC_URL);
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
    }

    #[test]
    fn test_explorer_links_strip_trailing_slash() {
        let net = NetworkIdentity::new(1, "http://rpc", "https://scan.example/");
        assert_eq!(
            net.tx_url(B256::ZERO),
            format!("https://scan.example/tx/{}", B256::ZERO)
        );
    }
}
