//! Typed access to the Momentum contracts over JSON-RPC.
//!
//! `MomentumClient` wraps one HTTP provider (optionally with a local signer)
//! and exposes every read the UI needs plus the state-changing calls. Reads
//! never require a wallet; writes do, and refuse to run on the wrong chain.

pub mod read;
pub mod types;
pub mod write;

pub use read::{PolledRead, ReadState};
pub use types::{
    ContestSnapshot, FactoryStats, Side, TokenMetadata, UserPosition, UserStakes, WinningOption,
};
pub use write::{WriteError, WriteKind, WriteStatus, WriteStatusView, WriteTracker, WriteTrackers};

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::contracts::abi::{Contest, ContestFactory, MockUSDC};
use crate::contracts::{ContractSet, ContractsError};
use crate::network::{is_on_hella, network_name, NetworkCheck, NetworkIdentity};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Contracts(#[from] ContractsError),
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("no wallet configured, set MOMENTUM_PRIVATE_KEY to send transactions")]
    NoSigner,
    #[error("wrong network: connected to {actual_name} ({actual}), expected chain {expected}")]
    WrongNetwork {
        expected: u64,
        actual: u64,
        actual_name: String,
    },
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),
    #[error("transaction failed: {0}")]
    Pending(#[from] PendingTransactionError),
    #[error("transaction {0} reverted")]
    Reverted(B256),
    #[error(transparent)]
    Write(#[from] WriteError),
}

pub struct MomentumClient {
    provider: DynProvider,
    contracts: ContractSet,
    network: NetworkIdentity,
    signer: Option<Address>,
}

impl MomentumClient {
    /// Build a provider from config. A blank private key gives a read-only client.
    pub async fn connect(config: &Config) -> Result<Self, ClientError> {
        let contracts = ContractSet::from_config(&config.contracts)?;
        let network = NetworkIdentity::new(
            config.network.chain_id,
            &config.network.rpc_url,
            &config.network.explorer_url,
        );

        let key = config.wallet.private_key.trim();
        let (provider, signer) = if key.is_empty() {
            let provider = ProviderBuilder::new()
                .connect(&config.network.rpc_url)
                .await?
                .erased();
            (provider, None)
        } else {
            let local =
                PrivateKeySigner::from_str(key).map_err(|_| ClientError::InvalidPrivateKey)?;
            let address = local.address();
            let provider = ProviderBuilder::new()
                .wallet(EthereumWallet::from(local))
                .connect(&config.network.rpc_url)
                .await?
                .erased();
            (provider, Some(address))
        };

        if !is_on_hella(network.chain_id) {
            warn!(chain_id = network.chain_id, "configured chain is not HeLa testnet");
        }

        info!(
            rpc = %config.network.rpc_url,
            chain_id = network.chain_id,
            signer = ?signer,
            "momentum client ready"
        );

        Ok(Self {
            provider,
            contracts,
            network,
            signer,
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn contracts(&self) -> &ContractSet {
        &self.contracts
    }

    pub fn network(&self) -> &NetworkIdentity {
        &self.network
    }

    /// Address that signs writes, if a wallet is configured.
    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    pub async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.provider.get_chain_id().await?)
    }

    pub async fn network_check(&self) -> Result<NetworkCheck, ClientError> {
        Ok(self.network.check(self.chain_id().await?))
    }

    // --- token reads ---

    pub async fn token_balance(&self, owner: Address) -> Result<U256, ClientError> {
        let token = MockUSDC::new(self.contracts.token, self.provider.clone());
        Ok(token.balanceOf(owner).call().await?)
    }

    pub async fn token_allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ClientError> {
        let token = MockUSDC::new(self.contracts.token, self.provider.clone());
        Ok(token.allowance(owner, spender).call().await?)
    }

    pub async fn token_metadata(&self) -> Result<TokenMetadata, ClientError> {
        let token = MockUSDC::new(self.contracts.token, self.provider.clone());
        let (name, symbol, decimals) = futures::try_join!(
            async { token.name().call().await },
            async { token.symbol().call().await },
            async { token.decimals().call().await },
        )?;
        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
        })
    }

    // --- factory reads ---

    fn factory(&self) -> ContestFactory::ContestFactoryInstance<DynProvider> {
        ContestFactory::new(self.contracts.factory, self.provider.clone())
    }

    pub async fn all_contests(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.factory().getAllContests().call().await?)
    }

    pub async fn active_contests(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.factory().getActiveContests().call().await?)
    }

    pub async fn resolved_contests(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.factory().getResolvedContests().call().await?)
    }

    pub async fn contest_count(&self) -> Result<U256, ClientError> {
        Ok(self.factory().getContestCount().call().await?)
    }

    pub async fn contest_at(&self, index: U256) -> Result<Address, ClientError> {
        Ok(self.factory().getContest(index).call().await?)
    }

    pub async fn contest_batch(
        &self,
        start: U256,
        count: U256,
    ) -> Result<Vec<Address>, ClientError> {
        Ok(self.factory().getContestBatch(start, count).call().await?)
    }

    pub async fn is_valid_contest(&self, contest: Address) -> Result<bool, ClientError> {
        Ok(self.factory().isValidContest(contest).call().await?)
    }

    pub async fn factory_stats(&self) -> Result<FactoryStats, ClientError> {
        let stats = self.factory().getFactoryStats().call().await?;
        Ok(FactoryStats {
            total_contests: stats.totalContests,
            active_contests: stats.activeContests,
            resolved_contests: stats.resolvedContests,
            total_fees_collected: stats.totalFeesCollected,
        })
    }

    pub async fn platform_fee_balance(&self) -> Result<U256, ClientError> {
        Ok(self.factory().getPlatformFeeBalance().call().await?)
    }

    pub async fn factory_owner(&self) -> Result<Address, ClientError> {
        Ok(self.factory().owner().call().await?)
    }

    pub async fn contest_duration(&self) -> Result<U256, ClientError> {
        Ok(self.factory().CONTEST_DURATION().call().await?)
    }

    // --- contest reads ---

    /// Question, options, end time, resolution flag and pool totals in one
    /// round of concurrent calls. `winnerIsA` is only read once resolved.
    pub async fn contest_snapshot(&self, address: Address) -> Result<ContestSnapshot, ClientError> {
        let contest = Contest::new(address, self.provider.clone());
        let (question, option_a, option_b, end_time, is_resolved, total_a, total_b) = futures::try_join!(
            async { contest.question().call().await },
            async { contest.optionA_text().call().await },
            async { contest.optionB_text().call().await },
            async { contest.endTime().call().await },
            async { contest.isResolved().call().await },
            async { contest.totalStakedOnA().call().await },
            async { contest.totalStakedOnB().call().await },
        )?;

        let winner_is_a = if is_resolved {
            Some(contest.winnerIsA().call().await?)
        } else {
            None
        };

        Ok(ContestSnapshot {
            address,
            question,
            option_a,
            option_b,
            end_time: end_time.saturating_to(),
            is_resolved,
            winner_is_a,
            total_a,
            total_b,
        })
    }

    pub async fn user_stakes(&self, contest: Address, user: Address) -> Result<UserStakes, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        let stakes = contest.getUserStakes(user).call().await?;
        Ok(UserStakes {
            on_a: stakes.onA,
            on_b: stakes.onB,
            total: stakes.total,
        })
    }

    pub async fn has_claimed(&self, contest: Address, user: Address) -> Result<bool, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        Ok(contest.hasClaimed(user).call().await?)
    }

    pub async fn is_winner(&self, contest: Address, user: Address) -> Result<bool, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        Ok(contest.isWinner(user).call().await?)
    }

    pub async fn calculate_winnings(
        &self,
        contest: Address,
        user: Address,
    ) -> Result<U256, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        Ok(contest.calculateWinnings(user).call().await?)
    }

    pub async fn winning_option(&self, contest: Address) -> Result<WinningOption, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        let winner = contest.getWinningOption().call().await?;
        Ok(WinningOption {
            is_a: winner.isA,
            option_text: winner.optionText,
            total_staked: winner.totalStaked,
        })
    }

    /// Stakes and claim flag always; winner and payout only once resolved,
    /// since the contract reverts on those before resolution.
    pub async fn user_position(
        &self,
        contest: Address,
        user: Address,
        is_resolved: bool,
    ) -> Result<UserPosition, ClientError> {
        let (stakes, has_claimed) = futures::try_join!(
            self.user_stakes(contest, user),
            self.has_claimed(contest, user),
        )?;
        let (is_winner, winnings) = if is_resolved {
            futures::try_join!(
                self.is_winner(contest, user),
                self.calculate_winnings(contest, user),
            )?
        } else {
            (false, U256::ZERO)
        };
        Ok(UserPosition {
            stakes,
            has_claimed,
            is_winner,
            winnings,
        })
    }

    // --- writes ---

    /// A write needs a signer and the configured chain.
    pub async fn ensure_writable(&self) -> Result<Address, ClientError> {
        let signer = self.signer.ok_or(ClientError::NoSigner)?;
        let actual = self.chain_id().await?;
        match self.network.check(actual) {
            NetworkCheck::Correct => Ok(signer),
            NetworkCheck::WrongNetwork { expected, actual } => Err(ClientError::WrongNetwork {
                expected,
                actual,
                actual_name: network_name(actual),
            }),
        }
    }

    /// Mint `FAUCET_AMOUNT` test tokens to the signer.
    pub async fn faucet(&self, tracker: &WriteTracker) -> Result<B256, ClientError> {
        let token = MockUSDC::new(self.contracts.token, self.provider.clone());
        self.submit(tracker, token.faucet().into_transaction_request())
            .await
    }

    /// Approve `spender` (a contest) to pull `amount` tokens.
    pub async fn approve(
        &self,
        tracker: &WriteTracker,
        spender: Address,
        amount: U256,
    ) -> Result<B256, ClientError> {
        let token = MockUSDC::new(self.contracts.token, self.provider.clone());
        self.submit(
            tracker,
            token.approve(spender, amount).into_transaction_request(),
        )
        .await
    }

    pub async fn stake(
        &self,
        tracker: &WriteTracker,
        contest: Address,
        side: Side,
        amount: U256,
    ) -> Result<B256, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        self.submit(
            tracker,
            contest.stake(side.is_a(), amount).into_transaction_request(),
        )
        .await
    }

    pub async fn claim(&self, tracker: &WriteTracker, contest: Address) -> Result<B256, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        self.submit(tracker, contest.claim().into_transaction_request())
            .await
    }

    /// Owner only. The contract rejects anyone else; the UI hides the form.
    pub async fn create_contest(
        &self,
        tracker: &WriteTracker,
        question: &str,
        option_a: &str,
        option_b: &str,
    ) -> Result<B256, ClientError> {
        let factory = self.factory();
        let call = factory.createContest(
            question.to_string(),
            option_a.to_string(),
            option_b.to_string(),
        );
        self.submit(tracker, call.into_transaction_request()).await
    }

    /// Anyone may resolve once the contest has ended; the contract enforces timing.
    pub async fn resolve(&self, tracker: &WriteTracker, contest: Address) -> Result<B256, ClientError> {
        let contest = Contest::new(contest, self.provider.clone());
        self.submit(tracker, contest.resolve().into_transaction_request())
            .await
    }

    pub async fn withdraw_platform_fees(&self, tracker: &WriteTracker) -> Result<B256, ClientError> {
        let factory = self.factory();
        let call = factory.withdrawPlatformFees();
        self.submit(tracker, call.into_transaction_request()).await
    }

    async fn submit(
        &self,
        tracker: &WriteTracker,
        tx: TransactionRequest,
    ) -> Result<B256, ClientError> {
        tracker.begin()?;
        let kind = tracker.kind();
        let from = match self.ensure_writable().await {
            Ok(from) => from,
            Err(e) => {
                warn!(kind = %kind, error = %e, "write blocked");
                tracker.fail(None, e.to_string());
                return Err(e);
            }
        };

        let pending = match self.provider.send_transaction(tx.from(from)).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(kind = %kind, error = %e, "transaction rejected before submission");
                tracker.fail(None, e.to_string());
                return Err(e.into());
            }
        };

        let tx_hash = *pending.tx_hash();
        tracker.submitted(tx_hash);
        info!(kind = %kind, tx = %tx_hash, url = %self.network.tx_url(tx_hash), "transaction submitted");

        match pending.get_receipt().await {
            Ok(receipt) if receipt.status() => {
                info!(kind = %kind, tx = %tx_hash, block = ?receipt.block_number, "transaction confirmed");
                tracker.confirmed(tx_hash, receipt.block_number);
                Ok(tx_hash)
            }
            Ok(_) => {
                warn!(kind = %kind, tx = %tx_hash, "transaction reverted");
                tracker.fail(Some(tx_hash), "transaction reverted");
                Err(ClientError::Reverted(tx_hash))
            }
            Err(e) => {
                warn!(kind = %kind, tx = %tx_hash, error = %e, "waiting for receipt failed");
                tracker.fail(Some(tx_hash), e.to_string());
                Err(e.into())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{self, DEV_ADDRESS, DEV_KEY};
    use super::*;

    #[tokio::test]
    async fn test_read_only_client_cannot_write() {
        let client = testing::client(666_888, None).await;
        assert_eq!(client.signer(), None);
        assert!(matches!(
            client.ensure_writable().await,
            Err(ClientError::NoSigner)
        ));
    }

    #[tokio::test]
    async fn test_wrong_chain_blocks_writes() {
        let client = testing::client(1, Some(DEV_KEY)).await;
        match client.ensure_writable().await {
            Err(ClientError::WrongNetwork {
                expected,
                actual,
                actual_name,
            }) => {
                assert_eq!(expected, 666_888);
                assert_eq!(actual, 1);
                assert_eq!(actual_name, "Ethereum Mainnet");
            }
            other => panic!("expected WrongNetwork, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocked_write_fails_its_tracker() {
        let client = testing::client(1, Some(DEV_KEY)).await;
        let tracker = WriteTracker::new(WriteKind::Faucet);
        let err = client.faucet(&tracker).await.unwrap_err();
        assert!(matches!(err, ClientError::WrongNetwork { .. }));
        let view = tracker.status().to_view(WriteKind::Faucet);
        assert_eq!(view.state, "failed");
        assert!(view.message.unwrap().starts_with("wrong network"));
    }

    #[tokio::test]
    async fn test_correct_chain_is_writable() {
        let client = testing::client(666_888, Some(DEV_KEY)).await;
        let signer = client.ensure_writable().await.unwrap();
        assert_eq!(signer, DEV_ADDRESS.parse::<Address>().unwrap());
        assert_eq!(client.network_check().await.unwrap(), NetworkCheck::Correct);
    }

    #[tokio::test]
    async fn test_bad_key_rejected() {
        let config = testing::config("http://127.0.0.1:1", Some("0xnot-a-key"));
        assert!(matches!(
            MomentumClient::connect(&config).await,
            Err(ClientError::InvalidPrivateKey)
        ));
    }
}
