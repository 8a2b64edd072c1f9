//! Long-running client session: polled reads, the contest cache, write
//! tracking and the reactions to contract events.
//!
//! Shared behind an `Arc` by the event loop in `main.rs` and the dashboard.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::ContestCache;
use crate::client::{
    ClientError, FactoryStats, MomentumClient, PolledRead, ReadState, UserPosition, WriteError,
    WriteKind, WriteTrackers,
};
use crate::config::Config;
use crate::events::{ContestEventMonitor, ContestSignal};
use crate::network::NetworkCheck;
use crate::view::{admin_access, unix_now, AdminAccess};

/// Per-contest reads nobody asked for in this long are dropped, which
/// stops their timers.
pub const WATCH_IDLE: Duration = Duration::from_secs(60);

/// A per-contest read plus when it was last asked for.
struct WatchedRead<T> {
    read: PolledRead<T>,
    last_seen: Instant,
}

impl<T: Clone + Send + Sync + 'static> WatchedRead<T> {
    fn new(read: PolledRead<T>) -> Self {
        Self {
            read,
            last_seen: Instant::now(),
        }
    }

    fn touch(&mut self) -> ReadState<T> {
        self.last_seen = Instant::now();
        self.read.state()
    }
}

pub struct Session {
    config: Config,
    pub client: Arc<MomentumClient>,
    pub cache: ContestCache,
    pub writes: WriteTrackers,
    pub contests: PolledRead<Vec<Address>>,
    pub active: PolledRead<Vec<Address>>,
    pub stats: PolledRead<FactoryStats>,
    pub fee_balance: PolledRead<U256>,
    pub balance: PolledRead<U256>,
    pub network: PolledRead<NetworkCheck>,
    /// Opened lazily per known contest, pruned after `WATCH_IDLE`.
    allowances: DashMap<Address, WatchedRead<U256>>,
    positions: DashMap<Address, WatchedRead<UserPosition>>,
}

fn poll<T, F, Fut>(
    client: &Arc<MomentumClient>,
    label: &'static str,
    every: Duration,
    fetch: F,
) -> PolledRead<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Arc<MomentumClient>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let client = client.clone();
    PolledRead::spawn(label, every, move || fetch(client.clone()))
}

impl Session {
    /// Spawn every session-wide polled read. Must run inside a tokio runtime.
    pub fn start(config: Config, client: MomentumClient) -> Arc<Self> {
        let client = Arc::new(client);
        let polling = config.polling.clone();

        let contests = poll(&client, "all_contests", polling.all_contests(), |c| async move {
            c.all_contests().await
        });
        let active = poll(&client, "active_contests", polling.active_contests(), |c| async move {
            c.active_contests().await
        });
        let stats = poll(&client, "factory_stats", polling.stats(), |c| async move {
            c.factory_stats().await
        });
        let fee_balance = poll(&client, "platform_fees", polling.stats(), |c| async move {
            c.platform_fee_balance().await
        });
        let network = poll(&client, "network", polling.stats(), |c| async move {
            c.network_check().await
        });
        let balance = PolledRead::spawn_with(
            "balance",
            polling.balance(),
            client.signer().map(|owner| (client.clone(), owner)),
            |(c, owner): (Arc<MomentumClient>, Address)| async move { c.token_balance(owner).await },
        );

        if client.signer().is_none() {
            info!("no wallet configured, account reads and writes disabled");
        }

        Arc::new(Self {
            config,
            client,
            cache: ContestCache::new(),
            writes: WriteTrackers::default(),
            contests,
            active,
            stats,
            fee_balance,
            balance,
            network,
            allowances: DashMap::new(),
            positions: DashMap::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connected account, if a wallet is configured.
    pub fn account(&self) -> Option<Address> {
        self.client.signer()
    }

    pub fn admin_access(&self) -> AdminAccess {
        admin_access(self.account(), self.client.contracts().admin)
    }

    /// Token allowance from the account to `contest`, polled while requested.
    /// `Disabled` without a wallet or for a contest the cache does not know.
    pub fn allowance(&self, contest: Address) -> ReadState<U256> {
        let Some(owner) = self.account() else {
            return ReadState::Disabled;
        };
        if !self.cache.contains(&contest) {
            return ReadState::Disabled;
        }
        self.allowances
            .entry(contest)
            .or_insert_with(|| {
                WatchedRead::new(poll(
                    &self.client,
                    "allowance",
                    self.config.polling.allowance(),
                    move |c| async move { c.token_allowance(owner, contest).await },
                ))
            })
            .touch()
    }

    /// The account's position in `contest`, polled at the resolution cadence
    /// so a claim button shows up soon after settlement.
    pub fn position(&self, contest: Address) -> ReadState<UserPosition> {
        let Some(user) = self.account() else {
            return ReadState::Disabled;
        };
        if !self.cache.contains(&contest) {
            return ReadState::Disabled;
        }
        self.positions
            .entry(contest)
            .or_insert_with(|| {
                let cache = self.cache.clone();
                WatchedRead::new(poll(
                    &self.client,
                    "position",
                    self.config.polling.resolution(),
                    move |c| {
                        let resolved = cache.get(&contest).map(|s| s.is_resolved).unwrap_or(false);
                        async move { c.user_position(contest, user, resolved).await }
                    },
                ))
            })
            .touch()
    }

    /// Number of live per-contest reads.
    pub fn watched_reads(&self) -> usize {
        self.allowances.len() + self.positions.len()
    }

    /// Drop per-contest reads not asked for within `max_idle`. Returns how many.
    pub fn prune_idle_reads(&self, max_idle: Duration) -> usize {
        let before = self.watched_reads();
        self.allowances.retain(|_, w| w.last_seen.elapsed() < max_idle);
        self.positions.retain(|_, w| w.last_seen.elapsed() < max_idle);
        let pruned = before - self.watched_reads();
        if pruned > 0 {
            debug!(pruned, "dropped idle contest reads");
        }
        pruned
    }

    fn invalidate_contest_reads(&self, contest: Address) {
        if let Some(w) = self.allowances.get(&contest) {
            w.read.invalidate();
        }
        if let Some(w) = self.positions.get(&contest) {
            w.read.invalidate();
        }
    }

    /// One sync round over the listed contests. Returns how many were fetched.
    pub async fn sync_contests(&self) -> usize {
        let listed = match self.contests.state() {
            ReadState::Ready(list) => list,
            _ => return 0,
        };
        let due = self
            .cache
            .due_for_refresh(&listed, unix_now(), self.config.polling.pool());
        self.cache.refresh_many(&self.client, &due).await
    }

    /// Start the contest sync loop and the event poller. Signals arrive on the
    /// returned receiver; feed them back through [`Session::handle_signal`].
    pub fn spawn_background(
        self: &Arc<Self>,
    ) -> (Vec<JoinHandle<()>>, mpsc::UnboundedReceiver<ContestSignal>) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel::<ContestSignal>();

        let monitor = ContestEventMonitor::new(
            self.client.provider().clone(),
            self.client.contracts().factory,
            self.cache.clone(),
            signal_tx,
            self.config.polling.events(),
        );

        let session = self.clone();
        let sync = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(session.config.polling.resolution());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                session.prune_idle_reads(WATCH_IDLE);
                let n = session.sync_contests().await;
                if n > 0 {
                    debug!(refreshed = n, cached = session.cache.len(), "contest sync");
                }
            }
        });

        (vec![sync, monitor.start()], signal_rx)
    }

    /// React to one contract event: refresh the contest it names and
    /// invalidate whatever reads it made stale.
    pub async fn handle_signal(&self, signal: &ContestSignal) {
        match signal {
            ContestSignal::PollFailed { .. } => return,
            ContestSignal::ContestCreated { .. } => {
                self.contests.invalidate();
                self.active.invalidate();
                self.stats.invalidate();
            }
            ContestSignal::Resolved { .. } => {
                self.active.invalidate();
                self.stats.invalidate();
                self.fee_balance.invalidate();
            }
            ContestSignal::Staked { .. } | ContestSignal::WinningsClaimed { .. } => {}
        }

        if let Some(user) = self.account() {
            if signal.involves(user) {
                self.balance.invalidate();
            }
        }

        if let Some(contest) = signal.contest() {
            self.invalidate_contest_reads(contest);
            if let Err(e) = self.cache.refresh(&self.client, contest).await {
                warn!(contest = %contest, error = %e, "refresh after event failed");
            }
        }
    }

    /// Reads to refetch once a write of `kind` confirms.
    async fn after_write(&self, kind: WriteKind, contest: Option<Address>) {
        match kind {
            WriteKind::Faucet => self.balance.invalidate(),
            WriteKind::Approve => {}
            WriteKind::Stake | WriteKind::Claim => self.balance.invalidate(),
            WriteKind::CreateContest => {
                self.contests.invalidate();
                self.active.invalidate();
                self.stats.invalidate();
            }
            WriteKind::Resolve => {
                self.active.invalidate();
                self.stats.invalidate();
                self.fee_balance.invalidate();
            }
            WriteKind::WithdrawFees => self.fee_balance.invalidate(),
        }
        if let Some(contest) = contest {
            self.invalidate_contest_reads(contest);
            if matches!(kind, WriteKind::Stake | WriteKind::Resolve) {
                if let Err(e) = self.cache.refresh(&self.client, contest).await {
                    warn!(contest = %contest, error = %e, "refresh after write failed");
                }
            }
        }
    }

    /// Run a write in the background. Refused up front while the same kind
    /// is already in flight, or when there is no signer or the chain is wrong;
    /// a refusal is also recorded on the tracker. Progress is observable
    /// through `self.writes`.
    pub async fn spawn_write<F, Fut>(
        self: &Arc<Self>,
        kind: WriteKind,
        contest: Option<Address>,
        op: F,
    ) -> Result<(), ClientError>
    where
        F: FnOnce(Arc<Session>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<alloy::primitives::B256, ClientError>> + Send + 'static,
    {
        let tracker = self.writes.get(kind);
        if tracker.status().is_in_flight() {
            return Err(WriteError::InFlight(kind).into());
        }
        if let Err(e) = self.client.ensure_writable().await {
            warn!(kind = %kind, error = %e, "write refused");
            // losing a race with another attempt of the same kind is fine here
            let _ = tracker.reject(e.to_string());
            return Err(e);
        }
        let session = self.clone();
        tokio::spawn(async move {
            match op(session.clone()).await {
                Ok(tx_hash) => {
                    info!(kind = %kind, tx = %tx_hash, "write confirmed");
                    session.after_write(kind, contest).await;
                }
                Err(e) => warn!(kind = %kind, error = %e, "write failed"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{self, DEV_KEY};
    use crate::client::{ContestSnapshot, Side};
    use tokio::time::timeout;

    async fn session(chain_id: u64, key: Option<&str>) -> Arc<Session> {
        let url = testing::mock_node(chain_id).await;
        let config = testing::config(&url, key);
        let client = MomentumClient::connect(&config).await.unwrap();
        Session::start(config, client)
    }

    fn known_contest(session: &Session, byte: u8) -> Address {
        let address = Address::repeat_byte(byte);
        session.cache.insert(ContestSnapshot {
            address,
            question: "Will it rain in Lisbon tomorrow?".into(),
            option_a: "Yes".into(),
            option_b: "Nope".into(),
            end_time: unix_now() + 3_600,
            is_resolved: false,
            winner_is_a: None,
            total_a: U256::ZERO,
            total_b: U256::ZERO,
        });
        address
    }

    fn faucet(s: Arc<Session>) -> impl Future<Output = Result<alloy::primitives::B256, ClientError>> {
        async move { s.client.faucet(s.writes.get(WriteKind::Faucet)).await }
    }

    #[tokio::test]
    async fn test_wrong_network_write_is_refused_and_recorded() {
        let session = session(1, Some(DEV_KEY)).await;
        let result = session.spawn_write(WriteKind::Faucet, None, faucet).await;
        assert!(matches!(
            result,
            Err(ClientError::WrongNetwork {
                expected: 666_888,
                actual: 1,
                ..
            })
        ));

        let view = session.writes.get(WriteKind::Faucet).status().to_view(WriteKind::Faucet);
        assert_eq!(view.state, "failed");
        assert!(view.message.unwrap().contains("wrong network"));
    }

    #[tokio::test]
    async fn test_write_without_wallet_is_refused() {
        let session = session(666_888, None).await;
        let result = session.spawn_write(WriteKind::Faucet, None, faucet).await;
        assert!(matches!(result, Err(ClientError::NoSigner)));
        assert_eq!(session.writes.get(WriteKind::Faucet).status().label(), "failed");
    }

    #[tokio::test]
    async fn test_contest_reads_only_for_known_contests() {
        let session = session(666_888, Some(DEV_KEY)).await;
        for byte in 1..=50u8 {
            assert_eq!(session.allowance(Address::repeat_byte(byte)), ReadState::Disabled);
            assert_eq!(session.position(Address::repeat_byte(byte)), ReadState::Disabled);
        }
        assert_eq!(session.watched_reads(), 0);

        let contest = known_contest(&session, 0xaa);
        assert_ne!(session.allowance(contest), ReadState::Disabled);
        assert_ne!(session.position(contest), ReadState::Disabled);
        assert_eq!(session.watched_reads(), 2);
    }

    #[tokio::test]
    async fn test_idle_contest_reads_are_pruned() {
        let session = session(666_888, Some(DEV_KEY)).await;
        for byte in 1..=3u8 {
            let contest = known_contest(&session, byte);
            session.allowance(contest);
            session.position(contest);
        }
        assert_eq!(session.watched_reads(), 6);

        assert_eq!(session.prune_idle_reads(Duration::from_secs(3_600)), 0);
        assert_eq!(session.prune_idle_reads(Duration::ZERO), 6);
        assert_eq!(session.watched_reads(), 0);
    }

    #[tokio::test]
    async fn test_no_wallet_means_no_contest_reads() {
        let session = session(666_888, None).await;
        let contest = known_contest(&session, 7);
        assert_eq!(session.allowance(contest), ReadState::Disabled);
        assert_eq!(session.position(contest), ReadState::Disabled);
        assert_eq!(session.balance.state(), ReadState::Disabled);
    }

    async fn settled<T: Clone>(rx: &mut tokio::sync::watch::Receiver<ReadState<T>>) {
        while rx.borrow_and_update().is_loading() {
            timeout(Duration::from_secs(5), rx.changed())
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_contest_created_refetches_contest_list() {
        let session = session(666_888, None).await;
        let mut rx = session.contests.subscribe();
        settled(&mut rx).await;

        // unrelated event: the 30s list poll stays quiet
        let staked = ContestSignal::Staked {
            contest: Address::repeat_byte(9),
            user: Address::repeat_byte(1),
            side: Side::A,
            amount: U256::from(1_000_000u64),
            timestamp: 0,
            block_number: 1,
        };
        session.handle_signal(&staked).await;
        assert!(timeout(Duration::from_millis(500), rx.changed()).await.is_err());

        let created = ContestSignal::ContestCreated {
            contest: Address::repeat_byte(2),
            question: "Will BTC close above 100k?".into(),
            end_time: 0,
            creator: Address::repeat_byte(3),
            block_number: 2,
        };
        session.handle_signal(&created).await;
        timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("contest list refetched after ContestCreated")
            .unwrap();
    }

    #[tokio::test]
    async fn test_poll_failure_signal_is_ignored() {
        let session = session(666_888, None).await;
        let mut rx = session.stats.subscribe();
        settled(&mut rx).await;
        session
            .handle_signal(&ContestSignal::PollFailed {
                reason: "timeout".into(),
            })
            .await;
        assert!(timeout(Duration::from_millis(500), rx.changed()).await.is_err());
    }
}
