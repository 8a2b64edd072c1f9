//! Contest snapshot cache: contest address ↔ last known on-chain state.
//!
//! Filled by the sync loop and by event invalidation. Resolved contests are
//! immutable on-chain, so once cached they are never refetched on a timer.

use alloy::primitives::Address;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::client::{ClientError, ContestSnapshot, MomentumClient};
use crate::view::{contest_status, ContestStatus, ContestView};

#[derive(Debug, Clone)]
pub struct CachedContest {
    pub snapshot: ContestSnapshot,
    pub refreshed_at: Instant,
}

/// Thread-safe contest cache.
#[derive(Clone, Default)]
pub struct ContestCache {
    by_address: Arc<DashMap<Address, CachedContest>>,
}

impl ContestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<ContestSnapshot> {
        self.by_address.get(address).map(|e| e.snapshot.clone())
    }

    pub fn insert(&self, snapshot: ContestSnapshot) {
        self.by_address.insert(
            snapshot.address,
            CachedContest {
                snapshot,
                refreshed_at: Instant::now(),
            },
        );
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.by_address.contains_key(address)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.by_address.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// All cached contests, soonest-ending live contests first, then ended
    /// and resolved ones by most recent end time.
    pub fn views(&self, now: u64) -> Vec<ContestView> {
        let mut snapshots: Vec<ContestSnapshot> =
            self.by_address.iter().map(|e| e.snapshot.clone()).collect();
        snapshots.sort_by(|a, b| {
            let a_live = contest_status(a.is_resolved, a.end_time, now) == ContestStatus::Active;
            let b_live = contest_status(b.is_resolved, b.end_time, now) == ContestStatus::Active;
            b_live.cmp(&a_live).then_with(|| {
                if a_live {
                    a.end_time.cmp(&b.end_time)
                } else {
                    b.end_time.cmp(&a.end_time)
                }
            })
        });
        snapshots.iter().map(|s| ContestView::derive(s, now)).collect()
    }

    /// Which of `listed` need a fetch right now: anything not cached yet,
    /// anything ended but still awaiting resolution, and unresolved entries
    /// older than `max_age`.
    pub fn due_for_refresh(&self, listed: &[Address], now: u64, max_age: Duration) -> Vec<Address> {
        listed
            .iter()
            .filter(|address| match self.by_address.get(*address) {
                None => true,
                Some(entry) => {
                    let snap = &entry.snapshot;
                    match contest_status(snap.is_resolved, snap.end_time, now) {
                        ContestStatus::Resolved => false,
                        ContestStatus::Ended => true,
                        ContestStatus::Active => entry.refreshed_at.elapsed() >= max_age,
                    }
                }
            })
            .copied()
            .collect()
    }

    pub async fn refresh(
        &self,
        client: &MomentumClient,
        address: Address,
    ) -> Result<ContestSnapshot, ClientError> {
        let snapshot = client.contest_snapshot(address).await?;
        if let Some(prev) = self.get(&address) {
            if !prev.is_resolved && snapshot.is_resolved {
                info!(
                    contest = %address,
                    winner = ?snapshot.winning_side(),
                    "contest resolved"
                );
            }
        }
        self.insert(snapshot.clone());
        Ok(snapshot)
    }

    /// Refresh many contests concurrently. A failed fetch keeps the stale
    /// entry. Returns the number of successful refreshes.
    pub async fn refresh_many(&self, client: &MomentumClient, addresses: &[Address]) -> usize {
        if addresses.is_empty() {
            return 0;
        }
        let results = join_all(addresses.iter().map(|a| self.refresh(client, *a))).await;
        let mut ok = 0;
        for (address, result) in addresses.iter().zip(results) {
            match result {
                Ok(_) => ok += 1,
                Err(e) => warn!(contest = %address, error = %e, "contest refresh failed"),
            }
        }
        debug!(requested = addresses.len(), refreshed = ok, "contest cache refreshed");
        ok
    }
}
