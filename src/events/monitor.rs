//! Contest event poller.
//!
//! Polls `eth_getLogs` over HTTP for the factory and every cached contest,
//! decodes the Momentum events and emits typed `ContestSignal`s via a tokio
//! channel. Forward-only: the first round records the head block and later
//! rounds scan from there, at most `MAX_BLOCK_RANGE` blocks at a time.

use crate::cache::ContestCache;
use crate::client::Side;
use crate::contracts::abi::{self, Contest, ContestFactory};
use crate::events::types::ContestSignal;

use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use alloy::transports::TransportError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Upper bound on blocks per `eth_getLogs` call. Public RPCs reject wider ranges.
pub const MAX_BLOCK_RANGE: u64 = 2_000;

pub struct ContestEventMonitor {
    provider: DynProvider,
    factory: Address,
    cache: ContestCache,
    signal_tx: mpsc::UnboundedSender<ContestSignal>,
    interval: Duration,
    /// Last block whose logs have been delivered. 0 until the first round.
    last_block: Arc<AtomicU64>,
}

impl ContestEventMonitor {
    pub fn new(
        provider: DynProvider,
        factory: Address,
        cache: ContestCache,
        signal_tx: mpsc::UnboundedSender<ContestSignal>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            factory,
            cache,
            signal_tx,
            interval,
            last_block: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the poller in a background task. Returns immediately.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_forever().await;
        })
    }

    pub fn last_block(&self) -> u64 {
        self.last_block.load(Ordering::SeqCst)
    }

    async fn run_forever(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(0) => {}
                Ok(n) => debug!(events = n, block = self.last_block(), "contest events delivered"),
                Err(e) => {
                    warn!(error = %e, "contest event poll failed");
                    let _ = self.signal_tx.send(ContestSignal::PollFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// One polling round. Returns the number of signals emitted.
    pub async fn poll_once(&self) -> Result<usize, TransportError> {
        let head = self.provider.get_block_number().await?;
        let last = self.last_block();
        if last == 0 {
            self.last_block.store(head, Ordering::SeqCst);
            info!(block = head, "watching contest events from current block");
            return Ok(0);
        }

        let Some((from, to)) = next_range(last, head) else {
            return Ok(0);
        };

        let logs = self.provider.get_logs(&self.build_filter(from, to)).await?;
        let mut emitted = 0;
        for log in &logs {
            match decode_log(log) {
                Some(signal) => {
                    info!(signal = %signal, block = log.block_number, "contest event");
                    let _ = self.signal_tx.send(signal);
                    emitted += 1;
                }
                None => debug!(topic = ?log.topic0(), "unrecognised event topic"),
            }
        }

        self.last_block.store(to, Ordering::SeqCst);
        Ok(emitted)
    }

    /// Filter covering the factory plus every known contest.
    fn build_filter(&self, from: u64, to: u64) -> Filter {
        let mut addresses = self.cache.addresses();
        addresses.push(self.factory);

        let mut topics = abi::contest_event_topics();
        topics.push(ContestFactory::ContestCreated::SIGNATURE_HASH);

        Filter::new()
            .address(addresses)
            .event_signature(topics)
            .from_block(from)
            .to_block(to)
    }
}

/// Next inclusive block range to scan after `last`, capped at `MAX_BLOCK_RANGE`.
pub fn next_range(last: u64, head: u64) -> Option<(u64, u64)> {
    if head <= last {
        return None;
    }
    let from = last + 1;
    let to = head.min(from + MAX_BLOCK_RANGE - 1);
    Some((from, to))
}

/// Decode one log into a signal. Unknown topics and malformed data give `None`.
pub fn decode_log(log: &Log) -> Option<ContestSignal> {
    let topic0: B256 = *log.topic0()?;
    let block_number = log.block_number.unwrap_or(0);
    let contest = log.address();

    match topic0 {
        t if t == Contest::Staked::SIGNATURE_HASH => {
            let ev = log.log_decode::<Contest::Staked>().ok()?.inner.data;
            Some(ContestSignal::Staked {
                contest,
                user: ev.user,
                side: Side::from_is_a(ev.forA),
                amount: ev.amount,
                timestamp: ev.timestamp.saturating_to(),
                block_number,
            })
        }
        t if t == Contest::ContestResolved::SIGNATURE_HASH => {
            let ev = log.log_decode::<Contest::ContestResolved>().ok()?.inner.data;
            Some(ContestSignal::Resolved {
                contest,
                winner: Side::from_is_a(ev.winnerIsA),
                total_a: ev.totalA,
                total_b: ev.totalB,
                platform_fee: ev.platformFee,
                timestamp: ev.timestamp.saturating_to(),
                block_number,
            })
        }
        t if t == Contest::WinningsClaimed::SIGNATURE_HASH => {
            let ev = log.log_decode::<Contest::WinningsClaimed>().ok()?.inner.data;
            Some(ContestSignal::WinningsClaimed {
                contest,
                user: ev.user,
                amount: ev.amount,
                timestamp: ev.timestamp.saturating_to(),
                block_number,
            })
        }
        t if t == ContestFactory::ContestCreated::SIGNATURE_HASH => {
            let ev = log
                .log_decode::<ContestFactory::ContestCreated>()
                .ok()?
                .inner
                .data;
            Some(ContestSignal::ContestCreated {
                contest: ev.contestAddress,
                question: ev.question,
                end_time: ev.endTime.saturating_to(),
                creator: ev.creator,
                block_number,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn rpc_log<E: SolEvent>(emitter: Address, event: &E, block: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: emitter,
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            ..Default::default()
        }
    }

    #[test]
    fn test_next_range() {
        assert_eq!(next_range(100, 100), None);
        assert_eq!(next_range(100, 90), None);
        assert_eq!(next_range(100, 105), Some((101, 105)));
        assert_eq!(next_range(0, 10_000), Some((1, MAX_BLOCK_RANGE)));
    }

    #[test]
    fn test_decode_staked() {
        let contest = Address::repeat_byte(0xc0);
        let user = Address::repeat_byte(0x11);
        let log = rpc_log(
            contest,
            &Contest::Staked {
                user,
                forA: false,
                amount: U256::from(5_000_000u64),
                timestamp: U256::from(1_700_000_000u64),
            },
            42,
        );
        assert_eq!(
            decode_log(&log),
            Some(ContestSignal::Staked {
                contest,
                user,
                side: Side::B,
                amount: U256::from(5_000_000u64),
                timestamp: 1_700_000_000,
                block_number: 42,
            })
        );
    }

    #[test]
    fn test_decode_resolved() {
        let contest = Address::repeat_byte(0xc1);
        let log = rpc_log(
            contest,
            &Contest::ContestResolved {
                winnerIsA: true,
                totalA: U256::from(100u64),
                totalB: U256::from(50u64),
                platformFee: U256::from(3u64),
                timestamp: U256::from(9u64),
            },
            7,
        );
        let signal = decode_log(&log).unwrap();
        assert_eq!(signal.contest(), Some(contest));
        assert!(matches!(signal, ContestSignal::Resolved { winner: Side::A, .. }));
        // resolution touches every staker
        assert!(signal.involves(Address::repeat_byte(0x99)));
    }

    #[test]
    fn test_decode_contest_created() {
        let factory = Address::repeat_byte(0xfa);
        let new_contest = Address::repeat_byte(0x22);
        let log = rpc_log(
            factory,
            &ContestFactory::ContestCreated {
                contestAddress: new_contest,
                question: "Will BTC close above $100k today?".into(),
                optionA: "Yes".into(),
                optionB: "No".into(),
                endTime: U256::from(86_400u64),
                creator: Address::repeat_byte(0x01),
            },
            3,
        );
        match decode_log(&log) {
            Some(ContestSignal::ContestCreated { contest, end_time, .. }) => {
                assert_eq!(contest, new_contest);
                assert_eq!(end_time, 86_400);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_claim_involves_only_claimer() {
        let user = Address::repeat_byte(0x11);
        let log = rpc_log(
            Address::repeat_byte(0xc2),
            &Contest::WinningsClaimed {
                user,
                amount: U256::from(1u64),
                timestamp: U256::ZERO,
            },
            1,
        );
        let signal = decode_log(&log).unwrap();
        assert!(signal.involves(user));
        assert!(!signal.involves(Address::repeat_byte(0x12)));
    }

    #[test]
    fn test_unknown_topic_is_ignored() {
        let log = Log::default();
        assert_eq!(decode_log(&log), None);
    }
}
