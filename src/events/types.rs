//! Signals emitted by the contest event poller.

use alloy::primitives::{Address, U256};

use crate::client::Side;

/// Decoded contract events, consumed by the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContestSignal {
    /// Someone staked on a contest. Pool totals changed.
    Staked {
        contest: Address,
        user: Address,
        side: Side,
        amount: U256,
        timestamp: u64,
        block_number: u64,
    },

    /// A contest was settled. Winner, claimability and factory stats changed.
    Resolved {
        contest: Address,
        winner: Side,
        total_a: U256,
        total_b: U256,
        platform_fee: U256,
        timestamp: u64,
        block_number: u64,
    },

    WinningsClaimed {
        contest: Address,
        user: Address,
        amount: U256,
        timestamp: u64,
        block_number: u64,
    },

    /// The factory deployed a new contest.
    ContestCreated {
        contest: Address,
        question: String,
        end_time: u64,
        creator: Address,
        block_number: u64,
    },

    /// One `eth_getLogs` round failed; the next round retries the same range.
    PollFailed { reason: String },
}

impl ContestSignal {
    /// The contest whose cached snapshot this signal makes stale.
    pub fn contest(&self) -> Option<Address> {
        match self {
            Self::Staked { contest, .. }
            | Self::Resolved { contest, .. }
            | Self::WinningsClaimed { contest, .. }
            | Self::ContestCreated { contest, .. } => Some(*contest),
            Self::PollFailed { .. } => None,
        }
    }

    /// Whether the signal concerns `user`'s own balance or position.
    pub fn involves(&self, user: Address) -> bool {
        match self {
            Self::Staked { user: u, .. } | Self::WinningsClaimed { user: u, .. } => *u == user,
            // every staker's claimability changes
            Self::Resolved { .. } => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ContestSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staked { contest, side, amount, .. } => {
                write!(f, "Staked(contest={contest}, side={side}, amount={amount})")
            }
            Self::Resolved { contest, winner, .. } => {
                write!(f, "Resolved(contest={contest}, winner={winner})")
            }
            Self::WinningsClaimed { contest, amount, .. } => {
                write!(f, "WinningsClaimed(contest={contest}, amount={amount})")
            }
            Self::ContestCreated { contest, .. } => write!(f, "ContestCreated({contest})"),
            Self::PollFailed { reason } => write!(f, "PollFailed({reason})"),
        }
    }
}
