//! Write status tracking.
//!
//! Every state-changing call moves one [`WriteTracker`] through
//! `Idle → PendingSignature → Submitted → Confirmed | Failed`. The tracker
//! never moves backwards and never restarts on its own: after a failure the
//! caller has to begin a new attempt explicitly.

use alloy::primitives::B256;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    Faucet,
    Approve,
    Stake,
    Claim,
    CreateContest,
    Resolve,
    WithdrawFees,
}

impl WriteKind {
    pub const ALL: [WriteKind; 7] = [
        WriteKind::Faucet,
        WriteKind::Approve,
        WriteKind::Stake,
        WriteKind::Claim,
        WriteKind::CreateContest,
        WriteKind::Resolve,
        WriteKind::WithdrawFees,
    ];
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteKind::Faucet => "faucet",
            WriteKind::Approve => "approve",
            WriteKind::Stake => "stake",
            WriteKind::Claim => "claim",
            WriteKind::CreateContest => "create_contest",
            WriteKind::Resolve => "resolve",
            WriteKind::WithdrawFees => "withdraw_fees",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("a {0} transaction is already in flight")]
    InFlight(WriteKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Idle,
    PendingSignature,
    Submitted {
        tx_hash: B256,
    },
    Confirmed {
        tx_hash: B256,
        block_number: Option<u64>,
    },
    Failed {
        tx_hash: Option<B256>,
        message: String,
    },
}

impl WriteStatus {
    fn rank(&self) -> u8 {
        match self {
            WriteStatus::Idle => 0,
            WriteStatus::PendingSignature => 1,
            WriteStatus::Submitted { .. } => 2,
            WriteStatus::Confirmed { .. } | WriteStatus::Failed { .. } => 3,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            WriteStatus::PendingSignature | WriteStatus::Submitted { .. }
        )
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, WriteStatus::Confirmed { .. })
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            WriteStatus::Submitted { tx_hash } | WriteStatus::Confirmed { tx_hash, .. } => {
                Some(*tx_hash)
            }
            WriteStatus::Failed { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WriteStatus::Idle => "idle",
            WriteStatus::PendingSignature => "pending_signature",
            WriteStatus::Submitted { .. } => "submitted",
            WriteStatus::Confirmed { .. } => "confirmed",
            WriteStatus::Failed { .. } => "failed",
        }
    }

    pub fn to_view(&self, kind: WriteKind) -> WriteStatusView {
        WriteStatusView {
            kind,
            state: self.label(),
            tx_hash: self.tx_hash().map(|h| h.to_string()),
            message: match self {
                WriteStatus::Failed { message, .. } => Some(message.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteStatusView {
    pub kind: WriteKind,
    pub state: &'static str,
    pub tx_hash: Option<String>,
    pub message: Option<String>,
}

/// Observable status of one kind of write.
#[derive(Debug)]
pub struct WriteTracker {
    kind: WriteKind,
    tx: watch::Sender<WriteStatus>,
}

impl WriteTracker {
    pub fn new(kind: WriteKind) -> Self {
        let (tx, _rx) = watch::channel(WriteStatus::Idle);
        Self { kind, tx }
    }

    pub fn kind(&self) -> WriteKind {
        self.kind
    }

    pub fn status(&self) -> WriteStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WriteStatus> {
        self.tx.subscribe()
    }

    /// Start a new attempt. Allowed from `Idle`, `Confirmed` or `Failed`.
    pub fn begin(&self) -> Result<(), WriteError> {
        let mut result = Ok(());
        let kind = self.kind;
        self.tx.send_if_modified(|current| {
            if current.is_in_flight() {
                result = Err(WriteError::InFlight(kind));
                false
            } else {
                *current = WriteStatus::PendingSignature;
                true
            }
        });
        if result.is_ok() {
            debug!(kind = %kind, "write pending signature");
        }
        result
    }

    /// Record an attempt refused before anything was sent, so the refusal
    /// shows up like any other failure. Refused while in flight.
    pub fn reject(&self, message: impl Into<String>) -> Result<(), WriteError> {
        self.begin()?;
        self.fail(None, message);
        Ok(())
    }

    pub fn submitted(&self, tx_hash: B256) -> bool {
        self.advance(WriteStatus::Submitted { tx_hash })
    }

    pub fn confirmed(&self, tx_hash: B256, block_number: Option<u64>) -> bool {
        self.advance(WriteStatus::Confirmed {
            tx_hash,
            block_number,
        })
    }

    pub fn fail(&self, tx_hash: Option<B256>, message: impl Into<String>) -> bool {
        self.advance(WriteStatus::Failed {
            tx_hash,
            message: message.into(),
        })
    }

    /// Back to `Idle` once the outcome has been shown. No-op while in flight.
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_in_flight() || *current == WriteStatus::Idle {
                false
            } else {
                *current = WriteStatus::Idle;
                true
            }
        })
    }

    fn advance(&self, next: WriteStatus) -> bool {
        let kind = self.kind;
        self.tx.send_if_modified(|current| {
            if next.rank() > current.rank() && current.rank() > 0 {
                *current = next;
                true
            } else {
                warn!(
                    kind = %kind,
                    from = current.label(),
                    to = next.label(),
                    "ignoring out-of-order write status"
                );
                false
            }
        })
    }
}

/// One tracker per write kind, shared by everything that can trigger writes.
#[derive(Debug)]
pub struct WriteTrackers {
    trackers: Vec<WriteTracker>,
}

impl Default for WriteTrackers {
    fn default() -> Self {
        Self {
            trackers: WriteKind::ALL.iter().map(|k| WriteTracker::new(*k)).collect(),
        }
    }
}

impl WriteTrackers {
    pub fn get(&self, kind: WriteKind) -> &WriteTracker {
        // ALL and the trackers vec share one order
        let idx = WriteKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.trackers[idx]
    }

    pub fn views(&self) -> Vec<WriteStatusView> {
        self.trackers
            .iter()
            .map(|t| t.status().to_view(t.kind()))
            .collect()
    }
}
