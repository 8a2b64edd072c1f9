//! Contract event watching for the Momentum contracts.
//!
//! - `ContestEventMonitor`: background `eth_getLogs` poller over the factory
//!   and every cached contest
//! - Signals are emitted via `tokio::sync::mpsc` as `ContestSignal` variants
//! - The session loop consumes them to refresh cached contests and
//!   invalidate the affected polled reads

pub mod monitor;
pub mod types;

pub use monitor::ContestEventMonitor;
pub use types::ContestSignal;
