//! Momentum: a client for binary prediction contests on HeLa testnet.
//!
//! Reads contest state from the `ContestFactory` / `Contest` / `MockUSDC`
//! contracts, derives display state, tracks writes, and serves an operator
//! dashboard. The `momentum` binary wires these together.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod contracts;
pub mod dashboard;
pub mod events;
pub mod forms;
pub mod network;
pub mod session;
pub mod view;
