//! Command-line parsing for the `momentum` binary.

use alloy::primitives::Address;
use std::path::PathBuf;
use thiserror::Error;

use crate::client::Side;
use crate::contracts::parse_address;

pub const USAGE: &str = "\
Usage: momentum [--config <path>] [command]

Commands:
  serve                          run the dashboard and event watcher (default)
  contests                       list every contest
  contest <address>              show one contest and your position
  stats                          factory statistics
  balance                        wallet mUSDC balance
  network                        chain check and wallet add/switch requests
  faucet                         mint 100 test mUSDC
  approve <contest> <amount>     approve a contest to pull mUSDC
  stake <contest> <a|b> <amount> stake on an option, approving first (amount may be `max`)
  claim <contest>                claim winnings
  resolve <contest>              settle an ended contest
  create <question> <a> <b>      create a contest (admin)
  withdraw-fees                  withdraw platform fees (admin)";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    Contests,
    Contest(Address),
    Stats,
    Balance,
    Network,
    Faucet,
    Approve { contest: Address, amount: String },
    Stake { contest: Address, side: Side, amount: String },
    Claim(Address),
    Resolve(Address),
    Create { question: String, option_a: String, option_b: String },
    WithdrawFees,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub command: Command,
}

fn usage(msg: impl Into<String>) -> CliError {
    CliError::Usage(msg.into())
}

fn contest_arg(args: &[String], idx: usize) -> Result<Address, CliError> {
    let raw = args
        .get(idx)
        .ok_or_else(|| usage("missing contest address"))?;
    parse_address("contest", raw).map_err(|e| usage(e.to_string()))
}

fn string_arg(args: &[String], idx: usize, what: &str) -> Result<String, CliError> {
    args.get(idx)
        .cloned()
        .ok_or_else(|| usage(format!("missing {what}")))
}

/// Parse arguments, excluding the program name.
pub fn parse(args: &[String]) -> Result<Invocation, CliError> {
    let mut config = None;
    let mut rest: Vec<String> = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter
                    .next()
                    .ok_or_else(|| usage("--config needs a path"))?;
                config = Some(PathBuf::from(path));
            }
            _ => rest.push(arg.clone()),
        }
    }

    let command = match rest.first().map(String::as_str) {
        None | Some("serve") => Command::Serve,
        Some("help" | "--help" | "-h") => Command::Help,
        Some("contests") => Command::Contests,
        Some("contest") => Command::Contest(contest_arg(&rest, 1)?),
        Some("stats") => Command::Stats,
        Some("balance") => Command::Balance,
        Some("network") => Command::Network,
        Some("faucet") => Command::Faucet,
        Some("approve") => Command::Approve {
            contest: contest_arg(&rest, 1)?,
            amount: string_arg(&rest, 2, "amount")?,
        },
        Some("stake") => Command::Stake {
            contest: contest_arg(&rest, 1)?,
            side: string_arg(&rest, 2, "side")?
                .parse::<Side>()
                .map_err(usage)?,
            amount: string_arg(&rest, 3, "amount")?,
        },
        Some("claim") => Command::Claim(contest_arg(&rest, 1)?),
        Some("resolve") => Command::Resolve(contest_arg(&rest, 1)?),
        Some("create") => Command::Create {
            question: string_arg(&rest, 1, "question")?,
            option_a: string_arg(&rest, 2, "option A")?,
            option_b: string_arg(&rest, 3, "option B")?,
        },
        Some("withdraw-fees") => Command::WithdrawFees,
        Some(other) => return Err(usage(format!("unknown command '{other}'"))),
    };

    Ok(Invocation { config, command })
}
