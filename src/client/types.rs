//! Raw contract state as read from the chain, before any display derivation.

use alloy::primitives::{Address, U256};
use std::fmt;
use std::str::FromStr;

/// One side of a binary contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn is_a(self) -> bool {
        matches!(self, Side::A)
    }

    pub fn from_is_a(is_a: bool) -> Side {
        if is_a {
            Side::A
        } else {
            Side::B
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Side::A),
            "b" => Ok(Side::B),
            other => Err(format!("unknown side '{other}', expected a or b")),
        }
    }
}

/// Everything a contest card or detail page needs from one contest contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestSnapshot {
    pub address: Address,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    /// Unix seconds.
    pub end_time: u64,
    pub is_resolved: bool,
    /// Only read once `is_resolved` is true.
    pub winner_is_a: Option<bool>,
    pub total_a: U256,
    pub total_b: U256,
}

impl ContestSnapshot {
    pub fn total_pool(&self) -> U256 {
        self.total_a + self.total_b
    }

    pub fn total_on(&self, side: Side) -> U256 {
        match side {
            Side::A => self.total_a,
            Side::B => self.total_b,
        }
    }

    pub fn option_text(&self, side: Side) -> &str {
        match side {
            Side::A => &self.option_a,
            Side::B => &self.option_b,
        }
    }

    pub fn winning_side(&self) -> Option<Side> {
        if !self.is_resolved {
            return None;
        }
        self.winner_is_a.map(Side::from_is_a)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStakes {
    pub on_a: U256,
    pub on_b: U256,
    pub total: U256,
}

impl UserStakes {
    pub fn on(&self, side: Side) -> U256 {
        match side {
            Side::A => self.on_a,
            Side::B => self.on_b,
        }
    }
}

/// A connected user's standing in one contest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPosition {
    pub stakes: UserStakes,
    pub has_claimed: bool,
    pub is_winner: bool,
    /// Payout the contract would transfer on `claim()`.
    pub winnings: U256,
}

impl UserPosition {
    pub fn can_claim(&self) -> bool {
        self.is_winner && !self.has_claimed && !self.winnings.is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryStats {
    pub total_contests: U256,
    pub active_contests: U256,
    pub resolved_contests: U256,
    pub total_fees_collected: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningOption {
    pub is_a: bool,
    pub option_text: String,
    pub total_staked: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse() {
        assert_eq!("A".parse::<Side>().unwrap(), Side::A);
        assert_eq!(" b ".parse::<Side>().unwrap(), Side::B);
        assert!("c".parse::<Side>().is_err());
    }

    #[test]
    fn test_winning_side_requires_resolution() {
        let mut snap = ContestSnapshot {
            address: Address::ZERO,
            question: "q".into(),
            option_a: "yes".into(),
            option_b: "no".into(),
            end_time: 0,
            is_resolved: false,
            winner_is_a: Some(true),
            total_a: U256::from(3u64),
            total_b: U256::from(4u64),
        };
        assert_eq!(snap.winning_side(), None);
        snap.is_resolved = true;
        assert_eq!(snap.winning_side(), Some(Side::A));
        assert_eq!(snap.total_pool(), U256::from(7u64));
        assert_eq!(snap.option_text(Side::B), "no");
    }

    #[test]
    fn test_can_claim() {
        let mut pos = UserPosition {
            is_winner: true,
            winnings: U256::from(5u64),
            ..Default::default()
        };
        assert!(pos.can_claim());
        pos.has_claimed = true;
        assert!(!pos.can_claim());
    }
}
