//! Display-state derivation over raw contract values.
//!
//! Everything here is pure: callers pass `now` explicitly (see [`unix_now`])
//! so the same snapshot always derives the same view. Nothing in this module
//! is authoritative; payouts and fees are settled on-chain at claim time.

pub mod amount;
pub mod validate;

pub use amount::{format_large_number, format_usdc, parse_usdc};
pub use validate::{
    validate_contest_form, validate_stake_amount, ContestFormErrors, ContestFormInput,
    StakeValidationError, ValidContest,
};

use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::fmt;

use crate::client::types::{ContestSnapshot, Side};
use crate::contracts::PLATFORM_FEE_PERCENT;

const ENDING_SOON_SECS: u64 = 3600;

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Unix seconds as an RFC 3339 UTC timestamp. Out-of-range input gives `None`.
pub fn format_timestamp(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).ok()?;
    chrono::DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Active,
    Ended,
    Resolved,
}

impl ContestStatus {
    /// Badge text shown on contest cards.
    pub fn label(self) -> &'static str {
        match self {
            ContestStatus::Active => "Live",
            ContestStatus::Ended => "Ended",
            ContestStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContestStatus::Active => write!(f, "active"),
            ContestStatus::Ended => write!(f, "ended"),
            ContestStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Resolution always wins over the clock, even before `end_time`.
pub fn contest_status(is_resolved: bool, end_time: u64, now: u64) -> ContestStatus {
    if is_resolved {
        ContestStatus::Resolved
    } else if end_time <= now {
        ContestStatus::Ended
    } else {
        ContestStatus::Active
    }
}

pub fn time_remaining(end_time: u64, now: u64) -> u64 {
    end_time.saturating_sub(now)
}

/// Two most significant units, e.g. `"1d 2h"`, `"1h 1m"`, `"2m 5s"`, `"42s"`.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Ended".to_string();
    }
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeUntilEnd {
    pub time_remaining: u64,
    pub is_ended: bool,
    /// Less than an hour left.
    pub is_ending_soon: bool,
}

pub fn time_until_end(end_time: u64, now: u64) -> TimeUntilEnd {
    let remaining = time_remaining(end_time, now);
    TimeUntilEnd {
        time_remaining: remaining,
        is_ended: remaining == 0,
        is_ending_soon: remaining > 0 && remaining < ENDING_SOON_SECS,
    }
}

/// `side * 100 / total`, truncated. An empty pool reads as an even 50.
pub fn percentage(side: U256, total: U256) -> u64 {
    if total.is_zero() {
        return 50;
    }
    let pct = side.saturating_mul(U256::from(100u64)) / total;
    pct.saturating_to::<u64>()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSplit {
    pub a_pct: u64,
    pub b_pct: u64,
}

pub fn pool_split(total_a: U256, total_b: U256) -> PoolSplit {
    let total = total_a + total_b;
    PoolSplit {
        a_pct: percentage(total_a, total),
        b_pct: percentage(total_b, total),
    }
}

/// Estimated return in whole percent for `user_stake` on a side holding
/// `total_user_side` (stake included) against `total_other_side`.
///
/// The platform fee comes off the combined pool before the pro-rata share.
/// Returns 0 when the user's side is empty.
pub fn calculate_roi(user_stake: U256, total_user_side: U256, total_other_side: U256) -> i64 {
    if total_user_side.is_zero() || user_stake.is_zero() {
        return 0;
    }
    let combined = total_user_side + total_other_side;
    let fee = combined * U256::from(PLATFORM_FEE_PERCENT) / U256::from(100u64);
    let net_pool = combined - fee;
    let share = user_stake * net_pool / total_user_side;

    let hundred = U256::from(100u64);
    if share >= user_stake {
        ((share - user_stake) * hundred / user_stake).saturating_to::<i64>()
    } else {
        -((user_stake - share) * hundred / user_stake).saturating_to::<i64>()
    }
}

/// ROI preview for a stake that has not been placed yet: the stake is added
/// to the chosen side's current total first.
pub fn projected_roi(stake: U256, side: Side, total_a: U256, total_b: U256) -> i64 {
    let (same, other) = match side {
        Side::A => (total_a + stake, total_b),
        Side::B => (total_b + stake, total_a),
    };
    calculate_roi(stake, same, other)
}

/// `0x1234...abcd` style shortening.
pub fn truncate_address(address: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return address.to_string();
    }
    let head: String = chars[..start_chars].iter().collect();
    let tail: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{head}...{tail}")
}

pub fn short_address(address: Address) -> String {
    truncate_address(&address.to_checksum(None), 6, 4)
}

pub fn format_contest_question(question: &str, max_len: usize) -> String {
    if question.chars().count() <= max_len {
        return question.to_string();
    }
    let kept: String = question.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Outcome of the admin gate for the contest creation UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAccess {
    Granted,
    NotConnected,
    Denied,
}

pub fn admin_access(connected: Option<Address>, admin: Address) -> AdminAccess {
    match connected {
        None => AdminAccess::NotConnected,
        Some(addr) if addr == admin => AdminAccess::Granted,
        Some(_) => AdminAccess::Denied,
    }
}

/// Display-ready rendering of one contest.
#[derive(Debug, Clone, Serialize)]
pub struct ContestView {
    pub address: String,
    pub short_address: String,
    pub question: String,
    pub question_short: String,
    pub option_a: String,
    pub option_b: String,
    pub status: ContestStatus,
    pub status_label: &'static str,
    pub end_time: u64,
    pub ends_at: Option<String>,
    pub time_left: String,
    pub is_ending_soon: bool,
    pub total_a: String,
    pub total_b: String,
    pub total_pool: String,
    pub a_pct: u64,
    pub b_pct: u64,
    pub winner: Option<String>,
}

impl ContestView {
    pub fn derive(snapshot: &ContestSnapshot, now: u64) -> Self {
        let status = contest_status(snapshot.is_resolved, snapshot.end_time, now);
        let until = time_until_end(snapshot.end_time, now);
        let split = pool_split(snapshot.total_a, snapshot.total_b);
        Self {
            address: snapshot.address.to_checksum(None),
            short_address: short_address(snapshot.address),
            question: snapshot.question.clone(),
            question_short: format_contest_question(&snapshot.question, 80),
            option_a: snapshot.option_a.clone(),
            option_b: snapshot.option_b.clone(),
            status,
            status_label: status.label(),
            end_time: snapshot.end_time,
            ends_at: format_timestamp(snapshot.end_time),
            time_left: if status == ContestStatus::Active {
                format_time_remaining(until.time_remaining)
            } else {
                "Ended".to_string()
            },
            is_ending_soon: status == ContestStatus::Active && until.is_ending_soon,
            total_a: format_usdc(snapshot.total_a),
            total_b: format_usdc(snapshot.total_b),
            total_pool: format_usdc(snapshot.total_pool()),
            a_pct: split.a_pct,
            b_pct: split.b_pct,
            winner: snapshot.winning_side().map(|s| s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn units(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(86_400).as_deref(),
            Some("1970-01-02T00:00:00+00:00")
        );
        assert_eq!(format_timestamp(u64::MAX), None);
    }

    #[test]
    fn test_format_time_remaining() {
        assert_eq!(format_time_remaining(0), "Ended");
        assert_eq!(format_time_remaining(42), "42s");
        assert_eq!(format_time_remaining(125), "2m 5s");
        assert_eq!(format_time_remaining(3661), "1h 1m");
        assert_eq!(format_time_remaining(86_400 + 7_200 + 59), "1d 2h");
    }

    #[test]
    fn test_time_until_end() {
        let t = time_until_end(1_000, 400);
        assert_eq!(t.time_remaining, 600);
        assert!(t.is_ending_soon);
        assert!(!t.is_ended);

        let t = time_until_end(1_000, 5_000);
        assert_eq!(t.time_remaining, 0);
        assert!(t.is_ended);
        assert!(!t.is_ending_soon);
    }

    #[test]
    fn test_status_after_end_time() {
        for (end, now) in [(0u64, 0u64), (100, 100), (100, 5_000)] {
            assert_eq!(contest_status(false, end, now), ContestStatus::Ended);
            assert_eq!(contest_status(true, end, now), ContestStatus::Resolved);
        }
    }

    #[test]
    fn test_resolution_overrides_future_end_time() {
        assert_eq!(contest_status(false, 200, 100), ContestStatus::Active);
        assert_eq!(contest_status(true, 200, 100), ContestStatus::Resolved);
    }

    #[test]
    fn test_percentage_split_sums_to_about_100() {
        let cases = [(0u64, 1u64), (1, 2), (1, 1), (333, 667), (7, 3), (1, 999_999)];
        for (a, b) in cases {
            let split = pool_split(units(a), units(b));
            let sum = split.a_pct + split.b_pct;
            assert!((99..=100).contains(&sum), "a={a} b={b} sum={sum}");
        }
    }

    #[test]
    fn test_percentage_empty_pool_is_even() {
        let split = pool_split(U256::ZERO, U256::ZERO);
        assert_eq!(split, PoolSplit { a_pct: 50, b_pct: 50 });
    }

    #[test]
    fn test_roi_example() {
        // 200 pool, 4 fee, 196 net, user owns the whole side
        assert_eq!(calculate_roi(units(100), units(100), units(100)), 96);
    }

    #[test]
    fn test_roi_edge_cases() {
        assert_eq!(calculate_roi(units(100), U256::ZERO, units(100)), 0);
        // alone on a side with nothing opposite: only the fee comes off
        assert_eq!(calculate_roi(units(100), units(100), U256::ZERO), -2);
        // half of a 200 side against 100
        assert_eq!(calculate_roi(units(100), units(200), units(100)), 47);
    }

    #[test]
    fn test_projected_roi_adds_stake_to_side() {
        assert_eq!(projected_roi(units(100), Side::B, units(100), U256::ZERO), 96);
        assert_eq!(projected_roi(units(100), Side::A, units(100), U256::ZERO), -2);
    }

    #[test]
    fn test_truncate_address() {
        assert_eq!(
            truncate_address("0x8b189BE61dc48428bb4b85A60520550670406Eeb", 6, 4),
            "0x8b18...6Eeb"
        );
        assert_eq!(truncate_address("0x1234", 6, 4), "0x1234");
    }

    #[test]
    fn test_format_contest_question() {
        assert_eq!(format_contest_question("short", 80), "short");
        let long = "x".repeat(100);
        let out = format_contest_question(&long, 80);
        assert_eq!(out.chars().count(), 80);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_admin_gate() {
        let admin = "0x8b189BE61dc48428bb4b85A60520550670406Eeb";
        let admin_addr = Address::from_str(admin).unwrap();
        // hex case never matters once parsed
        let lower = Address::from_str("0x8b189be61dc48428bb4b85a60520550670406eeb").unwrap();
        let upper = Address::from_str("0x8B189BE61DC48428BB4B85A60520550670406EEB").unwrap();
        assert_eq!(admin_access(Some(lower), admin_addr), AdminAccess::Granted);
        assert_eq!(admin_access(Some(upper), admin_addr), AdminAccess::Granted);
        assert_eq!(admin_access(Some(admin_addr), admin_addr), AdminAccess::Granted);
        assert_eq!(admin_access(Some(Address::ZERO), admin_addr), AdminAccess::Denied);
        assert_eq!(admin_access(None, admin_addr), AdminAccess::NotConnected);
    }

    #[test]
    fn test_contest_view_derive() {
        let snap = ContestSnapshot {
            address: Address::ZERO,
            question: "Will BTC break $70k this month?".into(),
            option_a: "Yes".into(),
            option_b: "No".into(),
            end_time: 10_000,
            is_resolved: false,
            winner_is_a: None,
            total_a: units(30_000_000),
            total_b: units(10_000_000),
        };
        let view = ContestView::derive(&snap, 10_000 - 3661);
        assert_eq!(view.status, ContestStatus::Active);
        assert_eq!(view.time_left, "1h 1m");
        assert_eq!(view.a_pct, 75);
        assert_eq!(view.b_pct, 25);
        assert_eq!(view.total_pool, "40.00");
        assert!(view.winner.is_none());

        let ended = ContestView::derive(&snap, 20_000);
        assert_eq!(ended.status_label, "Ended");
        assert_eq!(ended.time_left, "Ended");
    }
}
