//! Form state for staking and contest creation.
//!
//! Holds what the user has typed between requests, decides the next action
//! (approve first or stake directly) and clears itself once the matching
//! write confirms.

use alloy::primitives::U256;
use serde::Serialize;

use crate::client::{Side, WriteStatus};
use crate::view::{
    format_usdc, parse_usdc, projected_roi, validate_contest_form, validate_stake_amount,
    ContestFormErrors, ContestFormInput, StakeValidationError, ValidContest,
};

/// Preset stake buttons, in whole dollars.
pub const QUICK_AMOUNTS: [u64; 3] = [25, 50, 100];

/// What submitting the stake form should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeAction {
    /// Allowance is short; approve exactly `amount` first.
    Approve { amount: U256 },
    Stake { side: Side, amount: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeFormError {
    NoSide,
    Invalid(StakeValidationError),
}

impl std::fmt::Display for StakeFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StakeFormError::NoSide => write!(f, "Select an option first"),
            StakeFormError::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StakeFormError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickAmount {
    pub dollars: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct StakeForm {
    side: Option<Side>,
    amount: String,
    min_stake: U256,
}

impl StakeForm {
    pub fn new(min_stake: U256) -> Self {
        Self {
            side: None,
            amount: String::new(),
            min_stake,
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn select(&mut self, side: Side) {
        self.side = Some(side);
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
    }

    /// Fill in the whole balance, floored to the cent so it never exceeds it.
    pub fn set_max(&mut self, balance: U256) {
        let cent = U256::from(10_000u64);
        self.amount = format_usdc(balance / cent * cent).replace(',', "");
    }

    /// `max` in any case means the whole balance.
    pub fn set_amount_or_max(&mut self, amount: &str, balance: U256) {
        if amount.trim().eq_ignore_ascii_case("max") {
            self.set_max(balance);
        } else {
            self.set_amount(amount);
        }
    }

    /// A preset is only offered when the balance covers it.
    pub fn quick_amounts(balance: U256) -> Vec<QuickAmount> {
        QUICK_AMOUNTS
            .iter()
            .map(|dollars| QuickAmount {
                dollars: *dollars,
                enabled: U256::from(dollars * 1_000_000) <= balance,
            })
            .collect()
    }

    pub fn validate(&self, balance: U256) -> Result<U256, StakeValidationError> {
        validate_stake_amount(&self.amount, balance, self.min_stake)
    }

    /// Approval is needed when the typed amount exceeds the current allowance.
    pub fn needs_approval(&self, allowance: U256) -> bool {
        match parse_usdc(&self.amount) {
            Ok(units) => !units.is_zero() && units > allowance,
            Err(_) => false,
        }
    }

    pub fn next_action(&self, balance: U256, allowance: U256) -> Result<StakeAction, StakeFormError> {
        let side = self.side.ok_or(StakeFormError::NoSide)?;
        let amount = self.validate(balance).map_err(StakeFormError::Invalid)?;
        if amount > allowance {
            Ok(StakeAction::Approve { amount })
        } else {
            Ok(StakeAction::Stake { side, amount })
        }
    }

    /// Projected ROI for the current input, once a side and a positive amount exist.
    pub fn roi_preview(&self, total_a: U256, total_b: U256) -> Option<i64> {
        let side = self.side?;
        let units = parse_usdc(&self.amount).ok()?;
        if units.is_zero() {
            return None;
        }
        Some(projected_roi(units, side, total_a, total_b))
    }

    /// Clear the form when the stake write confirms. Returns whether it did.
    pub fn observe(&mut self, status: &WriteStatus) -> bool {
        if status.is_confirmed() {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.side = None;
        self.amount.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestField {
    Question,
    OptionA,
    OptionB,
}

#[derive(Debug, Clone, Default)]
pub struct ContestForm {
    input: ContestFormInput,
    errors: ContestFormErrors,
}

impl ContestForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &ContestFormInput {
        &self.input
    }

    pub fn errors(&self) -> &ContestFormErrors {
        &self.errors
    }

    /// Editing a field clears that field's error only.
    pub fn set(&mut self, field: ContestField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ContestField::Question => {
                self.input.question = value;
                self.errors.question = None;
            }
            ContestField::OptionA => {
                self.input.option_a = value;
                self.errors.option_a = None;
            }
            ContestField::OptionB => {
                self.input.option_b = value;
                self.errors.option_b = None;
            }
        }
    }

    /// Validate and return trimmed fields, or record the per-field errors.
    pub fn submit(&mut self) -> Option<ValidContest> {
        match validate_contest_form(&self.input) {
            Ok(valid) => {
                self.errors = ContestFormErrors::default();
                Some(valid)
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }

    /// Clear everything once the creation write confirms.
    pub fn observe(&mut self, status: &WriteStatus) -> bool {
        if status.is_confirmed() {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::minimum_stake;
    use alloy::primitives::B256;

    fn usd(dollars: u64) -> U256 {
        U256::from(dollars * 1_000_000)
    }

    #[test]
    fn test_stake_requires_side() {
        let mut form = StakeForm::new(minimum_stake());
        form.set_amount("10");
        assert_eq!(
            form.next_action(usd(100), usd(100)),
            Err(StakeFormError::NoSide)
        );
    }

    #[test]
    fn test_stake_approve_then_stake() {
        let mut form = StakeForm::new(minimum_stake());
        form.select(Side::A);
        form.set_amount("10");
        assert!(form.needs_approval(usd(5)));
        assert_eq!(
            form.next_action(usd(100), usd(5)).unwrap(),
            StakeAction::Approve { amount: usd(10) }
        );
        assert!(!form.needs_approval(usd(10)));
        assert_eq!(
            form.next_action(usd(100), usd(10)).unwrap(),
            StakeAction::Stake {
                side: Side::A,
                amount: usd(10)
            }
        );
    }

    #[test]
    fn test_stake_validation_surfaces() {
        let mut form = StakeForm::new(minimum_stake());
        form.select(Side::B);
        form.set_amount("500");
        assert_eq!(
            form.next_action(usd(100), usd(1_000)),
            Err(StakeFormError::Invalid(
                StakeValidationError::InsufficientBalance
            ))
        );
        form.set_amount("abc");
        assert!(!form.needs_approval(U256::ZERO));
    }

    #[test]
    fn test_roi_preview() {
        let mut form = StakeForm::new(minimum_stake());
        assert_eq!(form.roi_preview(usd(100), U256::ZERO), None);
        form.select(Side::B);
        form.set_amount("100");
        assert_eq!(form.roi_preview(usd(100), U256::ZERO), Some(96));
        form.set_amount("0");
        assert_eq!(form.roi_preview(usd(100), U256::ZERO), None);
    }

    #[test]
    fn test_quick_amounts_and_max() {
        let quick = StakeForm::quick_amounts(usd(60));
        assert_eq!(
            quick.iter().map(|q| q.enabled).collect::<Vec<_>>(),
            vec![true, true, false]
        );

        let mut form = StakeForm::new(minimum_stake());
        form.set_max(U256::from(1_234_560_000u64));
        assert_eq!(form.amount(), "1234.56");
        assert_eq!(form.validate(U256::from(1_234_560_000u64)).unwrap(), U256::from(1_234_560_000u64));
    }

    #[test]
    fn test_max_keyword_uses_balance() {
        let mut form = StakeForm::new(minimum_stake());
        form.set_amount_or_max(" MAX ", usd(42));
        assert_eq!(form.amount(), "42.00");

        form.set_amount_or_max("7.5", usd(42));
        assert_eq!(form.amount(), "7.5");

        // 1.996 would round up past the balance
        form.set_amount_or_max("max", U256::from(1_996_000u64));
        assert_eq!(form.amount(), "1.99");
    }

    #[test]
    fn test_stake_form_clears_on_confirmation() {
        let mut form = StakeForm::new(minimum_stake());
        form.select(Side::A);
        form.set_amount("5");
        assert!(!form.observe(&WriteStatus::PendingSignature));
        assert_eq!(form.amount(), "5");
        assert!(form.observe(&WriteStatus::Confirmed {
            tx_hash: B256::ZERO,
            block_number: Some(1)
        }));
        assert_eq!(form.side(), None);
        assert_eq!(form.amount(), "");
    }

    #[test]
    fn test_contest_form_errors_clear_per_field() {
        let mut form = ContestForm::new();
        form.set(ContestField::Question, "short");
        form.set(ContestField::OptionA, "ab");
        form.set(ContestField::OptionB, "No way");
        assert!(form.submit().is_none());
        assert!(form.errors().question.is_some());
        assert!(form.errors().option_a.is_some());

        form.set(ContestField::Question, "Will it rain in Lisbon tomorrow?");
        assert!(form.errors().question.is_none());
        assert!(form.errors().option_a.is_some());

        form.set(ContestField::OptionA, "Yes");
        let valid = form.submit().unwrap();
        assert_eq!(valid.option_b, "No way");
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_contest_form_resets_on_confirmation() {
        let mut form = ContestForm::new();
        form.set(ContestField::Question, "Will it rain in Lisbon tomorrow?");
        assert!(form.observe(&WriteStatus::Confirmed {
            tx_hash: B256::ZERO,
            block_number: None
        }));
        assert_eq!(form.input(), &ContestFormInput::default());
    }
}
