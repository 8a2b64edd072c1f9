//! Client-side input validation: stake amounts and the contest creation form.

use alloy::primitives::U256;
use serde::Serialize;
use thiserror::Error;

use rust_decimal::Decimal;

use super::amount::{dollars_to_units, format_usdc, parse_dollars};

pub const QUESTION_MIN_CHARS: usize = 10;
pub const QUESTION_MAX_CHARS: usize = 200;
pub const OPTION_MIN_CHARS: usize = 3;
pub const OPTION_MAX_CHARS: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeValidationError {
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Minimum stake is ${minimum}")]
    BelowMinimum { minimum: String },
    #[error("Insufficient balance")]
    InsufficientBalance,
}

/// Validate a typed stake amount against the caller's known balance.
/// Returns the amount in token units when it can be staked.
pub fn validate_stake_amount(
    amount: &str,
    balance: U256,
    min_stake: U256,
) -> Result<U256, StakeValidationError> {
    let dollars = parse_dollars(amount).map_err(|_| StakeValidationError::InvalidAmount)?;
    if dollars <= Decimal::ZERO {
        return Err(StakeValidationError::InvalidAmount);
    }
    // positive input below one unit floors to zero and is reported as below minimum
    let units = dollars_to_units(dollars).map_err(|_| StakeValidationError::InvalidAmount)?;
    if units < min_stake {
        return Err(StakeValidationError::BelowMinimum {
            minimum: format_usdc(min_stake),
        });
    }
    if units > balance {
        return Err(StakeValidationError::InsufficientBalance);
    }
    Ok(units)
}

/// Raw contest creation fields as typed by the admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContestFormInput {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
}

/// Trimmed fields that passed validation, ready for `createContest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContest {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
}

/// Per-field error messages. `None` means the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContestFormErrors {
    pub question: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
}

impl ContestFormErrors {
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.option_a.is_none() && self.option_b.is_none()
    }
}

fn check_length(label: &str, value: &str, min: usize, max: usize) -> Option<String> {
    let len = value.chars().count();
    if len == 0 {
        Some(format!("{label} is required"))
    } else if len < min {
        Some(format!("{label} must be at least {min} characters"))
    } else if len > max {
        Some(format!("{label} must be less than {max} characters"))
    } else {
        None
    }
}

pub fn validate_contest_form(input: &ContestFormInput) -> Result<ValidContest, ContestFormErrors> {
    let question = input.question.trim();
    let option_a = input.option_a.trim();
    let option_b = input.option_b.trim();

    let mut errors = ContestFormErrors {
        question: check_length("Question", question, QUESTION_MIN_CHARS, QUESTION_MAX_CHARS),
        option_a: check_length("Option A", option_a, OPTION_MIN_CHARS, OPTION_MAX_CHARS),
        option_b: check_length("Option B", option_b, OPTION_MIN_CHARS, OPTION_MAX_CHARS),
    };

    if !option_a.is_empty() && option_a == option_b {
        errors.option_a = Some("Options must be different".to_string());
        errors.option_b = Some("Options must be different".to_string());
    }

    if errors.is_empty() {
        Ok(ValidContest {
            question: question.to_string(),
            option_a: option_a.to_string(),
            option_b: option_b.to_string(),
        })
    } else {
        Err(errors)
    }
}
