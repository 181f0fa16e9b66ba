//! Per-chat conversation state and the stage transition table.
//!
//! A session only ever moves forward through the four questions. Each
//! `Progress` variant carries exactly the answers collected so far, so a field
//! cannot be populated before its stage is reached.

use std::time::Instant;

use crate::{
    calculator::{AmortizationParams, AmortizationResult},
    config::Limits,
    formatting::{format_currency, format_percent},
    utils::{parse_number, parse_whole_number},
};

/// Largest loan amount accepted. Whole units up to here are exact in `f64`
/// and every derived figure stays within `i64` for display.
pub const MAX_LOAN_AMOUNT: f64 = 1e15;

/// Position in the four-question dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    AwaitingLoanAmount,
    AwaitingDownPayment,
    AwaitingTermYears,
    AwaitingInterestRate,
    Complete,
}

impl Stage {
    /// The only forward transitions a session can take.
    pub const fn next(self) -> Stage {
        match self {
            Stage::AwaitingLoanAmount => Stage::AwaitingDownPayment,
            Stage::AwaitingDownPayment => Stage::AwaitingTermYears,
            Stage::AwaitingTermYears => Stage::AwaitingInterestRate,
            Stage::AwaitingInterestRate | Stage::Complete => Stage::Complete,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Stage::AwaitingLoanAmount => "loan_amount",
            Stage::AwaitingDownPayment => "down_payment",
            Stage::AwaitingTermYears => "term_years",
            Stage::AwaitingInterestRate => "interest_rate",
            Stage::Complete => "complete",
        }
    }
}

/// Why an answer was rejected. The message is shown to the user as-is.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InputError {
    /// The text is not a number of the kind the current stage expects.
    #[error("{}", parse_hint(.stage))]
    Parse { stage: Stage },

    /// The number parsed but breaks a bound or a cross-field rule.
    #[error("{message}")]
    Range { stage: Stage, message: String },
}

impl InputError {
    pub fn stage(&self) -> Stage {
        match self {
            InputError::Parse { stage } | InputError::Range { stage, .. } => *stage,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InputError::Parse { .. } => "parse",
            InputError::Range { .. } => "range",
        }
    }
}

fn parse_hint(stage: &Stage) -> String {
    match stage {
        Stage::AwaitingLoanAmount => {
            "Invalid input. Please enter a valid positive number.\n\nExample: 5000000".to_string()
        }
        Stage::AwaitingDownPayment => "Invalid input. Please enter a valid number \
(or 0 for no down payment).\n\nExample: 1000000"
            .to_string(),
        Stage::AwaitingTermYears => {
            "Invalid input. Please enter the term as a whole number of years.\n\nExample: 15"
                .to_string()
        }
        Stage::AwaitingInterestRate => {
            "Invalid input. Please enter the annual rate as a number.\n\nExample: 12.5".to_string()
        }
        Stage::Complete => "The calculation is already complete.".to_string(),
    }
}

/// The four validated answers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoanInputs {
    pub loan_amount: f64,
    pub down_payment: f64,
    pub term_years: u32,
    pub interest_rate_percent: f64,
}

impl LoanInputs {
    pub fn params(&self) -> AmortizationParams {
        AmortizationParams::from_inputs(
            self.loan_amount,
            self.down_payment,
            self.term_years,
            self.interest_rate_percent,
        )
    }
}

/// Echoed inputs plus the computed figures, carried by the final reply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoanSummary {
    pub inputs: LoanInputs,
    pub params: AmortizationParams,
    pub result: AmortizationResult,
}

/// Stage together with the answers collected so far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    AwaitingLoanAmount,
    AwaitingDownPayment {
        loan_amount: f64,
    },
    AwaitingTermYears {
        loan_amount: f64,
        down_payment: f64,
    },
    AwaitingInterestRate {
        loan_amount: f64,
        down_payment: f64,
        term_years: u32,
    },
    Complete(LoanInputs),
}

impl Progress {
    pub fn stage(&self) -> Stage {
        match self {
            Progress::AwaitingLoanAmount => Stage::AwaitingLoanAmount,
            Progress::AwaitingDownPayment { .. } => Stage::AwaitingDownPayment,
            Progress::AwaitingTermYears { .. } => Stage::AwaitingTermYears,
            Progress::AwaitingInterestRate { .. } => Stage::AwaitingInterestRate,
            Progress::Complete(_) => Stage::Complete,
        }
    }

    /// Validate `raw` for the current stage and return the next progress value.
    pub fn advance(&self, raw: &str, limits: &Limits) -> Result<Progress, InputError> {
        let stage = self.stage();
        let range = |message: String| InputError::Range { stage, message };

        let next = match *self {
            Progress::AwaitingLoanAmount => {
                let amount = parse_number(raw).ok_or(InputError::Parse { stage })?;
                if amount <= 0.0 {
                    return Err(range("Loan amount must be greater than 0.".to_string()));
                }
                if amount > MAX_LOAN_AMOUNT {
                    return Err(range(format!(
                        "Loan amount must not exceed {}.",
                        format_currency(MAX_LOAN_AMOUNT)
                    )));
                }
                Progress::AwaitingDownPayment {
                    loan_amount: amount,
                }
            }
            Progress::AwaitingDownPayment { loan_amount } => {
                let amount = parse_number(raw).ok_or(InputError::Parse { stage })?;
                if amount < 0.0 {
                    return Err(range(
                        "Down payment cannot be negative. Enter 0 for no down payment.".to_string(),
                    ));
                }
                if amount >= loan_amount {
                    return Err(range(format!(
                        "Down payment ({}) must be less than the loan amount ({}).\n\
Please enter a smaller amount:",
                        format_currency(amount),
                        format_currency(loan_amount)
                    )));
                }
                Progress::AwaitingTermYears {
                    loan_amount,
                    down_payment: amount,
                }
            }
            Progress::AwaitingTermYears {
                loan_amount,
                down_payment,
            } => {
                let years = parse_whole_number(raw).ok_or(InputError::Parse { stage })?;
                let in_range = u32::try_from(years)
                    .ok()
                    .filter(|y| (limits.min_term_years..=limits.max_term_years).contains(y));
                let Some(term_years) = in_range else {
                    return Err(range(format!(
                        "Loan term must be between {} and {} years.\n\nExample: 15",
                        limits.min_term_years, limits.max_term_years
                    )));
                };
                Progress::AwaitingInterestRate {
                    loan_amount,
                    down_payment,
                    term_years,
                }
            }
            Progress::AwaitingInterestRate {
                loan_amount,
                down_payment,
                term_years,
            } => {
                let rate = parse_number(raw).ok_or(InputError::Parse { stage })?;
                if !(limits.min_interest_rate..=limits.max_interest_rate).contains(&rate) {
                    return Err(range(format!(
                        "Interest rate must be between {}% and {}%.\n\nExample: 12.5",
                        format_percent(limits.min_interest_rate),
                        format_percent(limits.max_interest_rate)
                    )));
                }
                Progress::Complete(LoanInputs {
                    loan_amount,
                    down_payment,
                    term_years,
                    interest_rate_percent: rate,
                })
            }
            Progress::Complete(_) => return Err(InputError::Parse { stage }),
        };

        debug_assert_eq!(next.stage(), stage.next());
        Ok(next)
    }
}

/// In-memory state of one conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    progress: Progress,
    last_activity: Instant,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            progress: Progress::AwaitingLoanAmount,
            last_activity: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn loan_amount(&self) -> Option<f64> {
        match self.progress {
            Progress::AwaitingLoanAmount => None,
            Progress::AwaitingDownPayment { loan_amount }
            | Progress::AwaitingTermYears { loan_amount, .. }
            | Progress::AwaitingInterestRate { loan_amount, .. } => Some(loan_amount),
            Progress::Complete(inputs) => Some(inputs.loan_amount),
        }
    }

    pub fn down_payment(&self) -> Option<f64> {
        match self.progress {
            Progress::AwaitingTermYears { down_payment, .. }
            | Progress::AwaitingInterestRate { down_payment, .. } => Some(down_payment),
            Progress::Complete(inputs) => Some(inputs.down_payment),
            _ => None,
        }
    }

    pub fn term_years(&self) -> Option<u32> {
        match self.progress {
            Progress::AwaitingInterestRate { term_years, .. } => Some(term_years),
            Progress::Complete(inputs) => Some(inputs.term_years),
            _ => None,
        }
    }

    pub fn interest_rate_percent(&self) -> Option<f64> {
        match self.progress {
            Progress::Complete(inputs) => Some(inputs.interest_rate_percent),
            _ => None,
        }
    }

    /// Apply one answer. On rejection `self` is left exactly as it was.
    pub fn accept(&self, raw: &str, limits: &Limits, now: Instant) -> Result<Session, InputError> {
        let progress = self.progress.advance(raw, limits)?;
        Ok(Session {
            progress,
            last_activity: now,
        })
    }

    /// The collected answers, once the last question has been answered.
    pub fn completed(&self) -> Option<LoanInputs> {
        match self.progress {
            Progress::Complete(inputs) => Some(inputs),
            _ => None,
        }
    }
}
