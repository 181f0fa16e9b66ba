//! Annuity (fixed monthly payment) mortgage calculator.
//!
//! Pure functions only. Everything is computed in `f64`; rounding to whole
//! currency units happens at display time.

use crate::{errors::Error, Result};

/// Inputs derived from the four dialog answers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmortizationParams {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_years: u32,
}

impl AmortizationParams {
    /// `principal = loan_amount - down_payment`.
    pub fn from_inputs(
        loan_amount: f64,
        down_payment: f64,
        term_years: u32,
        annual_rate_percent: f64,
    ) -> Self {
        Self {
            principal: loan_amount - down_payment,
            annual_rate_percent,
            term_years,
        }
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 12.0 / 100.0
    }

    pub fn num_payments(&self) -> u32 {
        self.term_years.saturating_mul(12)
    }

    pub fn compute(&self) -> Result<AmortizationResult> {
        compute(self.principal, self.annual_rate_percent, self.term_years)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmortizationResult {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
    pub num_payments: u32,
}

impl AmortizationResult {
    pub fn rounded_monthly_payment(&self) -> i64 {
        round_currency(self.monthly_payment)
    }

    pub fn rounded_total_payment(&self) -> i64 {
        round_currency(self.total_payment)
    }

    pub fn rounded_total_interest(&self) -> i64 {
        round_currency(self.total_interest)
    }
}

/// Round to the nearest whole currency unit (half away from zero).
pub fn round_currency(amount: f64) -> i64 {
    amount.round() as i64
}

/// Monthly payment, total payment and total interest for an annuity loan.
///
/// A zero rate falls back to straight-line repayment (`principal / n`). The
/// dialog's default minimum rate keeps that branch unreachable, but the rate
/// floor is configurable.
pub fn compute(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Result<AmortizationResult> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(Error::InvalidParameters(
            "principal must be a positive finite amount".to_string(),
        ));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(Error::InvalidParameters(
            "annual rate must be a non-negative finite percentage".to_string(),
        ));
    }
    if term_years == 0 {
        return Err(Error::InvalidParameters(
            "term must be at least one year".to_string(),
        ));
    }

    let num_payments = term_years.saturating_mul(12);
    let n = f64::from(num_payments);
    let monthly_rate = annual_rate_percent / 12.0 / 100.0;

    let monthly_payment = if monthly_rate == 0.0 {
        principal / n
    } else {
        let growth = (1.0 + monthly_rate).powf(n);
        principal * (monthly_rate * growth) / (growth - 1.0)
    };

    let total_payment = monthly_payment * n;
    let total_interest = total_payment - principal;
    if ![monthly_payment, total_payment, total_interest]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(Error::InvalidParameters(
            "payment figures overflowed".to_string(),
        ));
    }

    Ok(AmortizationResult {
        monthly_payment,
        total_payment,
        total_interest,
        num_payments,
    })
}
