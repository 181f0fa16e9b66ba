//! Formatting utilities (currency amounts, Telegram HTML message bodies).

use crate::{
    calculator::round_currency,
    config::Limits,
    session::{LoanSummary, Progress},
};

pub const CURRENCY: &str = "RUB";

pub const DELETION_NOTICE: &str = "All your data has been deleted from memory.";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Whole currency units with a space as the thousands separator: `5 000 000 RUB`.
pub fn format_currency(amount: f64) -> String {
    let rounded = round_currency(amount);
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} {CURRENCY}")
}

/// Percentages without trailing zeros: `12`, `12.5`, `0.1`.
pub fn format_percent(rate: f64) -> String {
    let s = format!("{rate:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn welcome_prompt() -> String {
    "🏠 <b>Mortgage Calculator</b>\n\n\
I will help you calculate your monthly mortgage payment.\n\
All data is stored only during this session and will be deleted afterwards.\n\n\
<b>Step 1:</b> Enter the loan amount you want (in RUB):"
        .to_string()
}

/// Confirmation of the answer just accepted plus the question for the next step.
pub fn step_prompt(progress: &Progress, limits: &Limits) -> String {
    match progress {
        Progress::AwaitingLoanAmount => welcome_prompt(),
        Progress::AwaitingDownPayment { loan_amount } => format!(
            "✅ Loan amount: {}\n\n<b>Step 2:</b> Enter your down payment/savings (in RUB):",
            format_currency(*loan_amount)
        ),
        Progress::AwaitingTermYears { down_payment, .. } => format!(
            "✅ Down payment: {}\n\n<b>Step 3:</b> Enter loan term in years ({}-{}):",
            format_currency(*down_payment),
            limits.min_term_years,
            limits.max_term_years
        ),
        Progress::AwaitingInterestRate { term_years, .. } => format!(
            "✅ Loan term: {term_years} years\n\n\
<b>Step 4:</b> Enter annual interest rate % ({}-{}, e.g. 12.5):",
            format_percent(limits.min_interest_rate),
            format_percent(limits.max_interest_rate)
        ),
        Progress::Complete(_) => String::new(),
    }
}

pub fn render_summary(summary: &LoanSummary) -> String {
    let inputs = &summary.inputs;
    let result = &summary.result;
    format!(
        "📊 <b>CALCULATION RESULTS:</b>\n\n\
• Loan Amount: {}\n\
• Down Payment: {}\n\
• Loan Principal: {}\n\
• Loan Term: {} years ({} months)\n\
• Interest Rate: {}% per year\n\n\
💸 <b>Monthly Payment:</b> ~{}\n\
💰 <b>Total Payment:</b> ~{}\n\
💎 <b>Total Interest:</b> ~{}\n\n\
⚠️ <i>Note: This is an estimate. Actual terms may vary.</i>",
        format_currency(inputs.loan_amount),
        format_currency(inputs.down_payment),
        format_currency(summary.params.principal),
        inputs.term_years,
        result.num_payments,
        format_percent(inputs.interest_rate_percent),
        format_currency(result.monthly_payment),
        format_currency(result.total_payment),
        format_currency(result.total_interest),
    )
}

pub fn help_text() -> String {
    "🏠 <b>Mortgage Calculator Bot</b>\n\n\
This bot helps you calculate monthly mortgage payments.\n\n\
<b>Commands:</b>\n\
/start - Begin new calculation\n\
/cancel - Cancel current calculation\n\
/help - Show this help message\n\n\
<b>How to use:</b>\n\
1. Send /start to begin\n\
2. Enter the loan amount\n\
3. Enter your down payment\n\
4. Enter loan term in years\n\
5. Enter interest rate\n\
6. Get your calculation results!\n\n\
⚠️ All data is deleted after calculation is complete."
        .to_string()
}

pub fn no_session_text() -> String {
    "👋 Hello! I'm a Mortgage Calculator Bot.\n\n\
Type /start to begin calculating your mortgage payment,\n\
or /help for more information."
        .to_string()
}

pub fn cancel_text() -> String {
    "❌ Calculation cancelled. All data has been deleted.\n\n\
Type /start to begin a new calculation."
        .to_string()
}

pub fn unknown_command_text(name: &str) -> String {
    format!(
        "Unknown command /{}.\n\nAvailable commands: /start, /cancel, /help.",
        escape_html(name)
    )
}

pub fn unsupported_message_text() -> String {
    "Please send your answers as plain text messages, e.g. <code>5000000</code>.".to_string()
}

pub fn internal_error_text() -> String {
    "🚨 Something went wrong while calculating. Please check your answers or type /start to begin again."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::AmortizationParams;
    use crate::session::LoanInputs;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn formats_currency_with_space_groups() {
        assert_eq!(format_currency(5000.0), "5 000 RUB");
        assert_eq!(format_currency(5_000_000.0), "5 000 000 RUB");
        assert_eq!(format_currency(48_007.52), "48 008 RUB");
        assert_eq!(format_currency(0.0), "0 RUB");
        assert_eq!(format_currency(999.4), "999 RUB");
        assert_eq!(format_currency(-1234.0), "-1 234 RUB");
    }

    #[test]
    fn formats_percent_without_trailing_zeros() {
        assert_eq!(format_percent(12.0), "12");
        assert_eq!(format_percent(12.5), "12.5");
        assert_eq!(format_percent(0.1), "0.1");
        assert_eq!(format_percent(7.25), "7.25");
    }

    #[test]
    fn step_prompts_echo_previous_answer_and_bounds() {
        let limits = Limits::default();
        let p = step_prompt(
            &Progress::AwaitingDownPayment {
                loan_amount: 5_000_000.0,
            },
            &limits,
        );
        assert!(p.contains("Loan amount: 5 000 000 RUB"));
        assert!(p.contains("Step 2"));

        let p = step_prompt(
            &Progress::AwaitingTermYears {
                loan_amount: 5_000_000.0,
                down_payment: 0.0,
            },
            &limits,
        );
        assert!(p.contains("Down payment: 0 RUB"));
        assert!(p.contains("(1-30)"));

        let p = step_prompt(
            &Progress::AwaitingInterestRate {
                loan_amount: 5_000_000.0,
                down_payment: 0.0,
                term_years: 15,
            },
            &limits,
        );
        assert!(p.contains("Loan term: 15 years"));
        assert!(p.contains("(0.1-30"));
    }

    #[test]
    fn summary_lists_inputs_and_rounded_results() {
        let inputs = LoanInputs {
            loan_amount: 5_000_000.0,
            down_payment: 1_000_000.0,
            term_years: 15,
            interest_rate_percent: 12.0,
        };
        let params = AmortizationParams::from_inputs(5_000_000.0, 1_000_000.0, 15, 12.0);
        let result = params.compute().unwrap();
        let html = render_summary(&LoanSummary {
            inputs,
            params,
            result,
        });

        assert!(html.contains("Loan Principal: 4 000 000 RUB"));
        assert!(html.contains("15 years (180 months)"));
        assert!(html.contains("Interest Rate: 12% per year"));
        assert!(html.contains("Monthly Payment:</b> ~48 007 RUB"));
    }
}
