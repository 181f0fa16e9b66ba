use std::sync::Arc;

use mcb_core::{config::Config, dialog::MortgageDialog};

#[tokio::main]
async fn main() -> Result<(), mcb_core::Error> {
    mcb_core::logging::init("mcb")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        term_years = ?(cfg.limits.min_term_years..=cfg.limits.max_term_years),
        rate_percent = ?(cfg.limits.min_interest_rate..=cfg.limits.max_interest_rate),
        session_timeout_secs = cfg.session_timeout.as_secs(),
        "configuration loaded"
    );

    let dialog = Arc::new(MortgageDialog::new(cfg.limits, cfg.session_timeout));

    mcb_telegram::router::run_polling(cfg, dialog)
        .await
        .map_err(|e| mcb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
