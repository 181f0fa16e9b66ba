use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Validation bounds for the term and rate questions.
///
/// Injected once at startup; the dialog only reads them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub min_term_years: u32,
    pub max_term_years: u32,
    pub min_interest_rate: f64,
    pub max_interest_rate: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_term_years: 1,
            max_term_years: 30,
            min_interest_rate: 0.1,
            max_interest_rate: 30.0,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<()> {
        if self.min_term_years == 0 {
            return Err(Error::Config(
                "MIN_LOAN_TERM_YEARS must be at least 1".to_string(),
            ));
        }
        if self.min_term_years > self.max_term_years {
            return Err(Error::Config(format!(
                "loan term range is empty: {}..{}",
                self.min_term_years, self.max_term_years
            )));
        }
        if !self.min_interest_rate.is_finite() || !self.max_interest_rate.is_finite() {
            return Err(Error::Config("interest rate bounds must be finite".to_string()));
        }
        if self.min_interest_rate < 0.0 {
            return Err(Error::Config(
                "MIN_INTEREST_RATE must not be negative".to_string(),
            ));
        }
        if self.min_interest_rate > self.max_interest_rate {
            return Err(Error::Config(format!(
                "interest rate range is empty: {}..{}",
                self.min_interest_rate, self.max_interest_rate
            )));
        }
        Ok(())
    }
}

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub limits: Limits,

    // Idle sessions are erased after `session_timeout`; the sweeper wakes every
    // `session_sweep_interval`.
    pub session_timeout: Duration,
    pub session_sweep_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (env in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let defaults = Limits::default();
        let limits = Limits {
            min_term_years: parse_key(&lookup, "MIN_LOAN_TERM_YEARS")?
                .unwrap_or(defaults.min_term_years),
            max_term_years: parse_key(&lookup, "MAX_LOAN_TERM_YEARS")?
                .unwrap_or(defaults.max_term_years),
            min_interest_rate: parse_key(&lookup, "MIN_INTEREST_RATE")?
                .unwrap_or(defaults.min_interest_rate),
            max_interest_rate: parse_key(&lookup, "MAX_INTEREST_RATE")?
                .unwrap_or(defaults.max_interest_rate),
        };
        limits.validate()?;

        // 24 hours, same as the original bot.
        let session_timeout = Duration::from_secs(
            parse_key(&lookup, "SESSION_TIMEOUT_SECONDS")?.unwrap_or(24 * 60 * 60),
        );
        let session_sweep_interval = Duration::from_secs(
            parse_key::<u64>(&lookup, "SESSION_SWEEP_INTERVAL_SECS")?
                .unwrap_or(60)
                .max(1),
        );

        Ok(Self {
            telegram_bot_token: telegram_bot_token.trim().to_string(),
            limits,
            session_timeout,
            session_sweep_interval,
        })
    }
}

fn parse_key<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_original_bounds() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.telegram_bot_token, "123:abc");
        assert_eq!(cfg.limits, Limits::default());
        assert_eq!(cfg.session_timeout, Duration::from_secs(86_400));
        assert_eq!(cfg.session_sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "   ")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn bounds_can_be_overridden() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("MAX_LOAN_TERM_YEARS", "25"),
            ("MIN_INTEREST_RATE", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.limits.max_term_years, 25);
        assert_eq!(cfg.limits.min_interest_rate, 0.0);
    }

    #[test]
    fn rejects_empty_or_malformed_ranges() {
        for pairs in [
            [("MIN_LOAN_TERM_YEARS", "10"), ("MAX_LOAN_TERM_YEARS", "5")],
            [("MIN_LOAN_TERM_YEARS", "0"), ("MAX_LOAN_TERM_YEARS", "5")],
            [("MIN_INTEREST_RATE", "-1"), ("MAX_INTEREST_RATE", "5")],
            [("MIN_INTEREST_RATE", "abc"), ("MAX_INTEREST_RATE", "5")],
        ] {
            let mut all = vec![("TELEGRAM_BOT_TOKEN", "t")];
            all.extend_from_slice(&pairs);
            assert!(
                matches!(Config::from_lookup(lookup(&all)), Err(Error::Config(_))),
                "{pairs:?} should be rejected"
            );
        }
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"123:abc\"\n\nexport MAX_INTEREST_RATE='25'\nbroken line\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "123:abc".to_string()),
                ("MAX_INTEREST_RATE".to_string(), "25".to_string()),
            ]
        );
    }
}
