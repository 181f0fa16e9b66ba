//! Small parsing helpers shared by the dialog and the Telegram adapter.

/// Normalize user-typed numbers: trim, drop thousand separators, accept `,` as decimal mark.
fn normalize_number(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

/// Parse a decimal amount such as `5 000 000`, `12,5` or ` 5000 `.
///
/// Returns `None` for malformed input and for non-finite values (`inf`, `NaN`).
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned = normalize_number(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a whole number (the loan term). Fractions are rejected rather than truncated.
pub fn parse_whole_number(text: &str) -> Option<i64> {
    let cleaned = normalize_number(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

/// Lowercase command name of `/cmd@botname ...`. Commands take no arguments; trailing words are dropped.
pub fn parse_command(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let first = text.split(char::is_whitespace).next().unwrap_or("");
    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_decimal_numbers() {
        assert_eq!(parse_number("5000000"), Some(5_000_000.0));
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("5 000 000"), Some(5_000_000.0));
        assert_eq!(parse_number("  5000  "), Some(5000.0));
        assert_eq!(parse_number("-3"), Some(-3.0));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["abc", "", "   ", "12.5.5", "1,2,3", "inf", "NaN", "5k"] {
            assert_eq!(parse_number(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn whole_numbers_reject_fractions() {
        assert_eq!(parse_whole_number("15"), Some(15));
        assert_eq!(parse_whole_number(" 3 0 "), Some(30));
        assert_eq!(parse_whole_number("0"), Some(0));
        assert_eq!(parse_whole_number("15.5"), None);
        assert_eq!(parse_whole_number("15,0"), None);
        assert_eq!(parse_whole_number("fifteen"), None);
    }

    #[test]
    fn command_parsing_strips_bot_suffix() {
        assert_eq!(
            parse_command("/start@mortgage_bot"),
            Some("start".to_string())
        );
        assert_eq!(
            parse_command("  /Help me please"),
            Some("help".to_string())
        );
        assert_eq!(parse_command("5000000"), None);
    }
}
