//! Heuristic per-slot parsers for free-text utterances
//!
//! These are string-matching heuristics, not a grammar: each slot type gets
//! one pure function so stricter parsing can replace any of them without
//! touching the state machine.

use serde::{Deserialize, Serialize};

/// Whether a rate was expressed per year or per month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Annual,
    Monthly,
}

/// Parsed rate utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateUtterance {
    /// Number + explicit unit
    WithUnit { fraction: f64, unit: RateUnit },
    /// Number without a recognizable unit
    Ambiguous { fraction: f64 },
}

/// Tokens after trimming surrounding punctuation
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation() && c != '-' && c != '#'))
        .filter(|t| !t.is_empty())
}

/// First numeric value in the text, tolerating thousands separators and a
/// trailing `k`/`m` magnitude suffix ("300,000", "300k", "1.2m")
pub fn first_number(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == ',') {
                i += 1;
            }
            let run: String = chars[start..i]
                .iter()
                .filter(|&&c| c != ',')
                .collect::<String>();
            let run = run.trim_end_matches('.');
            if let Ok(mut value) = run.parse::<f64>() {
                // Magnitude suffix only when not the start of a longer word
                // ("300k" yes, "24 months" no)
                let next_is_word = chars.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic());
                match chars.get(i) {
                    Some('k') | Some('K') if !next_is_word => value *= 1_000.0,
                    Some('m') | Some('M') if !next_is_word => value *= 1_000_000.0,
                    _ => {}
                }
                return Some(value);
            }
        }
        i += 1;
    }
    None
}

/// Unit identifier of the form `LETTERS-ALNUM-DIGITS` anywhere in the text,
/// normalized to uppercase
pub fn detect_property_id(text: &str) -> Option<String> {
    for token in tokens(text) {
        let parts: Vec<&str> = token.split('-').collect();
        if parts.len() != 3 {
            continue;
        }
        let [prefix, block, number] = [parts[0], parts[1], parts[2]];
        let shaped = !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphabetic())
            && !block.is_empty()
            && block.chars().all(|c| c.is_ascii_alphanumeric())
            && !number.is_empty()
            && number.chars().all(|c| c.is_ascii_digit());
        if shaped {
            return Some(token.to_ascii_uppercase());
        }
    }
    None
}

/// Currency amount: first non-negative number in the text
pub fn parse_amount(text: &str) -> Option<f64> {
    first_number(text).filter(|v| v.is_finite() && *v >= 0.0)
}

/// Installment count: first whole number, bounded to a sane term
pub fn parse_count(text: &str) -> Option<u32> {
    let value = first_number(text)?;
    (value > 0.0 && value <= 600.0 && value.fract() == 0.0).then_some(value as u32)
}

/// Calendar year: first whole number in a plausible range
pub fn parse_year(text: &str) -> Option<i32> {
    let value = first_number(text)?;
    let year = value as i32;
    (value.fract() == 0.0 && (1990..=2200).contains(&year)).then_some(year)
}

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Month-of-year: 1-12 numeric, or an English month name / 3-letter prefix
pub fn parse_month(text: &str) -> Option<u32> {
    if let Some(value) = first_number(text) {
        let month = value as u32;
        if value.fract() == 0.0 && (1..=12).contains(&month) {
            return Some(month);
        }
        return None;
    }
    let lowered = text.to_lowercase();
    for token in tokens(&lowered) {
        for (idx, name) in MONTH_NAMES.iter().enumerate() {
            if token == *name || (token.len() >= 3 && name.starts_with(token)) {
                return Some(idx as u32 + 1);
            }
        }
    }
    None
}

/// Unit keyword alone ("monthly", "per year"), without a number
pub fn parse_rate_unit(text: &str) -> Option<RateUnit> {
    let lowered = text.to_lowercase();
    if ["month", "monthly", "per month"].iter().any(|k| lowered.contains(k)) {
        Some(RateUnit::Monthly)
    } else if ["annual", "year", "yearly", "per annum", "p.a"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        Some(RateUnit::Annual)
    } else {
        None
    }
}

/// Rate with optional unit. The value is normalized to a decimal fraction:
/// a `%` sign or a value >= 1 reads as percent, anything below 1 as a
/// fraction already.
pub fn parse_rate(text: &str) -> Option<RateUtterance> {
    let value = first_number(text)?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let fraction = if text.contains('%') || value >= 1.0 {
        value / 100.0
    } else {
        value
    };
    match parse_rate_unit(text) {
        Some(unit) => Some(RateUtterance::WithUnit { fraction, unit }),
        None => Some(RateUtterance::Ambiguous { fraction }),
    }
}

/// Position in a shown list: bare number, `#N`, or an English ordinal word
pub fn parse_ordinal(text: &str) -> Option<usize> {
    const ORDINAL_WORDS: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];
    let lowered = text.to_lowercase();
    for token in tokens(&lowered) {
        if let Some(pos) = ORDINAL_WORDS.iter().position(|w| *w == token) {
            return Some(pos + 1);
        }
    }
    let value = first_number(&lowered)?;
    (value.fract() == 0.0 && (1.0..=20.0).contains(&value)).then_some(value as usize)
}

pub fn is_greeting(text: &str) -> bool {
    let lowered = text.to_lowercase();
    tokens(&lowered).any(|t| matches!(t, "hello" | "hi" | "hey" | "restart" | "reset"))
        || lowered.contains("start over")
}

pub fn is_help(text: &str) -> bool {
    let lowered = text.to_lowercase();
    tokens(&lowered).any(|t| t == "help") || lowered.contains("what can you")
}

/// "The installment is too high" in its common phrasings
pub fn is_lower_installment_request(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ["too high", "lower", "expensive", "cheaper", "reduce", "afford"]
        .iter()
        .any(|k| lowered.contains(k))
}

pub fn is_affirmative(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let result = tokens(&lowered).any(|t| {
        matches!(
            t,
            "yes" | "yeah" | "yep" | "ok" | "okay" | "sure" | "agree" | "agreed" | "confirm"
                | "confirmed" | "deal" | "accept" | "accepted"
        )
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_property_id() {
        assert_eq!(detect_property_id("I want NC-T4-102 please"), Some("NC-T4-102".to_string()));
        assert_eq!(detect_property_id("nc-t4-102?"), Some("NC-T4-102".to_string()));
        assert_eq!(detect_property_id("what about unit 102"), None);
        // Wrong shapes
        assert_eq!(detect_property_id("NC-T4"), None);
        assert_eq!(detect_property_id("12-T4-102"), None);
        assert_eq!(detect_property_id("NC-T4-1x2"), None);
    }

    #[test]
    fn test_first_number_forms() {
        assert_eq!(first_number("300,000 down"), Some(300_000.0));
        assert_eq!(first_number("around 300k"), Some(300_000.0));
        assert_eq!(first_number("1.2m total"), Some(1_200_000.0));
        assert_eq!(first_number("24 months"), Some(24.0));
        assert_eq!(first_number("no numbers here"), None);
    }

    #[test]
    fn test_parse_count_bounds() {
        assert_eq!(parse_count("24"), Some(24));
        assert_eq!(parse_count("over 36 installments"), Some(36));
        assert_eq!(parse_count("0"), None);
        assert_eq!(parse_count("1000"), None);
    }

    #[test]
    fn test_parse_year_and_month() {
        assert_eq!(parse_year("2026 maybe"), Some(2026));
        assert_eq!(parse_year("12"), None);
        assert_eq!(parse_month("7"), Some(7));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("November"), Some(11));
        assert_eq!(parse_month("in nov"), Some(11));
    }

    #[test]
    fn test_parse_rate_units() {
        assert_eq!(
            parse_rate("2% monthly"),
            Some(RateUtterance::WithUnit { fraction: 0.02, unit: RateUnit::Monthly })
        );
        assert_eq!(
            parse_rate("24 per annum"),
            Some(RateUtterance::WithUnit { fraction: 0.24, unit: RateUnit::Annual })
        );
        assert_eq!(parse_rate("2"), Some(RateUtterance::Ambiguous { fraction: 0.02 }));
        // Already a fraction
        assert_eq!(parse_rate("0.015"), Some(RateUtterance::Ambiguous { fraction: 0.015 }));
        assert_eq!(parse_rate("monthly"), None);
    }

    #[test]
    fn test_parse_rate_unit_alone() {
        assert_eq!(parse_rate_unit("monthly"), Some(RateUnit::Monthly));
        assert_eq!(parse_rate_unit("it is per annum"), Some(RateUnit::Annual));
        assert_eq!(parse_rate_unit("dunno"), None);
    }

    #[test]
    fn test_parse_ordinal() {
        assert_eq!(parse_ordinal("2"), Some(2));
        assert_eq!(parse_ordinal("#3"), Some(3));
        assert_eq!(parse_ordinal("the first one"), Some(1));
        assert_eq!(parse_ordinal("none of them"), None);
    }

    #[test]
    fn test_keyword_detectors() {
        assert!(is_greeting("Hello there"));
        assert!(is_greeting("please restart"));
        assert!(!is_greeting("high installment"));
        assert!(is_help("help"));
        assert!(is_lower_installment_request("that is too high for me"));
        assert!(is_lower_installment_request("I cannot afford this"));
        assert!(is_affirmative("yes, deal"));
        assert!(!is_affirmative("no way"));
    }
}
