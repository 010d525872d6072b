//! Merchant name normalization
//!
//! Bank descriptions carry card-processor noise ("WALMART #1234",
//! "SQ *COFFEEPLACE 00492") that has to be stripped before merchants can be
//! grouped. Two normalizations live here:
//! - [`display_name`]: human-readable cleaned name for reports
//! - [`merchant_key`]: aggressive lowercase key for recurring-group clustering

use std::sync::OnceLock;

use regex::Regex;

/// Maximum merchant key length. Trailing order/reference numbers tend to
/// appear past this prefix, so truncation absorbs them.
const KEY_PREFIX_LEN: usize = 24;

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Location numbers, long digit runs, trailing short numbers,
        // asterisk separators. The asterisk run is stripped on its own so
        // processor prefixes ("SQ *MERCHANT") keep the merchant text.
        Regex::new(r"(?i)\s*#\d+|\s*\d{4,}|\s+\d{1,3}$|\*+").expect("invalid noise regex")
    })
}

fn non_alnum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("invalid key regex"))
}

/// Clean a raw description into a human-readable merchant name
///
/// Strips noise patterns, collapses whitespace, and title-cases the result.
pub fn display_name(description: &str) -> String {
    let stripped = noise_re().replace_all(description.trim(), " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    title_case(&collapsed)
}

/// Normalize a description into a stable clustering key
///
/// Lower-cases, collapses non-alphanumeric runs to single spaces, and
/// truncates to a stable prefix so trailing order numbers don't split
/// clusters.
pub fn merchant_key(description: &str) -> String {
    let lower = description.to_lowercase();
    let spaced = non_alnum_re().replace_all(&lower, " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(KEY_PREFIX_LEN).collect();
    truncated.trim_end().to_string()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_location_numbers() {
        assert_eq!(display_name("WALMART #1234"), "Walmart");
        assert_eq!(display_name("STARBUCKS STORE 00492"), "Starbucks Store");
    }

    #[test]
    fn test_display_name_strips_asterisk_codes() {
        assert_eq!(display_name("SQ *COFFEEPLACE"), "Sq Coffeeplace");
        assert_eq!(display_name("AMZN*MKTPLACE"), "Amzn Mktplace");
        // Distinct processor-prefixed merchants must not collapse together
        assert_ne!(display_name("SQ *ALPHA CAFE"), display_name("SQ *BETA BAKERY"));
    }

    #[test]
    fn test_display_name_title_cases() {
        assert_eq!(display_name("netflix.com"), "Netflix.com");
        assert_eq!(display_name("  TRADER   JOE'S  "), "Trader Joe's");
    }

    #[test]
    fn test_merchant_key_collapses_punctuation() {
        assert_eq!(merchant_key("NETFLIX.COM"), "netflix com");
        assert_eq!(merchant_key("SQ *COFFEE-PLACE  12"), "sq coffee place 12");
    }

    #[test]
    fn test_merchant_key_truncates_trailing_order_numbers() {
        let a = merchant_key("AMAZON MKTPLACE PMTS ORDER 1234567890");
        let b = merchant_key("AMAZON MKTPLACE PMTS ORDER 9876543210");
        assert_eq!(a, b);
    }

    #[test]
    fn test_merchant_key_stable_for_case_variants() {
        assert_eq!(merchant_key("Netflix.Com"), merchant_key("NETFLIX.COM"));
    }
}
