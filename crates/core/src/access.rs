//! Access codes and phone matching for customer lookup.
//!
//! The code + exact phone pair is the primary lookup credential; the
//! name + phone-suffix pair is a deliberately loose "forgot my code"
//! recovery path, not a security boundary.

use rand::Rng;

/// Length of a generated access code.
pub const ACCESS_CODE_LEN: usize = 6;

/// Number of trailing digits compared by the loose phone match.
pub const PHONE_SUFFIX_LEN: usize = 7;

/// Generate a fresh 6-digit access code.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..ACCESS_CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// A stored code is considered valid when it is at least
/// [`ACCESS_CODE_LEN`] characters after trimming. Valid codes are
/// never regenerated, including hand-issued non-numeric ones.
pub fn code_is_valid(code: &str) -> bool {
    code.trim().len() >= ACCESS_CODE_LEN
}

/// Strip a phone number down to its digits.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Exact match on normalized phone numbers.
pub fn phone_matches(stored: &str, query: &str) -> bool {
    let stored = normalize_phone(stored);
    !stored.is_empty() && stored == normalize_phone(query)
}

/// Loose match on the last [`PHONE_SUFFIX_LEN`] digits of both numbers.
pub fn phone_suffix_matches(stored: &str, query: &str) -> bool {
    let stored = normalize_phone(stored);
    let query = normalize_phone(query);
    if stored.is_empty() || query.is_empty() {
        return false;
    }
    let stored_tail = &stored[stored.len().saturating_sub(PHONE_SUFFIX_LEN)..];
    let query_tail = &query[query.len().saturating_sub(PHONE_SUFFIX_LEN)..];
    stored_tail == query_tail
}

/// Case-insensitive substring match of the query against the stored name.
pub fn name_matches(stored: &str, query: &str) -> bool {
    let query = query.trim();
    !query.is_empty() && stored.to_lowercase().contains(&query.to_lowercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- generate_code / code_is_valid --

    #[test]
    fn generated_code_is_six_digits() {
        let code = generate_code();
        assert_eq!(code.len(), ACCESS_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn generated_code_is_valid() {
        assert!(code_is_valid(&generate_code()));
    }

    #[test]
    fn short_code_invalid() {
        assert!(!code_is_valid("12345"));
    }

    #[test]
    fn empty_code_invalid() {
        assert!(!code_is_valid(""));
    }

    #[test]
    fn whitespace_padding_does_not_count() {
        assert!(!code_is_valid("  123  "));
    }

    #[test]
    fn longer_code_valid() {
        assert!(code_is_valid("1234567"));
    }

    #[test]
    fn hand_issued_alphanumeric_code_valid() {
        // Legacy hand-issued codes are kept, never regenerated.
        assert!(code_is_valid("abc123"));
    }

    // -- normalize_phone --

    #[test]
    fn normalize_strips_formatting() {
        assert_eq!(normalize_phone("(555) 123-4567"), "5551234567");
        assert_eq!(normalize_phone("+1 555.123.4567"), "15551234567");
        assert_eq!(normalize_phone("no digits"), "");
    }

    // -- phone_matches --

    #[test]
    fn exact_match_ignores_formatting() {
        assert!(phone_matches("5551234567", "(555) 123-4567"));
    }

    #[test]
    fn exact_match_rejects_different_numbers() {
        assert!(!phone_matches("5551234567", "5559876543"));
    }

    #[test]
    fn exact_match_rejects_empty() {
        assert!(!phone_matches("", ""));
    }

    // -- phone_suffix_matches --

    #[test]
    fn suffix_match_ignores_country_code() {
        assert!(phone_suffix_matches("5551234567", "+1 555 123 4567"));
    }

    #[test]
    fn suffix_match_on_last_seven() {
        // Different area codes, same local number.
        assert!(phone_suffix_matches("2061234567", "4251234567"));
    }

    #[test]
    fn suffix_mismatch_rejected() {
        assert!(!phone_suffix_matches("5551234567", "5551239999"));
    }

    #[test]
    fn suffix_match_rejects_empty_sides() {
        assert!(!phone_suffix_matches("", "5551234567"));
        assert!(!phone_suffix_matches("5551234567", "n/a"));
    }

    // -- name_matches --

    #[test]
    fn name_match_is_case_insensitive_substring() {
        assert!(name_matches("Jane Doe", "jane"));
        assert!(name_matches("Jane Doe", "DOE"));
        assert!(name_matches("Jane Doe", " Jane Doe "));
    }

    #[test]
    fn name_match_rejects_blank_query() {
        assert!(!name_matches("Jane Doe", "   "));
    }

    #[test]
    fn name_match_rejects_non_substring() {
        assert!(!name_matches("Jane Doe", "John"));
    }
}
