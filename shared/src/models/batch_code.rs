//! Production batch codes
//!
//! A code is a two-character product prefix followed by a six-character
//! random suffix, e.g. `MS` + `7KQ2MX` for "Mango Smoothie". Characters that
//! are easy to misread on labels (0/O, 1/I) never appear in the suffix and
//! are substituted out of the prefix.

use rand::Rng;

/// Suffix alphabet without 0, O, 1, I
pub const BATCH_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const BATCH_CODE_PREFIX_LEN: usize = 2;
pub const BATCH_CODE_SUFFIX_LEN: usize = 6;
pub const BATCH_CODE_LEN: usize = BATCH_CODE_PREFIX_LEN + BATCH_CODE_SUFFIX_LEN;

/// Prefix used when the product name yields no usable letters
pub const FALLBACK_PREFIX: &str = "PR";

/// Replace characters that read ambiguously next to the suffix alphabet
pub fn substitute_confusable(c: char) -> char {
    match c {
        'O' => 'P',
        'I' => 'J',
        '0' => '2',
        '1' => '3',
        other => other,
    }
}

/// Two-character prefix from the initials of a product's Latin name.
///
/// Words are split on whitespace and each word's first character is taken
/// when it is an ASCII letter or digit. A single-word name is topped up with
/// that word's following characters, e.g. "Orange" -> "OR" -> "PR".
pub fn batch_code_prefix(product_name: &str) -> String {
    let mut prefix: String = product_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .filter(char::is_ascii_alphanumeric)
        .take(BATCH_CODE_PREFIX_LEN)
        .collect();

    if prefix.is_empty() {
        return FALLBACK_PREFIX.to_string();
    }

    if prefix.len() < BATCH_CODE_PREFIX_LEN {
        let top_up = product_name
            .split_whitespace()
            .find(|word| word.starts_with(|c: char| c.is_ascii_alphanumeric()))
            .map(|word| {
                word.chars()
                    .skip(1)
                    .filter(char::is_ascii_alphanumeric)
                    .collect::<String>()
            })
            .unwrap_or_default();
        prefix.extend(top_up.chars().take(BATCH_CODE_PREFIX_LEN - prefix.len()));
    }

    while prefix.len() < BATCH_CODE_PREFIX_LEN {
        prefix.push(FALLBACK_PREFIX.as_bytes()[prefix.len()] as char);
    }

    prefix
        .chars()
        .map(|c| substitute_confusable(c.to_ascii_uppercase()))
        .collect()
}

/// Random suffix drawn from [`BATCH_CODE_ALPHABET`]
pub fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..BATCH_CODE_SUFFIX_LEN)
        .map(|_| BATCH_CODE_ALPHABET[rng.gen_range(0..BATCH_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Candidate code for a product; uniqueness is checked by the caller
pub fn generate_batch_code<R: Rng>(product_name: &str, rng: &mut R) -> String {
    format!("{}{}", batch_code_prefix(product_name), random_suffix(rng))
}

/// Keep the prefix of `code` and draw a new suffix
pub fn regenerate_suffix<R: Rng>(code: &str, rng: &mut R) -> String {
    let prefix: String = code.chars().take(BATCH_CODE_PREFIX_LEN).collect();
    format!("{}{}", prefix, random_suffix(rng))
}

fn is_prefix_char(c: char) -> bool {
    (c.is_ascii_uppercase() && c != 'O' && c != 'I') || ('2'..='9').contains(&c)
}

fn is_suffix_char(c: char) -> bool {
    c.is_ascii() && BATCH_CODE_ALPHABET.contains(&(c as u8))
}

/// Whether `code` has the shape of a generated batch code
pub fn is_valid_batch_code(code: &str) -> bool {
    code.len() == BATCH_CODE_LEN
        && code.chars().take(BATCH_CODE_PREFIX_LEN).all(is_prefix_char)
        && code.chars().skip(BATCH_CODE_PREFIX_LEN).all(is_suffix_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_prefix_from_initials() {
        assert_eq!(batch_code_prefix("Mango Smoothie"), "MS");
        assert_eq!(batch_code_prefix("apple guava mix"), "AG");
    }

    #[test]
    fn test_prefix_substitutes_confusables() {
        assert_eq!(batch_code_prefix("Orange Juice"), "PJ");
        assert_eq!(batch_code_prefix("Ice Orange"), "JP");
        assert_eq!(batch_code_prefix("100 Lime"), "3L");
        assert_eq!(batch_code_prefix("0 Sugar"), "2S");
    }

    #[test]
    fn test_prefix_single_word_topped_up() {
        assert_eq!(batch_code_prefix("Orange"), "PR");
        assert_eq!(batch_code_prefix("Kale"), "KA");
        assert_eq!(batch_code_prefix("X"), "XR");
    }

    #[test]
    fn test_prefix_fallback() {
        assert_eq!(batch_code_prefix(""), "PR");
        assert_eq!(batch_code_prefix("   "), "PR");
        assert_eq!(batch_code_prefix("น้ำส้ม คั้นสด"), "PR");
    }

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for name in ["Orange Juice", "Lime Soda", "", "Pineapple"] {
            let code = generate_batch_code(name, &mut rng);
            assert_eq!(code.len(), BATCH_CODE_LEN);
            assert!(is_valid_batch_code(&code), "invalid code {}", code);
        }
    }

    #[test]
    fn test_regenerate_keeps_prefix() {
        let mut rng = StdRng::seed_from_u64(11);
        let code = generate_batch_code("Mango Smoothie", &mut rng);
        let next = regenerate_suffix(&code, &mut rng);
        assert_eq!(&next[..2], "MS");
        assert!(is_valid_batch_code(&next));
    }

    #[test]
    fn test_invalid_codes() {
        assert!(!is_valid_batch_code("OJ7KQ2MX"));
        assert!(!is_valid_batch_code("MS7KQ2M0"));
        assert!(!is_valid_batch_code("MS7KQ2"));
        assert!(!is_valid_batch_code("ms7kq2mx"));
        assert!(is_valid_batch_code("MS7KQ2MX"));
    }
}
