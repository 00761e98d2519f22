//! Address and Mnemonic Validation
//!
//! Pure predicates used by the setup flow before any key material is touched.

use crate::utils::crypto::to_checksum_address;

/// Word counts a recovery phrase may have
pub const ALLOWED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Check whether a phrase looks like a recovery phrase.
///
/// Only the shape is checked: an allowed word count and ASCII letters
/// separated by whitespace. Wordlist membership and the checksum are left to
/// key derivation. Phrases from non-English wordlists are rejected here.
pub fn is_valid_mnemonic_format(phrase: &str) -> bool {
    let word_count = phrase.split_whitespace().count();
    if !ALLOWED_WORD_COUNTS.contains(&word_count) {
        return false;
    }

    phrase
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

/// Check whether a string is a well-formed `0x` + 40 hex character address
pub fn is_valid_address(address: &str) -> bool {
    normalize_address(address).is_some()
}

/// Validate an address and return its EIP-55 checksummed form.
///
/// All-lowercase and all-uppercase hex carry no checksum and are accepted.
/// Mixed case must match the EIP-55 checksum exactly.
pub fn normalize_address(address: &str) -> Option<String> {
    let hex_part = address.strip_prefix("0x")?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let bytes = hex::decode(hex_part).ok()?;
    let checksummed = to_checksum_address(&bytes);

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && checksummed[2..] != *hex_part {
        return None;
    }

    Some(checksummed)
}
