//! Display helpers for addresses and secrets.

/// Character used to mask secrets
pub const MASK_CHAR: char = '•';

/// Shorten an address for display: `0x9858...da94`
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }

    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Masked form of a private key; always 64 mask characters so the length
/// of the real key is not revealed
pub fn mask_private_key(_private_key: &str) -> String {
    std::iter::repeat(MASK_CHAR).take(64).collect()
}

/// Masked form of a recovery phrase; keeps the word count visible
pub fn mask_mnemonic(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|_| std::iter::repeat(MASK_CHAR).take(5).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"),
            "0x9858...da94"
        );
        assert_eq!(format_address(""), "");
        assert_eq!(format_address("0x1234"), "0x1234");
    }

    #[test]
    fn test_masks() {
        let masked = mask_private_key("0x1ab4");
        assert_eq!(masked.chars().count(), 64);
        assert!(masked.chars().all(|c| c == MASK_CHAR));

        let phrase = mask_mnemonic("one two three");
        assert_eq!(phrase.split(' ').count(), 3);
        assert!(!phrase.contains("one"));
    }
}
