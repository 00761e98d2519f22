//! Crypto Utilities
//!
//! Hashing and address encoding helpers shared by key derivation and
//! address validation.

use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash (used for Ethereum addresses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw 20-byte address to its EIP-55 checksummed form
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() || nibble < 8 {
            result.push(ch);
        } else {
            result.push(ch.to_ascii_uppercase());
        }
    }

    result
}

/// Address derived from an uncompressed secp256k1 public key (64 bytes, no prefix)
pub fn address_from_public_key(public_key: &[u8]) -> String {
    let hash = keccak256(public_key);
    to_checksum_address(&hash[12..])
}
