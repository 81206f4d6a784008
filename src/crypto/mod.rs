//! Hashing, base64 codec, and Ed25519 sign/verify with keyed-id resolution.

mod keys;

pub use keys::{Keystore, SignatureField};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

/// SHA-256 of the UTF-8 bytes of `input`, as 64 lowercase hex characters.
pub fn sha256_hex(input: &str) -> String {
    sha256_hex_bytes(input.as_bytes())
}

/// SHA-256 of arbitrary bytes, as 64 lowercase hex characters.
pub fn sha256_hex_bytes(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    hex::encode(digest)
}

/// Standard RFC 4648 base64 with padding on encode.
pub fn base64_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

/// Decodes standard base64, accepting input with or without `=` padding.
/// Rejects any character outside the canonical alphabet.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
    use base64::alphabet::STANDARD as STANDARD_ALPHABET;

    let lenient = GeneralPurpose::new(
        &STANDARD_ALPHABET,
        GeneralPurposeConfig::new().with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
    );
    lenient.decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hash_matches_published_constant() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn base64_round_trips_all_lengths() {
        for len in [0usize, 1, 2, 3, 4, 5, 31, 32, 33] {
            let data: Vec<u8> = (0..len as u8).collect();
            let encoded = base64_encode(&data);
            let decoded = base64_decode(&encoded).unwrap();
            assert_eq!(decoded, data);
        }
    }

    #[test]
    fn base64_decode_accepts_unpadded_input() {
        let data = b"hello world";
        let padded = base64_encode(data);
        let unpadded = padded.trim_end_matches('=');
        assert_eq!(base64_decode(unpadded).unwrap(), data);
    }

    #[test]
    fn base64_decode_rejects_non_canonical_characters() {
        assert!(base64_decode("not a valid b64!!").is_err());
    }
}
