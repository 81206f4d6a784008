use std::collections::HashMap;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use super::{base64_decode, base64_encode, sha256_hex_bytes};

const SENTINEL_UNSIGNED: &str = "UNSIGNED";

/// Either a verification map (`kid -> VerifyingKey`, preferred on a kid hit)
/// or a single fallback key used regardless of the presented kid when the
/// map doesn't list it.
#[derive(Debug, Clone, Default)]
pub struct Keystore {
    signing_key: Option<SigningKey>,
    verify_keys: HashMap<String, VerifyingKey>,
    fallback_key: Option<VerifyingKey>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the single active signing key. The active signing key's
    /// verifying key is also installed as the fallback verification key so
    /// self-issued receipts can be verified by the same process.
    pub fn with_signing_key(mut self, signing_key: SigningKey) -> Self {
        self.fallback_key.get_or_insert(signing_key.verifying_key());
        self.signing_key = Some(signing_key);
        self
    }

    pub fn with_fallback_verify_key(mut self, key: VerifyingKey) -> Self {
        self.fallback_key = Some(key);
        self
    }

    pub fn with_verify_keys(mut self, keys: HashMap<String, VerifyingKey>) -> Self {
        self.verify_keys = keys;
        self
    }

    /// The kid of the active signing key, if any: the SHA-256 hex digest of
    /// the hex-encoded public key bytes.
    pub fn active_kid(&self) -> Option<String> {
        self.signing_key.as_ref().map(|sk| kid_of(&sk.verifying_key()))
    }

    /// Signs `payload`, producing the `"Ed25519:<kid>:<b64>"` wire form, or
    /// the `"UNSIGNED"` sentinel when no signing key is configured.
    pub fn sign(&self, payload: &[u8]) -> String {
        match &self.signing_key {
            Some(sk) => {
                let sig = sk.sign(payload);
                let kid = kid_of(&sk.verifying_key());
                format!("Ed25519:{kid}:{}", base64_encode(&sig.to_bytes()))
            }
            None => SENTINEL_UNSIGNED.to_string(),
        }
    }

    /// Verifies a `"Ed25519:<kid>:<b64>"` signature field against `payload`.
    /// Any other non-`UNSIGNED` form, or `UNSIGNED` itself, verifies false.
    /// The map is consulted before the fallback key; a kid embedded in the
    /// field that doesn't match the resolved key's own kid always fails,
    /// even if the signature bytes happen to verify under that key.
    pub fn verify(&self, payload: &[u8], field: &SignatureField) -> bool {
        let (kid, sig_b64) = match field {
            SignatureField::Ed25519 { kid, sig_base64 } => (kid, sig_base64),
            SignatureField::Unsigned => return false,
        };

        let Some(key) = self.resolve(kid) else {
            return false;
        };
        if &kid_of(&key) != kid {
            return false;
        }

        let Ok(sig_bytes) = base64_decode(sig_b64) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig_bytes.try_into() else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        key.verify(payload, &sig).is_ok()
    }

    fn resolve(&self, kid: &str) -> Option<VerifyingKey> {
        if let Some(key) = self.verify_keys.get(kid) {
            return Some(*key);
        }
        self.fallback_key
    }
}

fn kid_of(key: &VerifyingKey) -> String {
    let hex_pub = hex::encode(key.as_bytes());
    sha256_hex_bytes(hex_pub.as_bytes())
}

/// A parsed signature wire field: `"Ed25519:<kid>:<b64>"` or `"UNSIGNED"`.
/// Any other form is simply not representable — callers treat a parse
/// failure as an invalid signature without attempting verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureField {
    Ed25519 { kid: String, sig_base64: String },
    Unsigned,
}

impl SignatureField {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == SENTINEL_UNSIGNED {
            return Some(SignatureField::Unsigned);
        }
        let mut parts = raw.splitn(3, ':');
        let (alg, kid, sig) = (parts.next()?, parts.next()?, parts.next()?);
        if alg != "Ed25519" || parts.next().is_some() {
            return None;
        }
        if kid.is_empty() || sig.is_empty() {
            return None;
        }
        Some(SignatureField::Ed25519 {
            kid: kid.to_string(),
            sig_base64: sig.to_string(),
        })
    }

    pub fn as_wire(&self) -> String {
        match self {
            SignatureField::Unsigned => SENTINEL_UNSIGNED.to_string(),
            SignatureField::Ed25519 { kid, sig_base64 } => {
                format!("Ed25519:{kid}:{sig_base64}")
            }
        }
    }
}
