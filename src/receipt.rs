//! Canonical receipt subject serialization and dual Ed25519 signatures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{sha256_hex, Keystore, SignatureField};

pub const RECEIPT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signatures {
    pub control_plane: String,
    pub agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_version: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub output_id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub policy_pack: String,
    pub shard_hashes: Vec<String>,

    #[serde(default)]
    pub reality_receipt: Value,
    #[serde(default)]
    pub trust_receipt: Value,
    #[serde(default)]
    pub ethics_receipt: Value,
    #[serde(default)]
    pub resonance_receipt: Value,
    #[serde(default)]
    pub parity_receipt: Value,

    pub signatures: Signatures,
}

#[allow(clippy::too_many_arguments)]
pub struct ReceiptFields {
    pub tenant_id: String,
    pub conversation_id: String,
    pub output_id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub policy_pack: String,
    pub shard_hashes: Vec<String>,
    pub reality_receipt: Value,
    pub trust_receipt: Value,
    pub ethics_receipt: Value,
    pub resonance_receipt: Value,
    pub parity_receipt: Value,
}

impl Receipt {
    /// Builds an unsigned receipt (both signature fields set to `"UNSIGNED"`).
    pub fn new(fields: ReceiptFields) -> Self {
        Self {
            receipt_version: RECEIPT_VERSION.to_string(),
            tenant_id: fields.tenant_id,
            conversation_id: fields.conversation_id,
            output_id: fields.output_id,
            created_at: fields.created_at,
            model: fields.model,
            policy_pack: fields.policy_pack,
            shard_hashes: fields.shard_hashes,
            reality_receipt: fields.reality_receipt,
            trust_receipt: fields.trust_receipt,
            ethics_receipt: fields.ethics_receipt,
            resonance_receipt: fields.resonance_receipt,
            parity_receipt: fields.parity_receipt,
            signatures: Signatures {
                control_plane: "UNSIGNED".to_string(),
                agent: "UNSIGNED".to_string(),
            },
        }
    }

    /// The canonical `|`-joined subject string (spec §4.3 step 1).
    pub fn subject(&self) -> String {
        [
            self.receipt_version.as_str(),
            self.tenant_id.as_str(),
            self.conversation_id.as_str(),
            self.output_id.as_str(),
            &self.created_at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            self.model.as_str(),
            self.policy_pack.as_str(),
            &self.shard_hashes.join(","),
        ]
        .join("|")
    }

    /// The UTF-8 bytes actually signed: the hex digest of the subject, not
    /// the raw subject bytes and not the binary digest.
    pub fn subject_bytes(&self) -> Vec<u8> {
        sha256_hex(&self.subject()).into_bytes()
    }

    /// Signs the subject under both the control-plane and agent planes
    /// using the same key — in this deployment both planes share one
    /// signing identity, but the two signature fields remain independent
    /// so a disjunctive (OR) verification remains meaningful when one
    /// plane is signed out-of-band by a different process.
    pub fn sign_dual(&mut self, control_plane: &Keystore, agent: &Keystore) {
        let payload = self.subject_bytes();
        self.signatures.control_plane = control_plane.sign(&payload);
        self.signatures.agent = agent.sign(&payload);
    }

    /// Verifies both signature fields independently. A field with an
    /// unparseable format (neither `"Ed25519:<kid>:<b64>"` nor `"UNSIGNED"`)
    /// is rejected as `false` without attempting cryptographic verification.
    pub fn verify_signatures(&self, control_plane: &Keystore, agent: &Keystore) -> (bool, bool) {
        let payload = self.subject_bytes();

        let ctrl_ok = SignatureField::parse(&self.signatures.control_plane)
            .map(|f| control_plane.verify(&payload, &f))
            .unwrap_or(false);

        let agent_ok = SignatureField::parse(&self.signatures.agent)
            .map(|f| agent.verify(&payload, &f))
            .unwrap_or(false);

        (ctrl_ok, agent_ok)
    }
}
