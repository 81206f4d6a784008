//! Wraps a receipt with scope, transparency log, Merkle proofs, and outer
//! (advisory) gateway/audit signatures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{sha256_hex_bytes, Keystore};
use crate::merkle::{build_proofs, merkle_root, Proof};
use crate::receipt::{Receipt, ReceiptFields};

pub const TICKET_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub allow_raw: bool,
    pub allow_training: bool,
    pub max_retention_days: u32,
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyEvent {
    pub who: String,
    pub what: String,
    pub when: DateTime<Utc>,
    pub cbt_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OuterSignatures {
    pub gateway: String,
    pub audit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipts {
    pub sybi: Receipt,
    pub shard_manifests: Vec<String>,
    pub merkle_root: String,
    pub merkle_proofs: Vec<Proof>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_version: String,
    pub summary: String,
    pub receipts: Receipts,
    pub scope: Scope,
    pub transparency_log: Vec<TransparencyEvent>,
    pub signatures: OuterSignatures,
}

/// Splits opaque validation data into an ordered list of byte shards.
/// The default strategy treats the whole payload as a single shard;
/// callers with a natural multi-shard structure (e.g. one shard per
/// sub-receipt) can derive their own `Vec<Vec<u8>>` before calling
/// [`TicketBuilder::build`].
pub fn default_shards(data: &Value) -> Vec<Vec<u8>> {
    vec![serde_json::to_vec(data).unwrap_or_default()]
}

pub struct TicketBuilder;

#[allow(clippy::too_many_arguments)]
pub struct BuildArgs {
    pub tenant_id: String,
    pub conversation_id: String,
    pub output_id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub policy_pack: String,
    pub shards: Vec<Vec<u8>>,
    pub sub_receipts: SubReceipts,
    pub scope: Scope,
    pub transparency_log: Vec<TransparencyEvent>,
    pub summary: String,
}

#[derive(Default)]
pub struct SubReceipts {
    pub reality: Value,
    pub trust: Value,
    pub ethics: Value,
    pub resonance: Value,
    pub parity: Value,
}

impl TicketBuilder {
    /// Hashes `args.shards` into leaves, builds the Merkle tree, constructs
    /// and dual-signs the inner receipt, and assembles the outer envelope.
    /// `gateway`/`audit` sign tenant-scoped strings, not the receipt
    /// subject — `/verify` never consults these outer signatures.
    pub fn build(
        args: BuildArgs,
        control_plane: &Keystore,
        agent: &Keystore,
        gateway: &Keystore,
        audit: &Keystore,
    ) -> Ticket {
        let shard_hashes: Vec<String> =
            args.shards.iter().map(|s| sha256_hex_bytes(s)).collect();
        let shard_manifests: Vec<String> =
            shard_hashes.iter().map(|h| format!("manifest:{h}")).collect();

        let root = merkle_root(&shard_hashes);
        let proofs = build_proofs(&shard_hashes);

        let mut receipt = Receipt::new(ReceiptFields {
            tenant_id: args.tenant_id.clone(),
            conversation_id: args.conversation_id,
            output_id: args.output_id,
            created_at: args.created_at,
            model: args.model,
            policy_pack: args.policy_pack,
            shard_hashes,
            reality_receipt: args.sub_receipts.reality,
            trust_receipt: args.sub_receipts.trust,
            ethics_receipt: args.sub_receipts.ethics,
            resonance_receipt: args.sub_receipts.resonance,
            parity_receipt: args.sub_receipts.parity,
        });
        receipt.sign_dual(control_plane, agent);

        let outer_scope_string = format!("{}:{}", args.tenant_id, root);
        let signatures = OuterSignatures {
            gateway: gateway.sign(outer_scope_string.as_bytes()),
            audit: audit.sign(outer_scope_string.as_bytes()),
        };

        Ticket {
            ticket_version: TICKET_VERSION.to_string(),
            summary: args.summary,
            receipts: Receipts {
                sybi: receipt,
                shard_manifests,
                merkle_root: root,
                merkle_proofs: proofs,
            },
            scope: args.scope,
            transparency_log: args.transparency_log,
            signatures,
        }
    }
}

/// Per-check outcome of the crypto/Merkle portion of verification
/// (spec steps 3-6), shared verbatim between the HTTP `/verify` handler and
/// the offline CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checks {
    #[serde(rename = "merkleOk")]
    pub merkle_ok: bool,
    #[serde(rename = "proofOk")]
    pub proof_ok: bool,
    #[serde(rename = "sigCtrlOk")]
    pub sig_ctrl_ok: bool,
    #[serde(rename = "sigAgentOk")]
    pub sig_agent_ok: bool,
}

impl Checks {
    pub fn valid(&self) -> bool {
        self.merkle_ok && self.proof_ok && (self.sig_ctrl_ok || self.sig_agent_ok)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Checks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recomputes the Merkle root and walks every proof (steps 3-4), then
/// re-verifies both inner receipt signatures (step 5) and aggregates
/// (step 6). Does not consult revocation — callers that have a revocation
/// store check it first and short-circuit before calling this.
pub fn verify_ticket_crypto(ticket: &Ticket, control_plane: &Keystore, agent: &Keystore) -> Checks {
    let recomputed_root = merkle_root(&ticket.receipts.sybi.shard_hashes);
    let merkle_ok = recomputed_root == ticket.receipts.merkle_root;

    let proof_ok = ticket.receipts.merkle_proofs.len() == ticket.receipts.sybi.shard_hashes.len()
        && ticket
            .receipts
            .merkle_proofs
            .iter()
            .all(|p| p.verify(&ticket.receipts.merkle_root));

    let (sig_ctrl_ok, sig_agent_ok) = ticket.receipts.sybi.verify_signatures(control_plane, agent);

    Checks {
        merkle_ok,
        proof_ok,
        sig_ctrl_ok,
        sig_agent_ok,
    }
}
