//! Command-line/env configuration, parsed the way the teacher turns an
//! `Opts` (clap derive) into a runtime `Config` via `TryFrom`.

use std::collections::HashMap;
use std::net::SocketAddr;

use clap::Parser;
use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::crypto::{base64_decode, Keystore};
use crate::ratelimit::RateLimitConfig;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RATE_LIMIT_CAPACITY: f64 = 30.0;
pub const DEFAULT_RATE_LIMIT_RPS: f64 = 10.0;
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Command-line options for the verification service.
#[derive(Parser, Debug)]
pub struct Opts {
    /// Port to listen on
    #[clap(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Base64-encoded Ed25519 private key. Absent means the service issues
    /// `UNSIGNED` receipts rather than refusing to run.
    #[clap(long, env = "ED25519_PRIVATE_KEY_BASE64")]
    pub ed25519_private_key_base64: Option<String>,

    /// Base64-encoded Ed25519 public key used as the verification fallback.
    #[clap(long, env = "ED25519_PUBLIC_KEY_BASE64")]
    pub ed25519_public_key_base64: Option<String>,

    /// `{kid: base64-pub}` JSON map, preferred over the single public key on
    /// a kid hit.
    #[clap(long, env = "ED25519_KEYS_JSON")]
    pub ed25519_keys_json: Option<String>,

    #[clap(long, env = "RATE_LIMIT_CAPACITY", default_value_t = DEFAULT_RATE_LIMIT_CAPACITY)]
    pub rate_limit_capacity: f64,

    #[clap(long, env = "RATE_LIMIT_RPS", default_value_t = DEFAULT_RATE_LIMIT_RPS)]
    pub rate_limit_rps: f64,

    #[clap(long, env = "RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: i64,
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub keystore: std::sync::Arc<Keystore>,
    pub rate_limit: RateLimitConfig,
    pub retention_days: i64,
}

impl Config {
    /// Parses the command-line options and returns a new [`Config`].
    pub fn parse_from_cli() -> eyre::Result<Self> {
        let opts = Opts::parse();
        Self::try_from(opts)
    }

    /// Builds a [`Config`] from environment variables alone, ignoring
    /// `std::env::args()` entirely. Used by binaries (the offline verifier)
    /// whose own CLI args are unrelated to these settings.
    pub fn from_env() -> eyre::Result<Self> {
        let opts = Opts::parse_from(["symbi-verify"]);
        Self::try_from(opts)
    }
}

impl TryFrom<Opts> for Config {
    type Error = eyre::Report;

    fn try_from(opts: Opts) -> Result<Self, Self::Error> {
        let mut keystore = Keystore::new();

        if let Some(b64) = &opts.ed25519_private_key_base64 {
            let bytes = base64_decode(b64).map_err(|e| eyre::eyre!("invalid private key base64: {e}"))?;
            let bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| eyre::eyre!("private key must decode to 32 bytes"))?;
            keystore = keystore.with_signing_key(SigningKey::from_bytes(&bytes));
        } else {
            tracing::info!("no signing key configured; receipts will be issued UNSIGNED");
        }

        if let Some(b64) = &opts.ed25519_public_key_base64 {
            let key = parse_verifying_key(b64)?;
            keystore = keystore.with_fallback_verify_key(key);
        }

        if let Some(json) = &opts.ed25519_keys_json {
            let raw: HashMap<String, String> =
                serde_json::from_str(json).map_err(|e| eyre::eyre!("invalid ED25519_KEYS_JSON: {e}"))?;
            let mut keys = HashMap::with_capacity(raw.len());
            for (kid, b64) in raw {
                keys.insert(kid, parse_verifying_key(&b64)?);
            }
            keystore = keystore.with_verify_keys(keys);
        }

        Ok(Config {
            addr: SocketAddr::from(([0, 0, 0, 0], opts.port)),
            keystore: std::sync::Arc::new(keystore),
            rate_limit: RateLimitConfig {
                capacity: opts.rate_limit_capacity,
                refill_per_sec: opts.rate_limit_rps,
            },
            retention_days: opts.retention_days,
        })
    }
}

fn parse_verifying_key(b64: &str) -> eyre::Result<VerifyingKey> {
    let bytes = base64_decode(b64).map_err(|e| eyre::eyre!("invalid public key base64: {e}"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| eyre::eyre!("public key must decode to 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| eyre::eyre!("invalid public key: {e}"))
}
