//! Offline ticket verifier. Performs the same Merkle/signature checks as
//! the HTTP service's `/verify` (spec steps 3-6) without any server state —
//! there is no revocation lookup, since there is no live revocation store
//! to consult offline.

use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use symbi_ticket::config::Config;
use symbi_ticket::ledger::{Anchor, ExternalAnchor};
use symbi_ticket::ticket::{verify_ticket_crypto, Ticket, Verdict};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a ticket JSON file and print the verdict
    #[command(name = "verify:ticket")]
    VerifyTicket(VerifyTicketArgs),
    /// Dump all anchors and external anchors from a ledger export as JSON
    #[command(name = "anchors:export")]
    AnchorsExport(AnchorsExportArgs),
}

#[derive(Args)]
struct VerifyTicketArgs {
    path: String,
}

#[derive(Args)]
struct AnchorsExportArgs {
    /// Path to a JSON ledger export containing `anchors` and
    /// `external_anchors` arrays (as produced by the service's ledger state)
    path: String,
}

#[derive(serde::Deserialize)]
struct LedgerExport {
    #[serde(default)]
    anchors: Vec<Anchor>,
    #[serde(default)]
    external_anchors: Vec<(Uuid, ExternalAnchor)>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::VerifyTicket(args) => verify_ticket_cmd(&args.path),
        Commands::AnchorsExport(args) => anchors_export_cmd(&args.path),
    }
}

fn verify_ticket_cmd(path: &str) -> ExitCode {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, path, "failed to read ticket file");
            print_verdict(&Verdict {
                valid: false,
                checks: None,
                root: None,
                error: Some(format!("failed to read ticket file: {err}")),
            });
            return ExitCode::from(2);
        }
    };

    let ticket: Ticket = match serde_json::from_str(&contents) {
        Ok(t) => t,
        Err(err) => {
            tracing::error!(%err, "malformed ticket JSON");
            print_verdict(&Verdict {
                valid: false,
                checks: None,
                root: None,
                error: Some(format!("malformed ticket JSON: {err}")),
            });
            return ExitCode::from(2);
        }
    };

    // The offline verifier has no server-configured keystore; it trusts the
    // keystore built from whatever ED25519_* environment variables are set,
    // exactly as the service would on startup.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, "invalid key configuration");
            print_verdict(&Verdict {
                valid: false,
                checks: None,
                root: None,
                error: Some(format!("invalid key configuration: {err}")),
            });
            return ExitCode::from(2);
        }
    };

    let checks = verify_ticket_crypto(&ticket, &config.keystore, &config.keystore);
    let valid = checks.valid();
    let verdict = Verdict {
        valid,
        checks: Some(checks),
        root: Some(ticket.receipts.merkle_root.clone()),
        error: None,
    };
    print_verdict(&verdict);

    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn anchors_export_cmd(path: &str) -> ExitCode {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, path, "failed to read ledger export");
            eprintln!("failed to read ledger export: {err}");
            return ExitCode::from(2);
        }
    };

    let export: LedgerExport = match serde_json::from_str(&contents) {
        Ok(e) => e,
        Err(err) => {
            tracing::error!(%err, "malformed ledger export JSON");
            eprintln!("malformed ledger export JSON: {err}");
            return ExitCode::from(2);
        }
    };

    let out = serde_json::json!({
        "anchors": export.anchors,
        "external_anchors": export.external_anchors,
    });
    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    ExitCode::SUCCESS
}

fn print_verdict(verdict: &Verdict) {
    println!("{}", serde_json::to_string(verdict).unwrap_or_default());
}
