// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LEDGERBOUND Gateway Node
//!
//! Entry point for the `ledgerbound-node` binary. Parses CLI arguments,
//! initializes logging and metrics, assembles the access protocol stack,
//! and serves the HTTP API plus the registry sweeper.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the access gateway
//! - `keygen`  — generate content / wallet key material
//! - `status`  — query a running gateway's status endpoint
//! - `version` — print build version information
//!
//! The `run` command wires the protocol to in-memory development
//! collaborators (ledger oracle, catalog, audit-to-log sink). Production
//! deployments embed `ledgerbound-protocol` behind their own oracle,
//! catalog, and locator implementations; this binary is the reference
//! gateway and the local development stack.

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use std::sync::Arc;
use tokio::signal;

use ledgerbound_protocol::access::{
    AccessConfig, AccessProtocol, ChallengeRegistry, RegistryConfig,
};
use ledgerbound_protocol::audit::{AuditSink, TracingAuditSink};
use ledgerbound_protocol::catalog::{ContentCatalog, ContentRecord, MemoryCatalog};
use ledgerbound_protocol::clock::{Clock, SystemClock};
use ledgerbound_protocol::crypto::derivation::{ResponseDerivation, SaltedSha256Derivation};
use ledgerbound_protocol::crypto::envelope;
use ledgerbound_protocol::locator::SignedPathIssuer;
use ledgerbound_protocol::oracle::{wallet_address, DevLedgerOracle, OwnershipOracle};

use cli::{Commands, LedgerboundCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LedgerboundCli::parse();

    match cli.command {
        Commands::Run(args) => run_gateway(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// One row of the JSON catalog seed file: content plus (optionally) who
/// owns it on the development ledger.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEntry {
    contract_address: String,
    token_id: u64,
    content_id: String,
    object_key: String,
    /// Hex-encoded 256-bit content key, as the publisher stored it.
    encryption_key: String,
    /// Hex-encoded Ed25519 verifying key to enroll as the owner's wallet.
    /// The owner address is derived from it.
    owner_public_key: Option<String>,
}

/// Starts the full gateway: access API, metrics endpoint, and the
/// registry sweeper.
async fn run_gateway(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "ledgerbound_node=info,ledgerbound_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        challenge_ttl_secs = args.challenge_ttl_secs,
        locator_ttl_secs = args.locator_ttl_secs,
        "starting ledgerbound-node"
    );

    // --- Time source ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- Challenge registry ---
    let registry = Arc::new(ChallengeRegistry::new(
        RegistryConfig {
            ttl: std::time::Duration::from_secs(args.challenge_ttl_secs),
            ..RegistryConfig::default()
        },
        Arc::clone(&clock),
    ));

    // --- Response derivation ---
    if args.derivation_secret.is_empty() {
        tracing::warn!(
            "running with the unsalted response derivation; set \
             LEDGERBOUND_DERIVATION_SECRET for anything beyond local development"
        );
    }
    let derivation: Arc<dyn ResponseDerivation> =
        Arc::new(SaltedSha256Derivation::new(args.derivation_secret.clone()));

    // --- Locator issuer ---
    let locator_key = match &args.locator_key {
        Some(hex_key) => {
            let bytes = hex::decode(hex_key).context("locator key is not valid hex")?;
            let key: [u8; 32] = bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("locator key must be exactly 32 bytes"))?;
            key
        }
        None => {
            tracing::warn!("no locator signing key configured, generating an ephemeral one");
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            key
        }
    };
    let locators = Arc::new(SignedPathIssuer::new(
        args.locator_base_url.clone(),
        locator_key,
        Arc::clone(&clock),
    ));

    // --- Development collaborators ---
    let ledger = DevLedgerOracle::new();
    let catalog = Arc::new(MemoryCatalog::new());

    if let Some(seed_path) = &args.seed {
        let raw = std::fs::read_to_string(seed_path)
            .with_context(|| format!("failed to read seed file: {}", seed_path.display()))?;
        let entries: Vec<SeedEntry> =
            serde_json::from_str(&raw).context("seed file is not valid JSON")?;
        for entry in entries {
            if let Some(pubkey_hex) = &entry.owner_public_key {
                let owner = enroll_from_hex(&ledger, pubkey_hex)
                    .with_context(|| format!("bad owner key for content {}", entry.content_id))?;
                ledger.set_owner(&entry.contract_address, entry.token_id, &owner);
            }
            catalog.publish(
                &entry.contract_address,
                entry.token_id,
                ContentRecord {
                    id: entry.content_id,
                    object_key: entry.object_key,
                    encryption_key: entry.encryption_key,
                },
            );
        }
        tracing::info!(records = catalog.len(), path = %seed_path.display(), "catalog seeded");
    }

    if args.dev {
        seed_dev_fixture(&ledger, &catalog);
    }

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Access protocol ---
    let protocol = Arc::new(AccessProtocol::new(
        Arc::new(ledger) as Arc<dyn OwnershipOracle>,
        Arc::clone(&catalog) as Arc<dyn ContentCatalog>,
        locators,
        Arc::new(TracingAuditSink) as Arc<dyn AuditSink>,
        Arc::clone(&registry),
        derivation,
        Arc::clone(&clock),
        AccessConfig {
            locator_ttl_secs: args.locator_ttl_secs,
            ..AccessConfig::default()
        },
    ));

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            ledgerbound_protocol::config::PROTOCOL_VERSION,
        ),
        protocol,
        registry: Arc::clone(&registry),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("access API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- Registry sweeper ---
    // Expired challenges are also reaped lazily on every mint; this loop
    // bounds how long an abandoned handshake can occupy memory.
    let sweeper_registry = Arc::clone(&registry);
    let sweeper_metrics = Arc::clone(&node_metrics);
    let sweep_interval = std::time::Duration::from_secs(args.sweep_interval_secs.max(1));
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let swept = sweeper_registry.sweep_expired();
            if swept > 0 {
                sweeper_metrics.challenges_swept_total.inc_by(swept as u64);
                tracing::debug!(swept, "expired challenges reclaimed");
            }
            sweeper_metrics
                .challenges_pending
                .set(sweeper_registry.len() as i64);
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    sweeper.abort();
    tracing::info!("ledgerbound-node stopped");
    Ok(())
}

/// Enrolls a wallet on the development ledger from a hex verifying key,
/// returning the derived address.
fn enroll_from_hex(ledger: &DevLedgerOracle, pubkey_hex: &str) -> Result<String> {
    let bytes = hex::decode(pubkey_hex).context("owner public key is not valid hex")?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("owner public key must be exactly 32 bytes"))?;
    let key = VerifyingKey::from_bytes(&array).context("not a valid Ed25519 point")?;
    Ok(ledger.enroll(key))
}

/// Publishes one demo record owned by a freshly generated wallet, and
/// prints everything a local client needs to run the handshake.
fn seed_dev_fixture(ledger: &DevLedgerOracle, catalog: &MemoryCatalog) {
    let wallet = SigningKey::generate(&mut OsRng);
    let address = ledger.enroll(wallet.verifying_key());
    ledger.set_owner("0xDEMO", 1, &address);

    let content_key = envelope::generate_key();
    catalog.publish(
        "0xDEMO",
        1,
        ContentRecord {
            id: "demo".into(),
            object_key: "demo/payload.bin".into(),
            encryption_key: content_key.clone(),
        },
    );

    println!("Development fixture ready.");
    println!("  Contract        : 0xDEMO");
    println!("  Token           : 1");
    println!("  Owner address   : {}", address);
    println!("  Wallet secret   : {}", hex::encode(wallet.to_bytes()));
    println!("  Content key     : {}", content_key);
    tracing::info!(owner = %address, "dev fixture published as 0xDEMO/1");
}

/// Generates key material and prints it to stdout.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    println!("Content encryption key : {}", envelope::generate_key());

    if args.wallet {
        let wallet = SigningKey::generate(&mut OsRng);
        println!("Wallet secret key      : {}", hex::encode(wallet.to_bytes()));
        println!(
            "Wallet public key      : {}",
            hex::encode(wallet.verifying_key().to_bytes())
        );
        println!(
            "Wallet address         : {}",
            wallet_address(&wallet.verifying_key())
        );
    }

    Ok(())
}

/// Queries a running gateway's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let body = http_get(&args.addr, "/status").await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP/1.1 GET over a raw TCP stream.
///
/// Good enough for a status poke at localhost; a real client should use a
/// real HTTP library.
async fn http_get(addr: &str, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    Ok(response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_else(|| response.to_string()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("ledgerbound-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "protocol         {}",
        ledgerbound_protocol::config::PROTOCOL_VERSION
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
