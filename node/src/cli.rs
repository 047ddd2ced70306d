//! # CLI Interface
//!
//! Defines the command-line argument structure for `ledgerbound-node`
//! using `clap` derive. Supports four subcommands: `run`, `keygen`,
//! `status`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LEDGERBOUND content access gateway.
///
/// Serves the two-phase challenge-response API that exchanges proof of
/// NFT ownership for one-time decryption keys and expiring content
/// locators, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "ledgerbound-node",
    about = "LEDGERBOUND content access gateway",
    version,
    propagate_version = true
)]
pub struct LedgerboundCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the gateway binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the access gateway.
    Run(RunArgs),
    /// Generate a fresh content encryption key (and optionally a demo
    /// wallet keypair) and print them to stdout.
    Keygen(KeygenArgs),
    /// Query the status of a running gateway via its HTTP endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP access API.
    #[arg(long, env = "LEDGERBOUND_RPC_PORT", default_value_t = 9760)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "LEDGERBOUND_METRICS_PORT", default_value_t = 9761)]
    pub metrics_port: u16,

    /// Challenge lifetime in seconds.
    #[arg(long, env = "LEDGERBOUND_CHALLENGE_TTL", default_value_t = 300)]
    pub challenge_ttl_secs: u64,

    /// Interval between registry sweeps in seconds.
    #[arg(long, env = "LEDGERBOUND_SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Content locator lifetime in seconds.
    #[arg(long, env = "LEDGERBOUND_LOCATOR_TTL", default_value_t = 3600)]
    pub locator_ttl_secs: u64,

    /// Base URL the locator issuer mints under.
    #[arg(long, env = "LEDGERBOUND_LOCATOR_BASE", default_value = "https://content.local/o")]
    pub locator_base_url: String,

    /// Hex-encoded 32-byte locator signing key.
    ///
    /// Generated fresh at startup when omitted — fine for development,
    /// wrong for anything with more than one gateway instance.
    #[arg(long, env = "LEDGERBOUND_LOCATOR_KEY")]
    pub locator_key: Option<String>,

    /// Deployment secret folded into the challenge response derivation.
    ///
    /// **Never pass this flag on the command line in production** — use
    /// the environment variable so it stays out of shell history.
    #[arg(long, env = "LEDGERBOUND_DERIVATION_SECRET", default_value = "")]
    pub derivation_secret: String,

    /// Path to a JSON catalog seed file (see `SeedEntry` in main.rs).
    #[arg(long, short = 's', env = "LEDGERBOUND_SEED")]
    pub seed: Option<PathBuf>,

    /// Development mode: enroll a demo wallet, publish a demo record, and
    /// print the wallet's signing key so a client can complete the
    /// handshake locally.
    #[arg(long)]
    pub dev: bool,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "LEDGERBOUND_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Also generate an Ed25519 demo wallet keypair.
    #[arg(long)]
    pub wallet: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Address of the running gateway's HTTP API.
    #[arg(long, default_value = "127.0.0.1:9760")]
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        LedgerboundCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_protocol_constants() {
        let cli = LedgerboundCli::parse_from(["ledgerbound-node", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.rpc_port, 9760);
        assert_eq!(args.challenge_ttl_secs, 300);
        assert_eq!(args.locator_ttl_secs, 3600);
        assert!(!args.dev);
    }
}
