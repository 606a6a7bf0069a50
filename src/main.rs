//! Mini-Bitcoin CLI Application
//!
//! Stateless utilities over the library: key generation, address
//! derivation, hashing and transaction decoding.

use clap::{Parser, Subcommand};
use mini_bitcoin::cli::{self, HashAlgorithm};
use mini_bitcoin::crypto::Network;

#[derive(Parser)]
#[command(name = "mini-bitcoin")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Bitcoin keys, addresses and legacy transactions from scratch", long_about = None)]
struct Cli {
    /// Network for address encoding (main or test)
    #[arg(short, long, global = true, default_value = "main")]
    network: Network,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair and its address
    Keygen {
        /// Use the 65-byte uncompressed public key form
        #[arg(short, long)]
        uncompressed: bool,

        /// Rebuild from an existing hex private key instead of generating one
        #[arg(long)]
        private_key: Option<String>,
    },

    /// Derive the address of a SEC-encoded public key
    Address {
        /// Hex public key (33 or 65 bytes)
        public_key: String,
    },

    /// Hash data
    Hash {
        /// Digest to compute
        #[arg(short, long, value_enum, default_value = "sha256")]
        algorithm: HashAlgorithm,

        /// Treat the input as hex instead of UTF-8 text
        #[arg(long)]
        hex: bool,

        /// Data to hash
        data: String,
    },

    /// Decode a raw legacy transaction
    DecodeTx {
        /// Hex-encoded transaction
        tx_hex: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen {
            uncompressed,
            private_key,
        } => {
            cli::cmd_keygen(cli.network, !uncompressed, private_key.as_deref())?;
        }
        Commands::Address { public_key } => {
            cli::cmd_address(&public_key, cli.network)?;
        }
        Commands::Hash {
            algorithm,
            hex,
            data,
        } => {
            cli::cmd_hash(algorithm, &data, hex)?;
        }
        Commands::DecodeTx { tx_hex } => {
            cli::cmd_decode_tx(&tx_hex, cli.network)?;
        }
    }

    Ok(())
}
