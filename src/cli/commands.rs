//! CLI commands
//!
//! Each command builds a serializable report and prints it as JSON.

use clap::ValueEnum;
use serde::Serialize;

use crate::core::{satoshi_to_btc, Tx};
use crate::crypto::{
    double_sha256, hash160, hash160_to_address, public_key_from_hex, ripemd160, sha256, KeyPair,
    Network,
};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn print_json<T: Serialize>(report: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

// =============================================================================
// keygen
// =============================================================================

#[derive(Debug, Serialize)]
pub struct KeygenReport {
    pub network: Network,
    pub compressed: bool,
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

pub fn keygen_report(key_pair: &KeyPair, network: Network, compressed: bool) -> KeygenReport {
    KeygenReport {
        network,
        compressed,
        private_key: key_pair.private_key_hex(),
        public_key: key_pair.public_key().to_hex(compressed),
        address: key_pair.address(network, compressed),
    }
}

/// Generate a key pair, or rebuild one from a hex private key
pub fn cmd_keygen(network: Network, compressed: bool, private_key: Option<&str>) -> CliResult<()> {
    let key_pair = match private_key {
        Some(hex_key) => KeyPair::from_private_key_hex(hex_key)?,
        None => KeyPair::generate(),
    };
    log::info!("Key ready for {} network (compressed: {})", network, compressed);
    print_json(&keygen_report(&key_pair, network, compressed))
}

// =============================================================================
// address
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AddressReport {
    pub network: Network,
    pub compressed: bool,
    pub hash160: String,
    pub address: String,
}

/// Address of a SEC-encoded public key; compression follows the input form
pub fn address_report(public_key_hex: &str, network: Network) -> CliResult<AddressReport> {
    let public_key = public_key_from_hex(public_key_hex)?;
    let compressed = public_key_hex.len() == 66;
    let hash = public_key.hash160(compressed);
    Ok(AddressReport {
        network,
        compressed,
        hash160: hex::encode(hash),
        address: hash160_to_address(&hash, network),
    })
}

pub fn cmd_address(public_key_hex: &str, network: Network) -> CliResult<()> {
    print_json(&address_report(public_key_hex, network)?)
}

// =============================================================================
// hash
// =============================================================================

/// Digest selection for the hash command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    Sha256,
    DoubleSha256,
    Ripemd160,
    Hash160,
}

#[derive(Debug, Serialize)]
pub struct HashReport {
    pub algorithm: HashAlgorithm,
    pub input_len: usize,
    pub digest: String,
}

/// Hash UTF-8 text, or hex-decoded bytes when `hex_input` is set
pub fn hash_report(algorithm: HashAlgorithm, data: &str, hex_input: bool) -> CliResult<HashReport> {
    let bytes = if hex_input {
        hex::decode(data)?
    } else {
        data.as_bytes().to_vec()
    };
    let digest = match algorithm {
        HashAlgorithm::Sha256 => hex::encode(sha256(&bytes)),
        HashAlgorithm::DoubleSha256 => hex::encode(double_sha256(&bytes)),
        HashAlgorithm::Ripemd160 => hex::encode(ripemd160(&bytes)),
        HashAlgorithm::Hash160 => hex::encode(hash160(&bytes)),
    };
    Ok(HashReport {
        algorithm,
        input_len: bytes.len(),
        digest,
    })
}

pub fn cmd_hash(algorithm: HashAlgorithm, data: &str, hex_input: bool) -> CliResult<()> {
    print_json(&hash_report(algorithm, data, hex_input)?)
}

// =============================================================================
// decode-tx
// =============================================================================

#[derive(Debug, Serialize)]
pub struct InputReport {
    pub prev_tx: String,
    pub prev_index: u32,
    pub script_sig: String,
    pub sequence: u32,
}

#[derive(Debug, Serialize)]
pub struct OutputReport {
    pub amount: u64,
    pub btc: f64,
    pub script_pubkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TxReport {
    pub id: String,
    pub version: u32,
    pub size: usize,
    pub locktime: u32,
    pub total_output: u64,
    pub inputs: Vec<InputReport>,
    pub outputs: Vec<OutputReport>,
}

/// Decode a hex transaction; P2PKH outputs get an address on `network`
pub fn decode_tx_report(tx_hex: &str, network: Network) -> CliResult<TxReport> {
    let bytes = hex::decode(tx_hex.trim())?;
    let tx = Tx::decode(&bytes)?;
    log::debug!("Decoded {} inputs and {} outputs", tx.inputs.len(), tx.outputs.len());

    let inputs = tx
        .inputs
        .iter()
        .map(|input| InputReport {
            prev_tx: input.prev_tx_hex(),
            prev_index: input.prev_index,
            script_sig: input.script_sig.to_string(),
            sequence: input.sequence,
        })
        .collect();
    let outputs = tx
        .outputs
        .iter()
        .map(|output| OutputReport {
            amount: output.amount,
            btc: satoshi_to_btc(output.amount),
            script_pubkey: output.script_pubkey.to_string(),
            address: output
                .script_pubkey
                .p2pkh_hash()
                .map(|hash| hash160_to_address(&hash, network)),
        })
        .collect();

    Ok(TxReport {
        id: tx.id()?,
        version: tx.version,
        size: bytes.len(),
        locktime: tx.locktime,
        total_output: tx.total_output()?,
        inputs,
        outputs,
    })
}

pub fn cmd_decode_tx(tx_hex: &str, network: Network) -> CliResult<()> {
    print_json(&decode_tx_report(tx_hex, network)?)
}
