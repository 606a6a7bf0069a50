//! Pay-to-public-key-hash addresses

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::base58::{decode_check, encode_address_payload, Base58Error};
use super::hash::double_sha256;
use super::keys::PublicKey;

/// Address errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Unknown address version byte: 0x{0:02x}")]
    UnknownVersion(u8),
    #[error("Invalid address payload length: {0}")]
    InvalidLength(usize),
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    #[error("Base58 error: {0}")]
    Base58(#[from] Base58Error),
}

/// Network selector; decides the address version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
}

impl Network {
    pub fn version_byte(&self) -> u8 {
        match self {
            Network::Main => 0x00,
            Network::Test => 0x6f,
        }
    }

    pub fn from_version_byte(version: u8) -> Option<Self> {
        match version {
            0x00 => Some(Network::Main),
            0x6f => Some(Network::Test),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            _ => Err(AddressError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Base58Check address for a 20-byte public key hash
pub fn hash160_to_address(hash: &[u8; 20], network: Network) -> String {
    let mut payload = [0u8; 25];
    payload[0] = network.version_byte();
    payload[1..21].copy_from_slice(hash);
    let checksum = double_sha256(&payload[..21]);
    payload[21..].copy_from_slice(&checksum[..4]);
    encode_address_payload(&payload)
}

/// Derive an address from a public key
pub fn public_key_to_address(public_key: &PublicKey, network: Network, compressed: bool) -> String {
    hash160_to_address(&public_key.hash160(compressed), network)
}

/// Parse an address into its network and public key hash
pub fn decode_address(address: &str) -> Result<(Network, [u8; 20]), AddressError> {
    let data = decode_check(address)?;
    if data.len() != 21 {
        return Err(AddressError::InvalidLength(data.len()));
    }
    let network = Network::from_version_byte(data[0]).ok_or(AddressError::UnknownVersion(data[0]))?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..]);
    Ok((network, hash))
}
