//! Cryptographic primitives
//!
//! This module provides:
//! - 256-bit integers and modular arithmetic over the secp256k1 field and group order
//! - secp256k1 point arithmetic
//! - SHA-256, RIPEMD-160 and the composite hashes built from them
//! - Key management and ECDSA signatures
//! - Base58Check encoding and P2PKH addresses

pub mod address;
pub mod base58;
pub mod curve;
pub mod ecdsa;
pub mod field;
pub mod hash;
pub mod keys;
pub mod ripemd160;
pub mod sha256;
pub mod uint;

pub use address::{decode_address, hash160_to_address, public_key_to_address, AddressError, Network};
pub use base58::Base58Error;
pub use curve::{CurveError, Point, GENERATOR};
pub use ecdsa::{Signature, SignatureError};
pub use field::{FieldElement, FieldError, Scalar};
pub use hash::{double_sha256, double_sha256_hex, hash160, hmac_sha256, sha256_hex};
pub use keys::{
    generate_secret_key, public_key_from_hex, secret_key_from_entropy, KeyError, KeyPair,
    PublicKey, SecretKey,
};
pub use ripemd160::ripemd160;
pub use sha256::sha256;
pub use uint::U256;
