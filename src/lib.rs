//! Mini-Bitcoin: Bitcoin-compatible keys, signatures and legacy transactions
//!
//! Everything below the transaction layer is implemented from scratch:
//! - secp256k1 field and point arithmetic
//! - SHA-256 and RIPEMD-160
//! - ECDSA with RFC 6979 nonces and DER signatures
//! - Base58Check P2PKH addresses
//! - Legacy transaction encoding, SIGHASH_ALL signing and verification
//!
//! # Example
//!
//! ```rust
//! use mini_bitcoin::core::{Script, TxBuilder, TxOut, Utxo};
//! use mini_bitcoin::crypto::{KeyPair, Network};
//!
//! let key_pair = KeyPair::generate();
//! println!("Address: {}", key_pair.address(Network::Test, true));
//!
//! // An output we own, paid to our public key hash
//! let utxo = Utxo {
//!     txid: [0x11; 32],
//!     index: 0,
//!     output: TxOut::new(50_000, Script::p2pkh(&key_pair.public_key().hash160(true))),
//! };
//!
//! let tx = TxBuilder::new()
//!     .add_input(&utxo)
//!     .pay_to_address("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r", 40_000)
//!     .unwrap()
//!     .build_and_sign(&key_pair, true)
//!     .unwrap();
//!
//! assert!(tx.verify().unwrap());
//! assert_eq!(tx.fee().unwrap(), 10_000);
//! println!("Tx {}", tx.id().unwrap());
//! ```

pub mod cli;
pub mod core;
pub mod crypto;

// Re-export commonly used types
pub use core::{Script, Tx, TxBuilder, TxIn, TxOut};
pub use crypto::{KeyPair, Network, PublicKey, Signature};
