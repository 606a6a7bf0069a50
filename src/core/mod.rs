//! Transaction layer
//!
//! This module contains:
//! - Wire encoding primitives (varints, byte reader)
//! - Scripts (P2PKH templates, opcode pretty-printing)
//! - Legacy transactions (encoding, signing, verification, fees)

pub mod encoding;
pub mod script;
pub mod transaction;

pub use encoding::{encode_varint, EncodingError, Reader};
pub use script::{Command, Script, SigHashType};
pub use transaction::{
    btc_to_satoshi, parse_txid, satoshi_to_btc, ScriptSource, TransactionError, Tx, TxBuilder,
    TxIn, TxOut, Utxo, UtxoLookup, SATOSHIS_PER_BTC, SEQUENCE_FINAL, TX_VERSION,
};
