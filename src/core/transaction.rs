//! Legacy Bitcoin transactions
//!
//! Builds, signs, verifies and (de)serializes pre-segwit transactions in the
//! exact wire format, including the signing-mode encoding used for
//! SIGHASH_ALL.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding::{write_varint, EncodingError, Reader};
use super::script::{Script, SigHashType};
use crate::crypto::{
    decode_address, double_sha256, hash160, AddressError, KeyPair, PublicKey, Signature,
    SignatureError,
};

// =============================================================================
// Constants
// =============================================================================

/// Current transaction version
pub const TX_VERSION: u32 = 1;

/// Sequence number that disables locktime
pub const SEQUENCE_FINAL: u32 = 0xFFFFFFFF;

pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Input {0} has no previous output attached")]
    MissingPrevOutput(usize),
    #[error("Input index {index} out of range ({count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },
    #[error("Outputs ({outputs}) exceed inputs ({inputs})")]
    OutputsExceedInputs { inputs: u64, outputs: u64 },
    #[error("Amount total overflows")]
    ValueOverflow,
    #[error("Previous output of input {0} is not pay-to-public-key-hash")]
    NotP2pkh(usize),
    #[error("Invalid transaction id: {0}")]
    InvalidTxid(String),
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOut {
    /// Amount in satoshis
    pub amount: u64,
    /// Locking script
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(amount: u64, script_pubkey: Script) -> Self {
        Self {
            amount,
            script_pubkey,
        }
    }

    /// Pay `amount` to a P2PKH address
    pub fn to_address(address: &str, amount: u64) -> Result<Self, TransactionError> {
        let (_, hash) = decode_address(address)?;
        Ok(Self::new(amount, Script::p2pkh(&hash)))
    }
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Transaction input (reference to a previous output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxIn {
    /// Id of the previous transaction, in display byte order
    #[serde(with = "hex::serde")]
    pub prev_tx: [u8; 32],
    /// Index of the output in the previous transaction
    pub prev_index: u32,
    /// Unlocking script
    pub script_sig: Script,
    pub sequence: u32,
    /// Output being spent; needed for signing, verification and fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_output: Option<TxOut>,
}

impl TxIn {
    pub fn new(prev_tx: [u8; 32], prev_index: u32) -> Self {
        Self {
            prev_tx,
            prev_index,
            script_sig: Script::default(),
            sequence: SEQUENCE_FINAL,
            prev_output: None,
        }
    }

    pub fn with_prev_output(mut self, prev_output: TxOut) -> Self {
        self.prev_output = Some(prev_output);
        self
    }

    pub fn prev_tx_hex(&self) -> String {
        hex::encode(self.prev_tx)
    }
}

/// Which script an input carries when the transaction is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSource {
    /// The input's own unlocking script
    Current,
    /// The locking script of the output being spent
    PreviousOutput,
    /// A zero-length script
    Empty,
}

// =============================================================================
// UTXO
// =============================================================================

/// Unspent transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utxo {
    #[serde(with = "hex::serde")]
    pub txid: [u8; 32],
    pub index: u32,
    pub output: TxOut,
}

/// Resolves previous outputs by id (display byte order) and index
pub trait UtxoLookup {
    fn lookup(&self, txid: &[u8; 32], index: u32) -> Option<TxOut>;
}

impl UtxoLookup for HashMap<([u8; 32], u32), TxOut> {
    fn lookup(&self, txid: &[u8; 32], index: u32) -> Option<TxOut> {
        self.get(&(*txid, index)).cloned()
    }
}

impl UtxoLookup for [Utxo] {
    fn lookup(&self, txid: &[u8; 32], index: u32) -> Option<TxOut> {
        self.iter()
            .find(|utxo| &utxo.txid == txid && utxo.index == index)
            .map(|utxo| utxo.output.clone())
    }
}

/// Parse a 64-digit transaction id in display order
pub fn parse_txid(txid: &str) -> Result<[u8; 32], TransactionError> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(txid, &mut out)
        .map_err(|_| TransactionError::InvalidTxid(txid.to_string()))?;
    Ok(out)
}

// =============================================================================
// Transaction
// =============================================================================

/// A legacy transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tx {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub locktime: u32,
}

impl Tx {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: TX_VERSION,
            inputs,
            outputs,
            locktime: 0,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), TransactionError> {
        if index >= self.inputs.len() {
            return Err(TransactionError::InputIndexOutOfRange {
                index,
                count: self.inputs.len(),
            });
        }
        Ok(())
    }

    /// Encode with the script of each input chosen by `source`
    pub fn encode_with(
        &self,
        source: impl Fn(usize) -> ScriptSource,
    ) -> Result<Vec<u8>, TransactionError> {
        let mut out = Vec::with_capacity(self.estimated_size());
        out.extend_from_slice(&self.version.to_le_bytes());

        write_varint(&mut out, self.inputs.len() as u64);
        for (index, input) in self.inputs.iter().enumerate() {
            let mut prev_tx = input.prev_tx;
            prev_tx.reverse();
            out.extend_from_slice(&prev_tx);
            out.extend_from_slice(&input.prev_index.to_le_bytes());

            let script = match source(index) {
                ScriptSource::Current => input.script_sig.encode()?,
                ScriptSource::PreviousOutput => input
                    .prev_output
                    .as_ref()
                    .ok_or(TransactionError::MissingPrevOutput(index))?
                    .script_pubkey
                    .encode()?,
                ScriptSource::Empty => Script::default().encode()?,
            };
            out.extend_from_slice(&script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.amount.to_le_bytes());
            out.extend_from_slice(&output.script_pubkey.encode()?);
        }

        out.extend_from_slice(&self.locktime.to_le_bytes());
        Ok(out)
    }

    /// Network encoding
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        self.encode_with(|_| ScriptSource::Current)
    }

    /// Message signed for input `index`: that input carries the previous
    /// output's locking script, every other input an empty script, and the
    /// 4-byte sighash type follows the locktime.
    pub fn encode_for_signing(&self, index: usize) -> Result<Vec<u8>, TransactionError> {
        self.check_index(index)?;
        let mut out = self.encode_with(|i| {
            if i == index {
                ScriptSource::PreviousOutput
            } else {
                ScriptSource::Empty
            }
        })?;
        out.extend_from_slice(&(SigHashType::All.to_byte() as u32).to_le_bytes());
        Ok(out)
    }

    /// Double SHA-256 of the signing-mode encoding
    pub fn sighash(&self, index: usize) -> Result<[u8; 32], TransactionError> {
        Ok(double_sha256(&self.encode_for_signing(index)?))
    }

    /// Transaction id bytes in display order
    pub fn txid(&self) -> Result<[u8; 32], TransactionError> {
        let mut hash = double_sha256(&self.encode()?);
        hash.reverse();
        Ok(hash)
    }

    /// Transaction id as hex
    pub fn id(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.txid()?))
    }

    /// `<signature> <public key>` unlocking script for input `index`
    fn unlocking_script(
        &self,
        index: usize,
        key_pair: &KeyPair,
        compressed: bool,
    ) -> Result<Script, TransactionError> {
        let digest = self.sighash(index)?;
        let signature = key_pair.sign(&digest)?;

        let mut signature_bytes = signature.to_der();
        signature_bytes.push(SigHashType::All.to_byte());
        let public_key = key_pair.public_key().to_sec(compressed);
        Ok(Script::p2pkh_unlock(&signature_bytes, &public_key))
    }

    /// Sign input `index` and install `<signature> <public key>` as its script
    pub fn sign_input(
        &mut self,
        index: usize,
        key_pair: &KeyPair,
        compressed: bool,
    ) -> Result<(), TransactionError> {
        let script_sig = self.unlocking_script(index, key_pair, compressed)?;
        self.inputs[index].script_sig = script_sig;
        log::debug!("Signed input {} of {}", index, self.inputs.len());
        Ok(())
    }

    /// Sign every input with the same key. Nothing is installed unless every
    /// input signs.
    pub fn sign_all(&mut self, key_pair: &KeyPair, compressed: bool) -> Result<(), TransactionError> {
        let scripts = (0..self.inputs.len())
            .map(|index| self.unlocking_script(index, key_pair, compressed))
            .collect::<Result<Vec<_>, _>>()?;
        for (input, script_sig) in self.inputs.iter_mut().zip(scripts) {
            input.script_sig = script_sig;
        }
        log::debug!("Signed all {} inputs", self.inputs.len());
        Ok(())
    }

    /// Check the unlocking script of input `index` against its P2PKH previous
    /// output. Malformed signatures or keys verify as `false`.
    pub fn verify_input(&self, index: usize) -> Result<bool, TransactionError> {
        self.check_index(index)?;
        let input = &self.inputs[index];
        let prev_output = input
            .prev_output
            .as_ref()
            .ok_or(TransactionError::MissingPrevOutput(index))?;
        let expected_hash = prev_output
            .script_pubkey
            .p2pkh_hash()
            .ok_or(TransactionError::NotP2pkh(index))?;

        let (signature_bytes, sec) = match input.script_sig.p2pkh_unlock_parts() {
            Some(parts) => parts,
            None => return Ok(false),
        };
        if hash160(sec) != expected_hash {
            return Ok(false);
        }
        let (der, hash_type) = match signature_bytes.split_last() {
            Some((&hash_type, der)) => (der, hash_type),
            None => return Ok(false),
        };
        if SigHashType::from_byte(hash_type).is_none() {
            return Ok(false);
        }
        let (public_key, signature) = match (PublicKey::from_sec(sec), Signature::from_der(der)) {
            (Ok(public_key), Ok(signature)) => (public_key, signature),
            _ => return Ok(false),
        };

        let digest = self.sighash(index)?;
        Ok(public_key.verify(&digest, &signature))
    }

    /// Verify every input
    pub fn verify(&self) -> Result<bool, TransactionError> {
        for index in 0..self.inputs.len() {
            if !self.verify_input(index)? {
                log::debug!("Input {} failed verification", index);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolve and attach the previous output of every input
    pub fn attach_prev_outputs<L: UtxoLookup + ?Sized>(
        &mut self,
        utxos: &L,
    ) -> Result<(), TransactionError> {
        for (index, input) in self.inputs.iter_mut().enumerate() {
            let output = utxos
                .lookup(&input.prev_tx, input.prev_index)
                .ok_or(TransactionError::MissingPrevOutput(index))?;
            input.prev_output = Some(output);
        }
        Ok(())
    }

    /// Calculate total output amount
    pub fn total_output(&self) -> Result<u64, TransactionError> {
        self.outputs.iter().try_fold(0u64, |total, output| {
            total
                .checked_add(output.amount)
                .ok_or(TransactionError::ValueOverflow)
        })
    }

    /// Sum of attached previous output amounts
    pub fn total_input(&self) -> Result<u64, TransactionError> {
        self.inputs
            .iter()
            .enumerate()
            .try_fold(0u64, |total, (index, input)| {
                let prev_output = input
                    .prev_output
                    .as_ref()
                    .ok_or(TransactionError::MissingPrevOutput(index))?;
                total
                    .checked_add(prev_output.amount)
                    .ok_or(TransactionError::ValueOverflow)
            })
    }

    /// Inputs minus outputs
    pub fn fee(&self) -> Result<u64, TransactionError> {
        let inputs = self.total_input()?;
        let outputs = self.total_output()?;
        inputs
            .checked_sub(outputs)
            .ok_or(TransactionError::OutputsExceedInputs { inputs, outputs })
    }

    /// Rough size of a signed transaction in bytes. Not exact; use
    /// [`Tx::encoded_size`] for the real figure.
    pub fn estimated_size(&self) -> usize {
        180 * self.inputs.len() + 140 * self.outputs.len() + 10
    }

    pub fn encoded_size(&self) -> Result<usize, TransactionError> {
        Ok(self.encode()?.len())
    }

    /// Parse the network encoding
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = Reader::new(bytes);
        let version = reader.read_u32_le()?;

        let input_count = reader.read_varint()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let mut prev_tx = reader.read_array::<32>()?;
            prev_tx.reverse();
            let prev_index = reader.read_u32_le()?;
            let script_sig = Script::decode(&mut reader)?;
            let sequence = reader.read_u32_le()?;
            inputs.push(TxIn {
                prev_tx,
                prev_index,
                script_sig,
                sequence,
                prev_output: None,
            });
        }

        let output_count = reader.read_varint()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let amount = reader.read_u64_le()?;
            let script_pubkey = Script::decode(&mut reader)?;
            outputs.push(TxOut::new(amount, script_pubkey));
        }

        let locktime = reader.read_u32_le()?;
        reader.finish()?;

        Ok(Self {
            version,
            inputs,
            outputs,
            locktime,
        })
    }
}

// =============================================================================
// Amounts
// =============================================================================

/// Convert a BTC amount to satoshis, rounding to the nearest satoshi
pub fn btc_to_satoshi(btc: f64) -> Option<u64> {
    let satoshis = (btc * SATOSHIS_PER_BTC as f64).round();
    if !satoshis.is_finite() || satoshis < 0.0 || satoshis >= u64::MAX as f64 {
        return None;
    }
    Some(satoshis as u64)
}

pub fn satoshi_to_btc(satoshis: u64) -> f64 {
    satoshis as f64 / SATOSHIS_PER_BTC as f64
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Builder for creating transactions
pub struct TxBuilder {
    version: u32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    locktime: u32,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locktime: 0,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add an input spending a UTXO
    pub fn add_input(self, utxo: &Utxo) -> Self {
        self.add_input_with_sequence(utxo, SEQUENCE_FINAL)
    }

    /// Add an input with custom sequence
    pub fn add_input_with_sequence(mut self, utxo: &Utxo, sequence: u32) -> Self {
        let mut input = TxIn::new(utxo.txid, utxo.index).with_prev_output(utxo.output.clone());
        input.sequence = sequence;
        self.inputs.push(input);
        self
    }

    /// Add an output
    pub fn add_output(mut self, output: TxOut) -> Self {
        self.outputs.push(output);
        self
    }

    /// Add a P2PKH output to an address
    pub fn pay_to_address(mut self, address: &str, amount: u64) -> Result<Self, TransactionError> {
        self.outputs.push(TxOut::to_address(address, amount)?);
        Ok(self)
    }

    /// Set locktime (block height or timestamp)
    pub fn locktime(mut self, locktime: u32) -> Self {
        self.locktime = locktime;
        self
    }

    /// Build and sign every input with one key
    pub fn build_and_sign(self, key_pair: &KeyPair, compressed: bool) -> Result<Tx, TransactionError> {
        let mut tx = self.build();
        tx.sign_all(key_pair, compressed)?;
        Ok(tx)
    }

    /// Build without signing
    pub fn build(self) -> Tx {
        let mut tx = Tx::new(self.inputs, self.outputs);
        tx.version = self.version;
        tx.locktime = self.locktime;
        tx
    }
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Network;

    const PREV_TXID: &str = "46325085c89fb98a4b7ceee44eac9b955f09e1ddc86d8dad3dfdcba46b4d36b2";
    const OWN_HASH: &str = "0167f77d14d49fb19fd0256d6cef9d032af43f8c";
    const DEST_HASH: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    const SIGNING_MESSAGE: &str = "0100000001b2364d6ba4cbfd3dad8d6dc8dde1095f959bac4ee4ee7c4b8ab99fc8855032460100\
        00001976a9140167f77d14d49fb19fd0256d6cef9d032af43f8c88acffffffff01409c00000000\
        00001976a914751e76e8199196d454941c45d1b3a323f1433bd688ac0000000001000000";

    const SIGNED_TX: &str = "0100000001b2364d6ba4cbfd3dad8d6dc8dde1095f959bac4ee4ee7c4b8ab99fc8855032460100\
        00006a4730440220322b4d52fc48a0edc394182e46c03f07ecb4c4b2e56d648494fa58d7ce8483\
        1e02204bea75d36a2bd5ceeaf3f2ee4c505f304484abf7cc3f6b0693a1e36a261f8c370121034b\
        facf13412e365155e1f84815782abc08e36707b279011a9acb7f4fd5dee467ffffffff01409c00\
        00000000001976a914751e76e8199196d454941c45d1b3a323f1433bd688ac00000000";

    fn hash20(s: &str) -> [u8; 20] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    fn test_key() -> KeyPair {
        KeyPair::from_entropy(b"mini-bitcoin test key").unwrap()
    }

    fn fixture_utxo() -> Utxo {
        Utxo {
            txid: parse_txid(PREV_TXID).unwrap(),
            index: 1,
            output: TxOut::new(50_000, Script::p2pkh(&hash20(OWN_HASH))),
        }
    }

    fn fixture_tx() -> Tx {
        TxBuilder::new()
            .add_input(&fixture_utxo())
            .add_output(TxOut::new(40_000, Script::p2pkh(&hash20(DEST_HASH))))
            .build()
    }

    #[test]
    fn test_fixture_key_owns_prev_output() {
        assert_eq!(hex::encode(test_key().public_key().hash160(true)), OWN_HASH);
        assert_eq!(
            test_key().address(Network::Main, true),
            "18SDvrDbH1WNFUVrEa1BpYusLTb1XXqs5"
        );
    }

    #[test]
    fn test_signing_mode_encoding() {
        let tx = fixture_tx();
        assert_eq!(hex::encode(tx.encode_for_signing(0).unwrap()), SIGNING_MESSAGE);
        assert_eq!(
            hex::encode(tx.sighash(0).unwrap()),
            "96f22add618431bf37e2a10e73e0e39b4ce985cb9c70f91ecb5039cc06071b31"
        );
    }

    #[test]
    fn test_end_to_end_signed_transaction() {
        let mut tx = fixture_tx();
        tx.sign_input(0, &test_key(), true).unwrap();

        let encoded = tx.encode().unwrap();
        assert_eq!(hex::encode(&encoded), SIGNED_TX);
        assert_eq!(encoded.len(), 191);
        assert_eq!(tx.encoded_size().unwrap(), 191);
        assert_eq!(
            tx.id().unwrap(),
            "9befebe79886fa87607e582404ac795f96b7e2e379b622362d48250480af8e86"
        );
        assert!(tx.verify_input(0).unwrap());
        assert!(tx.verify().unwrap());
        assert_eq!(tx.fee().unwrap(), 10_000);
    }

    #[test]
    fn test_decode_round_trip() {
        let bytes = hex::decode(SIGNED_TX).unwrap();
        let mut tx = Tx::decode(&bytes).unwrap();
        assert_eq!(tx.version, 1);
        assert_eq!(tx.inputs[0].prev_tx_hex(), PREV_TXID);
        assert_eq!(tx.inputs[0].prev_index, 1);
        assert_eq!(tx.outputs[0].amount, 40_000);
        assert_eq!(tx.outputs[0].script_pubkey.p2pkh_hash(), Some(hash20(DEST_HASH)));
        assert_eq!(tx.encode().unwrap(), bytes);

        // Verification needs the spent output
        assert_eq!(
            tx.verify_input(0).unwrap_err(),
            TransactionError::MissingPrevOutput(0)
        );
        tx.attach_prev_outputs(&[fixture_utxo()][..]).unwrap();
        assert!(tx.verify_input(0).unwrap());
    }

    #[test]
    fn test_decode_rejects_trailing_and_truncated_bytes() {
        let mut bytes = hex::decode(SIGNED_TX).unwrap();
        bytes.push(0);
        assert_eq!(
            Tx::decode(&bytes).unwrap_err(),
            TransactionError::Encoding(EncodingError::TrailingBytes(1))
        );
        bytes.truncate(100);
        assert_eq!(
            Tx::decode(&bytes).unwrap_err(),
            TransactionError::Encoding(EncodingError::UnexpectedEof)
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let tx = fixture_tx();
        assert_eq!(tx.encode().unwrap(), tx.encode().unwrap());
        assert_eq!(tx.id().unwrap(), tx.clone().id().unwrap());
    }

    #[test]
    fn test_signing_mode_differs_per_input() {
        let key = test_key();
        let own = Script::p2pkh(&key.public_key().hash160(true));
        let mut tx = Tx::new(
            vec![
                TxIn::new([1; 32], 0).with_prev_output(TxOut::new(1_000, own.clone())),
                TxIn::new([2; 32], 3).with_prev_output(TxOut::new(2_000, own)),
            ],
            vec![TxOut::new(2_500, Script::p2pkh(&hash20(DEST_HASH)))],
        );

        let first = tx.encode_for_signing(0).unwrap();
        let second = tx.encode_for_signing(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(first.len(), second.len());

        tx.sign_all(&key, true).unwrap();
        assert!(tx.verify_input(0).unwrap());
        assert!(tx.verify_input(1).unwrap());
        assert_eq!(tx.fee().unwrap(), 500);

        // Swapping the unlocking scripts breaks both inputs
        let (a, b) = (tx.inputs[0].script_sig.clone(), tx.inputs[1].script_sig.clone());
        tx.inputs[0].script_sig = b;
        tx.inputs[1].script_sig = a;
        assert!(!tx.verify_input(0).unwrap());
        assert!(!tx.verify_input(1).unwrap());
    }

    #[test]
    fn test_uncompressed_key_signing() {
        let key = test_key();
        let utxo = Utxo {
            txid: [7; 32],
            index: 0,
            output: TxOut::new(5_000, Script::p2pkh(&key.public_key().hash160(false))),
        };
        let tx = TxBuilder::new()
            .add_input(&utxo)
            .pay_to_address(&key.address(Network::Test, true), 4_000)
            .unwrap()
            .build_and_sign(&key, false)
            .unwrap();
        assert!(tx.verify().unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let mut tx = fixture_tx();
        tx.sign_input(0, &KeyPair::generate(), true).unwrap();
        assert!(!tx.verify_input(0).unwrap());
    }

    #[test]
    fn test_verify_rejects_tampered_outputs() {
        let mut tx = fixture_tx();
        tx.sign_input(0, &test_key(), true).unwrap();
        tx.outputs[0].amount += 1;
        assert!(!tx.verify_input(0).unwrap());
    }

    #[test]
    fn test_verify_requires_p2pkh_prev_output() {
        let mut tx = fixture_tx();
        tx.inputs[0].prev_output = Some(TxOut::new(50_000, Script::default()));
        assert_eq!(tx.verify_input(0).unwrap_err(), TransactionError::NotP2pkh(0));
    }

    #[test]
    fn test_index_out_of_range() {
        let tx = fixture_tx();
        assert_eq!(
            tx.encode_for_signing(1).unwrap_err(),
            TransactionError::InputIndexOutOfRange { index: 1, count: 1 }
        );
        assert!(fixture_tx().sign_input(3, &test_key(), true).is_err());
    }

    #[test]
    fn test_signing_requires_prev_output() {
        let mut tx = Tx::new(vec![TxIn::new([0; 32], 0)], vec![]);
        assert_eq!(
            tx.sign_input(0, &test_key(), true).unwrap_err(),
            TransactionError::MissingPrevOutput(0)
        );
    }

    #[test]
    fn test_sign_all_leaves_tx_untouched_on_failure() {
        let key = test_key();
        let own = Script::p2pkh(&key.public_key().hash160(true));
        let mut tx = Tx::new(
            vec![
                TxIn::new([1; 32], 0).with_prev_output(TxOut::new(1_000, own)),
                TxIn::new([2; 32], 1),
            ],
            vec![TxOut::new(900, Script::p2pkh(&hash20(DEST_HASH)))],
        );
        let before = tx.clone();

        assert_eq!(
            tx.sign_all(&key, true).unwrap_err(),
            TransactionError::MissingPrevOutput(1)
        );
        assert_eq!(tx, before);
        assert!(tx.inputs[0].script_sig.is_empty());
    }

    #[test]
    fn test_fee_errors() {
        let mut tx = fixture_tx();
        tx.outputs[0].amount = 60_000;
        assert_eq!(
            tx.fee().unwrap_err(),
            TransactionError::OutputsExceedInputs {
                inputs: 50_000,
                outputs: 60_000
            }
        );

        tx.inputs[0].prev_output = None;
        assert_eq!(tx.fee().unwrap_err(), TransactionError::MissingPrevOutput(0));

        let overflow = Tx::new(
            vec![],
            vec![
                TxOut::new(u64::MAX, Script::default()),
                TxOut::new(1, Script::default()),
            ],
        );
        assert_eq!(overflow.total_output().unwrap_err(), TransactionError::ValueOverflow);
    }

    #[test]
    fn test_attach_prev_outputs_from_map() {
        let utxo = fixture_utxo();
        let mut map = HashMap::new();
        map.insert((utxo.txid, utxo.index), utxo.output.clone());

        let mut tx = fixture_tx();
        tx.inputs[0].prev_output = None;
        tx.attach_prev_outputs(&map).unwrap();
        assert_eq!(tx.inputs[0].prev_output, Some(utxo.output));

        tx.inputs[0].prev_index = 9;
        assert_eq!(
            tx.attach_prev_outputs(&map).unwrap_err(),
            TransactionError::MissingPrevOutput(0)
        );
    }

    #[test]
    fn test_estimated_size() {
        let tx = fixture_tx();
        assert_eq!(tx.estimated_size(), 180 + 140 + 10);
        assert_eq!(Tx::new(vec![], vec![]).estimated_size(), 10);
    }

    #[test]
    fn test_oversized_push_fails_encoding() {
        let mut tx = fixture_tx();
        tx.inputs[0].script_sig = Script::p2pkh_unlock(&[0u8; 80], &[0u8; 33]);
        assert_eq!(
            tx.encode().unwrap_err(),
            TransactionError::Encoding(EncodingError::PushTooLarge(80))
        );
    }

    #[test]
    fn test_parse_txid() {
        assert!(parse_txid(PREV_TXID).is_ok());
        assert!(matches!(
            parse_txid("abcd"),
            Err(TransactionError::InvalidTxid(_))
        ));
    }

    #[test]
    fn test_satoshi_conversion() {
        assert_eq!(btc_to_satoshi(0.0004), Some(40_000));
        assert_eq!(btc_to_satoshi(1.0), Some(SATOSHIS_PER_BTC));
        assert_eq!(btc_to_satoshi(-1.0), None);
        assert_eq!(btc_to_satoshi(f64::NAN), None);
        assert_eq!(satoshi_to_btc(250_000_000), 2.5);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tx = fixture_tx();
        tx.sign_input(0, &test_key(), true).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains(PREV_TXID));
        let back: Tx = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
