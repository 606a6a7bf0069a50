//! Script model for output locking and input unlocking
//!
//! Scripts are sequences of opcodes and data pushes. Only the
//! pay-to-public-key-hash template is produced and recognized; scripts are
//! never executed.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use super::encoding::{write_varint, EncodingError, Reader};

// =============================================================================
// Script Constants
// =============================================================================

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Pushes must be strictly shorter than this
pub const MAX_PUSH_SIZE: usize = 75;

/// Names for the opcodes the pretty-printer knows about
fn opcode_name(op: u8) -> Option<&'static str> {
    let name = match op {
        0x00 => "OP_0",
        0x4c => "OP_PUSHDATA1",
        0x4d => "OP_PUSHDATA2",
        0x4e => "OP_PUSHDATA4",
        0x4f => "OP_1NEGATE",
        0x51 => "OP_1",
        0x52 => "OP_2",
        0x53 => "OP_3",
        0x54 => "OP_4",
        0x55 => "OP_5",
        0x56 => "OP_6",
        0x57 => "OP_7",
        0x58 => "OP_8",
        0x59 => "OP_9",
        0x5a => "OP_10",
        0x5b => "OP_11",
        0x5c => "OP_12",
        0x5d => "OP_13",
        0x5e => "OP_14",
        0x5f => "OP_15",
        0x60 => "OP_16",
        0x61 => "OP_NOP",
        0x63 => "OP_IF",
        0x64 => "OP_NOTIF",
        0x67 => "OP_ELSE",
        0x68 => "OP_ENDIF",
        0x69 => "OP_VERIFY",
        0x6a => "OP_RETURN",
        0x6b => "OP_TOALTSTACK",
        0x6c => "OP_FROMALTSTACK",
        0x6d => "OP_2DROP",
        0x6e => "OP_2DUP",
        0x6f => "OP_3DUP",
        0x70 => "OP_2OVER",
        0x71 => "OP_2ROT",
        0x72 => "OP_2SWAP",
        0x73 => "OP_IFDUP",
        0x74 => "OP_DEPTH",
        0x75 => "OP_DROP",
        0x76 => "OP_DUP",
        0x77 => "OP_NIP",
        0x78 => "OP_OVER",
        0x79 => "OP_PICK",
        0x7a => "OP_ROLL",
        0x7b => "OP_ROT",
        0x7c => "OP_SWAP",
        0x7d => "OP_TUCK",
        0x82 => "OP_SIZE",
        0x87 => "OP_EQUAL",
        0x88 => "OP_EQUALVERIFY",
        0x8b => "OP_1ADD",
        0x8c => "OP_1SUB",
        0x8f => "OP_NEGATE",
        0x90 => "OP_ABS",
        0x91 => "OP_NOT",
        0x92 => "OP_0NOTEQUAL",
        0x93 => "OP_ADD",
        0x94 => "OP_SUB",
        0x9a => "OP_BOOLAND",
        0x9b => "OP_BOOLOR",
        0x9c => "OP_NUMEQUAL",
        0x9d => "OP_NUMEQUALVERIFY",
        0x9e => "OP_NUMNOTEQUAL",
        0x9f => "OP_LESSTHAN",
        0xa0 => "OP_GREATERTHAN",
        0xa1 => "OP_LESSTHANOREQUAL",
        0xa2 => "OP_GREATERTHANOREQUAL",
        0xa3 => "OP_MIN",
        0xa4 => "OP_MAX",
        0xa5 => "OP_WITHIN",
        0xa6 => "OP_RIPEMD160",
        0xa7 => "OP_SHA1",
        0xa8 => "OP_SHA256",
        0xa9 => "OP_HASH160",
        0xaa => "OP_HASH256",
        0xab => "OP_CODESEPARATOR",
        0xac => "OP_CHECKSIG",
        0xad => "OP_CHECKSIGVERIFY",
        0xae => "OP_CHECKMULTISIG",
        0xaf => "OP_CHECKMULTISIGVERIFY",
        0xb0 => "OP_NOP1",
        0xb1 => "OP_CHECKLOCKTIMEVERIFY",
        0xb2 => "OP_CHECKSEQUENCEVERIFY",
        0xb3 => "OP_NOP4",
        0xb4 => "OP_NOP5",
        0xb5 => "OP_NOP6",
        0xb6 => "OP_NOP7",
        0xb7 => "OP_NOP8",
        0xb8 => "OP_NOP9",
        0xb9 => "OP_NOP10",
        _ => return None,
    };
    Some(name)
}

// =============================================================================
// Signature Hash Types
// =============================================================================

/// Signature hash type; only SIGHASH_ALL is supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SigHashType {
    /// Sign all inputs and all outputs
    #[default]
    All = 0x01,
}

impl SigHashType {
    /// Parse sighash type from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(SigHashType::All),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Script
// =============================================================================

/// A single script element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Op(u8),
    Push(#[serde(with = "hex::serde")] Vec<u8>),
}

/// An ordered sequence of commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    pub commands: Vec<Command>,
}

impl Script {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(hash: &[u8; 20]) -> Self {
        Self::new(vec![
            Command::Op(OP_DUP),
            Command::Op(OP_HASH160),
            Command::Push(hash.to_vec()),
            Command::Op(OP_EQUALVERIFY),
            Command::Op(OP_CHECKSIG),
        ])
    }

    /// `<signature> <public key>`
    pub fn p2pkh_unlock(signature: &[u8], public_key: &[u8]) -> Self {
        Self::new(vec![
            Command::Push(signature.to_vec()),
            Command::Push(public_key.to_vec()),
        ])
    }

    /// The public key hash, if this is a P2PKH locking script
    pub fn p2pkh_hash(&self) -> Option<[u8; 20]> {
        match self.commands.as_slice() {
            [Command::Op(OP_DUP), Command::Op(OP_HASH160), Command::Push(hash), Command::Op(OP_EQUALVERIFY), Command::Op(OP_CHECKSIG)] => {
                hash.as_slice().try_into().ok()
            }
            _ => None,
        }
    }

    /// The signature and public key pushes, if this is a P2PKH unlocking script
    pub fn p2pkh_unlock_parts(&self) -> Option<(&[u8], &[u8])> {
        match self.commands.as_slice() {
            [Command::Push(signature), Command::Push(public_key)] => {
                Some((signature.as_slice(), public_key.as_slice()))
            }
            _ => None,
        }
    }

    /// Command bytes without the length prefix. Opcodes in the push range and
    /// empty pushes are rejected so every encoding decodes back unchanged.
    pub fn raw_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                Command::Op(op @ 0x01..=OP_PUSHDATA4) => {
                    return Err(EncodingError::UnsupportedOpcode(*op));
                }
                Command::Op(op) => out.push(*op),
                Command::Push(data) => {
                    if data.is_empty() {
                        return Err(EncodingError::EmptyPush);
                    }
                    if data.len() >= MAX_PUSH_SIZE {
                        return Err(EncodingError::PushTooLarge(data.len()));
                    }
                    out.push(data.len() as u8);
                    out.extend_from_slice(data);
                }
            }
        }
        Ok(out)
    }

    /// Varint length prefix followed by the command bytes
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let raw = self.raw_bytes()?;
        let mut out = Vec::with_capacity(raw.len() + 1);
        write_varint(&mut out, raw.len() as u64);
        out.extend_from_slice(&raw);
        Ok(out)
    }

    /// Parse command bytes without a length prefix
    pub fn from_raw_bytes(raw: &[u8]) -> Result<Self, EncodingError> {
        let mut reader = Reader::new(raw);
        let mut commands = Vec::new();
        while !reader.is_empty() {
            let byte = reader.read_u8()?;
            let command = match byte {
                0x01..=0x4a => Command::Push(reader.read_bytes(byte as usize)?.to_vec()),
                // 75-byte pushes and the PUSHDATA forms are never produced
                0x4b..=OP_PUSHDATA4 => return Err(EncodingError::UnsupportedOpcode(byte)),
                op => Command::Op(op),
            };
            commands.push(command);
        }
        Ok(Self::new(commands))
    }

    /// Read a length-prefixed script
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let len = reader.read_varint()?;
        let len = usize::try_from(len).map_err(|_| EncodingError::UnexpectedEof)?;
        Self::from_raw_bytes(reader.read_bytes(len)?)
    }
}

impl Add for Script {
    type Output = Script;

    fn add(mut self, rhs: Script) -> Script {
        self.commands.extend(rhs.commands);
        self
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match command {
                Command::Op(op) => match opcode_name(*op) {
                    Some(name) => f.write_str(name)?,
                    None => write!(f, "OP_[{}]", op)?,
                },
                Command::Push(data) => f.write_str(&hex::encode(data))?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
