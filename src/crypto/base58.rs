//! Base58 and Base58Check text encoding

use thiserror::Error;

use super::hash::double_sha256;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const CHECKSUM_LEN: usize = 4;

/// Base58 decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Base58Error {
    #[error("Invalid Base58 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("Base58Check checksum mismatch")]
    ChecksumMismatch,
    #[error("Base58Check payload too short: {0} bytes")]
    InvalidLength(usize),
}

/// Base58-encode arbitrary bytes; each leading zero byte becomes a `1`
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // Base-58 digits, least significant first
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

fn digit_value(c: char) -> Option<u32> {
    ALPHABET
        .iter()
        .position(|&a| a as char == c)
        .map(|index| index as u32)
}

/// Decode a Base58 string
pub fn decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let ones = s.chars().take_while(|&c| c == '1').count();

    // Base-256 bytes, least significant first
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    for (position, character) in s.chars().enumerate().skip(ones) {
        let mut carry = digit_value(character).ok_or(Base58Error::InvalidCharacter {
            character,
            position,
        })?;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; ones];
    out.extend(bytes.iter().rev());
    Ok(out)
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = double_sha256(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Base58-encode a complete address payload: version, hash, checksum
pub fn encode_address_payload(payload: &[u8; 25]) -> String {
    encode(payload)
}

/// Append the 4-byte double-SHA-256 checksum and Base58-encode
pub fn encode_check(data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum(data));
    encode(&payload)
}

/// Decode and strip the checksum, returning the checked bytes
pub fn decode_check(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut data = decode(s)?;
    if data.len() < CHECKSUM_LEN + 1 {
        return Err(Base58Error::InvalidLength(data.len()));
    }
    let split = data.len() - CHECKSUM_LEN;
    if data[split..] != checksum(&data[..split]) {
        return Err(Base58Error::ChecksumMismatch);
    }
    data.truncate(split);
    Ok(data)
}
