//! Wire encoding primitives
//!
//! Variable-length integers and a cursor over borrowed bytes, shared by the
//! script and transaction codecs.

use thiserror::Error;

/// Encoding and decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Value {0} is too large for a varint")]
    VarIntTooLarge(u128),
    #[error("Push of {0} bytes exceeds the direct push limit")]
    PushTooLarge(usize),
    #[error("Empty push has no direct encoding")]
    EmptyPush,
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unsupported opcode 0x{0:02x}")]
    UnsupportedOpcode(u8),
    #[error("{0} trailing bytes after end of data")]
    TrailingBytes(usize),
}

/// Append the varint encoding of `value` to `out`
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Varint encoding; values above `u64::MAX` have no representation
pub fn encode_varint(value: u128) -> Result<Vec<u8>, EncodingError> {
    let value = u64::try_from(value).map_err(|_| EncodingError::VarIntTooLarge(value))?;
    let mut out = Vec::with_capacity(9);
    write_varint(&mut out, value);
    Ok(out)
}

/// Cursor over a byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], EncodingError> {
        if len > self.remaining() {
            return Err(EncodingError::UnexpectedEof);
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], EncodingError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, EncodingError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, EncodingError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, EncodingError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Non-minimal encodings are accepted
    pub fn read_varint(&mut self) -> Result<u64, EncodingError> {
        match self.read_u8()? {
            0xfd => Ok(self.read_u16_le()? as u64),
            0xfe => Ok(self.read_u32_le()? as u64),
            0xff => self.read_u64_le(),
            small => Ok(small as u64),
        }
    }

    /// Succeed only if every byte was consumed
    pub fn finish(self) -> Result<(), EncodingError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(EncodingError::TrailingBytes(extra)),
        }
    }
}
