// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Primitive Bitmessage encodings: big-endian integers, `var_int`,
//! `var_str` and `var_int_list`.

use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("decode: unexpected end of input (need {need} bytes, have {have})")]
    UnexpectedEof { need: usize, have: usize },

    #[error("decode: length {len} out of range (max {max})")]
    LengthOutOfRange { len: u64, max: u64 },

    #[error("decode: non-minimal var_int encoding")]
    NonMinimalVarInt,

    #[error("decode: invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("decode: network magic mismatch (expected {expected:#010x}, got {got:#010x})")]
    MagicMismatch { expected: u32, got: u32 },

    #[error("decode: checksum mismatch")]
    ChecksumMismatch,

    #[error("decode: {0} trailing bytes after payload")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("encode: invalid command name '{0}'")]
    InvalidCommand(String),

    #[error("encode: payload of {len} bytes exceeds {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct SliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let have = self.remaining();
        if n > have {
            return Err(DecodeError::UnexpectedEof { need: n, have });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_var_int(&mut self) -> Result<u64, DecodeError> {
        let (value, min) = match self.read_u8()? {
            0xfd => (self.read_u16()? as u64, 0xfd),
            0xfe => (self.read_u32()? as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            b => return Ok(b as u64),
        };
        if value < min {
            return Err(DecodeError::NonMinimalVarInt);
        }
        Ok(value)
    }

    pub fn read_var_str(&mut self, max: usize) -> Result<String, DecodeError> {
        let len = self.read_var_int()?;
        if len > max as u64 {
            return Err(DecodeError::LengthOutOfRange { len, max: max as u64 });
        }
        let bytes = self.read_bytes(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidValue("var_str is not UTF-8"))
    }

    pub fn read_var_int_list(&mut self, max: usize) -> Result<Vec<u64>, DecodeError> {
        let count = self.read_var_int()?;
        if count > max as u64 {
            return Err(DecodeError::LengthOutOfRange { len: count, max: max as u64 });
        }
        // every element takes at least one byte
        if count > self.remaining() as u64 {
            return Err(DecodeError::UnexpectedEof { need: count as usize, have: self.remaining() });
        }
        (0..count).map(|_| self.read_var_int()).collect()
    }
}

pub fn write_var_int(buf: &mut BytesMut, value: u64) {
    match value {
        0..=0xfc => buf.put_u8(value as u8),
        0xfd..=0xffff => {
            buf.put_u8(0xfd);
            buf.put_u16(value as u16);
        }
        0x1_0000..=0xffff_ffff => {
            buf.put_u8(0xfe);
            buf.put_u32(value as u32);
        }
        _ => {
            buf.put_u8(0xff);
            buf.put_u64(value);
        }
    }
}

pub fn write_var_str(buf: &mut BytesMut, value: &str) {
    write_var_int(buf, value.len() as u64);
    buf.put_slice(value.as_bytes());
}

pub fn write_var_int_list(buf: &mut BytesMut, values: &[u64]) {
    write_var_int(buf, values.len() as u64);
    for &value in values {
        write_var_int(buf, value);
    }
}
