// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use bytes::{BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha512};

use crate::encoding::{DecodeError, EncodeError, SliceReader};

pub const MAGIC: u32 = 0xE9BE_B4D9;
pub const COMMAND_LEN: usize = 12;
pub const HEADER_LEN: usize = 4 + COMMAND_LEN + 4 + 4;
pub const MAX_PAYLOAD_LEN: usize = 1_600_003;

/// One decoded wire message.
///
/// The command and payload are what higher layers dispatch on; the checksum
/// is kept so the full header can be inspected or re-emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub payload: Bytes,
    pub checksum: [u8; 4],
}

impl Frame {
    pub fn new(command: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum(&payload);
        Self { command: command.into(), payload, checksum }
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        encode_with_magic(MAGIC, &self.command, &self.payload)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode_with_magic(MAGIC, bytes)
    }
}

pub(crate) fn encode_with_magic(magic: u32, command: &str, payload: &[u8]) -> Result<Bytes, EncodeError> {
    let name = command_name_bytes(command)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLarge { len: payload.len(), max: MAX_PAYLOAD_LEN });
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32(magic);
    buf.put_slice(&name);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&checksum(payload));
    buf.put_slice(payload);
    Ok(buf.freeze())
}

pub(crate) fn decode_with_magic(magic: u32, bytes: &[u8]) -> Result<Frame, DecodeError> {
    let mut reader = SliceReader::new(bytes);
    let got = reader.read_u32()?;
    if got != magic {
        return Err(DecodeError::MagicMismatch { expected: magic, got });
    }
    let command = parse_command_name(&reader.read_array::<COMMAND_LEN>()?)?;
    let len = reader.read_u32()? as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(DecodeError::LengthOutOfRange { len: len as u64, max: MAX_PAYLOAD_LEN as u64 });
    }
    let expected = reader.read_array::<4>()?;
    let payload = reader.read_bytes(len)?;
    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    if checksum(payload) != expected {
        return Err(DecodeError::ChecksumMismatch);
    }

    Ok(Frame { command, payload: Bytes::copy_from_slice(payload), checksum: expected })
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = Sha512::digest(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

fn command_name_bytes(command: &str) -> Result<[u8; COMMAND_LEN], EncodeError> {
    let name = command.as_bytes();
    if name.is_empty()
        || name.len() > COMMAND_LEN
        || !name.iter().all(|b| b.is_ascii_graphic())
    {
        return Err(EncodeError::InvalidCommand(command.to_string()));
    }
    let mut buf = [0u8; COMMAND_LEN];
    buf[..name.len()].copy_from_slice(name);
    Ok(buf)
}

fn parse_command_name(bytes: &[u8; COMMAND_LEN]) -> Result<String, DecodeError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(COMMAND_LEN);
    if bytes[end..].iter().any(|&b| b != 0) {
        return Err(DecodeError::InvalidValue("command is not NUL padded"));
    }
    let name = &bytes[..end];
    if name.is_empty() || !name.iter().all(|b| b.is_ascii_graphic()) {
        return Err(DecodeError::InvalidValue("command is not printable ASCII"));
    }
    // ascii checked above
    Ok(name.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verack_frame_layout() {
        let bytes = Frame::new("verack", Bytes::new()).encode().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..4], &[0xE9, 0xBE, 0xB4, 0xD9]);
        assert_eq!(&bytes[4..16], b"verack\0\0\0\0\0\0");
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
        // sha512("") starts with cf83e135
        assert_eq!(&bytes[20..24], &[0xcf, 0x83, 0xe1, 0x35]);

        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.command, "verack");
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn decode_rejects_corruption() {
        let bytes = Frame::new("ping", Bytes::from_static(b"hello")).encode().unwrap();

        let mut bad_magic = bytes.to_vec();
        bad_magic[0] = 0;
        assert!(matches!(Frame::decode(&bad_magic), Err(DecodeError::MagicMismatch { .. })));

        let mut bad_sum = bytes.to_vec();
        let last = bad_sum.len() - 1;
        bad_sum[last] ^= 0xff;
        assert_eq!(Frame::decode(&bad_sum), Err(DecodeError::ChecksumMismatch));

        let mut trailing = bytes.to_vec();
        trailing.push(0);
        assert_eq!(Frame::decode(&trailing), Err(DecodeError::TrailingBytes(1)));

        assert!(matches!(
            Frame::decode(&bytes[..bytes.len() - 2]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(Frame::decode(&bytes[..10]), Err(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn command_name_must_be_padded_ascii() {
        let mut bytes = Frame::new("ping", Bytes::new()).encode().unwrap().to_vec();
        bytes[10] = b'x';
        assert!(matches!(Frame::decode(&bytes), Err(DecodeError::InvalidValue(_))));

        assert!(matches!(
            Frame::new("a-very-long-command", Bytes::new()).encode(),
            Err(EncodeError::InvalidCommand(_))
        ));
        assert!(matches!(Frame::new("", Bytes::new()).encode(), Err(EncodeError::InvalidCommand(_))));
    }
}
