// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use bytes::Bytes;

use crate::encoding::{DecodeError, EncodeError};
use crate::frame::{decode_with_magic, encode_with_magic, Frame, MAGIC};
use crate::version::{unix_now, VersionError, VersionPayload, VersionPolicy};

pub const VERSION_COMMAND: &str = "version";
pub const VERACK_COMMAND: &str = "verack";

/// Encodes logical messages into wire frames and back.
///
/// Transports only ever see frames as opaque bytes; everything that knows
/// the layout of a message lives behind this trait.
pub trait Codec: Send + Sync + 'static {
    fn encode(&self, command: &str, payload: &[u8]) -> Result<Bytes, EncodeError>;

    fn decode(&self, frame: &[u8]) -> Result<Frame, DecodeError>;

    fn encode_version(&self, version: &VersionPayload) -> Result<Bytes, EncodeError> {
        self.encode(VERSION_COMMAND, &version.encode())
    }

    /// Decodes a "version" payload and checks it against `policy`.
    fn decode_version(&self, payload: &[u8], policy: &VersionPolicy) -> Result<VersionPayload, VersionError> {
        let version = VersionPayload::decode(payload)?;
        policy.validate(&version, unix_now())?;
        Ok(version)
    }
}

/// Codec for the Bitmessage wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmessageCodec {
    magic: u32,
}

impl BitmessageCodec {
    pub fn new() -> Self {
        Self { magic: MAGIC }
    }

    /// Uses a non-standard network magic, e.g. for an isolated test network.
    pub fn with_magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }
}

impl Default for BitmessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for BitmessageCodec {
    fn encode(&self, command: &str, payload: &[u8]) -> Result<Bytes, EncodeError> {
        encode_with_magic(self.magic, command, payload)
    }

    fn decode(&self, frame: &[u8]) -> Result<Frame, DecodeError> {
        let frame = decode_with_magic(self.magic, frame)?;
        tracing::trace!(target: "bm::wire", command = %frame.command, len = frame.payload.len(), "decoded frame");
        Ok(frame)
    }
}
