// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use bm_wire::{EncodeError, VersionError};
use thiserror::Error;

/// Errors reported by a message channel.
///
/// These carry rendered messages rather than the underlying library errors
/// so that events stay `Send + Sync` regardless of the channel backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel: open {address} failed: {reason}")]
    Open { address: String, reason: String },

    #[error("channel: send failed: {0}")]
    Send(String),

    #[error("channel: receive failed: {0}")]
    Receive(String),

    #[error("channel: close failed: {0}")]
    Close(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not connected")]
    NotConnected,

    #[error("transport: no tokio runtime available")]
    NoRuntime,

    #[error("transport: invalid config: {0}")]
    InvalidConfig(String),

    #[error("transport: {0}")]
    Encode(#[from] EncodeError),

    #[error("transport: invalid remote version: {0}")]
    InvalidVersion(#[from] VersionError),

    #[error("transport: {0}")]
    Channel(#[from] ChannelError),
}

impl TransportError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Usage errors come from calling the transport in the wrong state.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::AlreadyConnected | Self::NotConnected)
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
