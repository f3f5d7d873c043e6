// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! The message channel seam.
//!
//! A channel is a bidirectional, message-oriented connection: every send is
//! one whole frame and every receive yields one whole frame. The transport
//! only ever holds a `Box<dyn Channel>` obtained from an injected
//! [`Connector`], so the WebSocket backend can be swapped for an in-memory
//! one in tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::ChannelError;

pub use {memory::*, ws::*};

pub mod memory;
pub mod ws;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(Bytes),
    Error(ChannelError),
    Closed,
}

#[async_trait]
pub trait Channel: Send + 'static {
    async fn send(&mut self, frame: Bytes) -> Result<(), ChannelError>;

    /// Waits for the next event. Returns `None` once the channel is closed.
    ///
    /// Must be cancel safe: the transport polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Option<ChannelEvent>;

    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Opens channels. Injected into the transport at construction.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// `protocols` is passed to the remote endpoint unmodified.
    async fn open(&self, address: &str, protocols: &[String]) -> Result<Box<dyn Channel>, ChannelError>;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    async fn open(&self, address: &str, protocols: &[String]) -> Result<Box<dyn Channel>, ChannelError> {
        (**self).open(address, protocols).await
    }
}
