// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! In-memory channels.
//!
//! Every [`MemoryConnector::open`] creates a connected pair: the
//! [`MemoryChannel`] goes to the transport and the [`RemoteEnd`] is handed
//! to whoever holds the connector's receiver, which then plays the peer.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Channel, ChannelEvent, Connector};
use crate::ChannelError;

/// What the local side did to the channel, as seen by the remote end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Frame(Bytes),
    Close,
}

#[derive(Debug)]
pub struct MemoryConnector {
    remotes: mpsc::UnboundedSender<RemoteEnd>,
    refuse: AtomicBool,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (remotes, remotes_rx) = mpsc::unbounded_channel();
        (Self { remotes, refuse: AtomicBool::new(false) }, remotes_rx)
    }

    /// Makes subsequent `open` calls fail, as an unreachable host would.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, address: &str, protocols: &[String]) -> Result<Box<dyn Channel>, ChannelError> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(ChannelError::Open {
                address: address.to_string(),
                reason: "connection refused".into(),
            });
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let remote = RemoteEnd {
            address: address.to_string(),
            protocols: protocols.to_vec(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        self.remotes.send(remote).map_err(|_| ChannelError::Open {
            address: address.to_string(),
            reason: "connector receiver dropped".into(),
        })?;

        Ok(Box::new(MemoryChannel { inbound: inbound_rx, outbound: outbound_tx, closed: false }))
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    outbound: mpsc::UnboundedSender<Sent>,
    closed: bool,
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, frame: Bytes) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Send("channel closed".into()));
        }
        self.outbound
            .send(Sent::Frame(frame))
            .map_err(|_| ChannelError::Send("remote end dropped".into()))
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.closed {
            self.closed = true;
            let _ = self.outbound.send(Sent::Close);
        }
        Ok(())
    }
}

/// The peer side of a [`MemoryChannel`].
#[derive(Debug)]
pub struct RemoteEnd {
    pub address: String,
    pub protocols: Vec<String>,
    inbound: mpsc::UnboundedSender<ChannelEvent>,
    outbound: mpsc::UnboundedReceiver<Sent>,
}

impl RemoteEnd {
    /// Delivers one frame to the local side. Returns `false` if it is gone.
    pub fn deliver(&self, frame: impl Into<Bytes>) -> bool {
        self.inbound.send(ChannelEvent::Message(frame.into())).is_ok()
    }

    pub fn fail(&self, err: ChannelError) -> bool {
        self.inbound.send(ChannelEvent::Error(err)).is_ok()
    }

    pub fn close(&self) -> bool {
        self.inbound.send(ChannelEvent::Closed).is_ok()
    }

    pub async fn next_sent(&mut self) -> Option<Sent> {
        self.outbound.recv().await
    }

    pub fn try_next_sent(&mut self) -> Option<Sent> {
        self.outbound.try_recv().ok()
    }
}
