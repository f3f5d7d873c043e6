// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bm_wire::{BitmessageCodec, Codec};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::debug;

use crate::channel::Connector;
use crate::driver::{Command, Driver, SessionHandle, SessionSlot};
use crate::event::{EventSink, Events};
use crate::handshake::Handshake;
use crate::{LocalIdentity, TransportConfig, TransportError, TransportResult};

/// Something to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A message without payload, e.g. "verack" or "getaddr".
    Command(String),
    Message { command: String, payload: Bytes },
    /// An already encoded frame, sent as-is.
    Frame(Bytes),
}

impl From<&str> for Outgoing {
    fn from(command: &str) -> Self {
        Self::Command(command.to_string())
    }
}

impl From<String> for Outgoing {
    fn from(command: String) -> Self {
        Self::Command(command)
    }
}

impl<P: Into<Bytes>> From<(&str, P)> for Outgoing {
    fn from((command, payload): (&str, P)) -> Self {
        Self::Message { command: command.to_string(), payload: payload.into() }
    }
}

impl From<Bytes> for Outgoing {
    fn from(frame: Bytes) -> Self {
        Self::Frame(frame)
    }
}

impl From<Vec<u8>> for Outgoing {
    fn from(frame: Vec<u8>) -> Self {
        Self::Frame(frame.into())
    }
}

/// The operations every transport kind offers.
///
/// Results of network activity are never returned from these calls; they
/// arrive on the transport's [`Events`] stream.
pub trait Transport {
    /// Addresses to connect to first. Never touches the network.
    fn bootstrap(&self) -> Vec<String>;

    /// Starts connecting and returns immediately.
    fn connect(&self, address: &str, protocols: &[String]) -> TransportResult<()>;

    /// Queues one frame. Fire-and-forget.
    fn send(&self, message: Outgoing) -> TransportResult<()>;

    /// Requests the connection be closed. No-op when not connected or
    /// already closing.
    ///
    /// `send` fails from here on, but `connect` keeps failing until the
    /// `Close` event confirms the channel is gone.
    fn close(&self);

    /// True between `connect` and `close` (or the channel closing on its own).
    fn is_connected(&self) -> bool;
}

/// Client transport over a message-oriented stream socket (WebSocket).
///
/// Owns at most one connection at a time. Construction hands back the
/// [`Events`] receiver, so nothing emitted by a later `connect` is missed.
pub struct WsTransport<C: Codec = BitmessageCodec> {
    identity: Arc<LocalIdentity>,
    connector: Arc<dyn Connector>,
    codec: Arc<C>,
    runtime: Handle,
    events: EventSink,
    session: SessionSlot,
    next_id: AtomicU64,
}

impl WsTransport<BitmessageCodec> {
    /// Must be called from within a Tokio runtime.
    pub fn new<K: Connector>(config: TransportConfig, connector: K) -> TransportResult<(Self, Events)> {
        Self::with_codec(config, connector, BitmessageCodec::new())
    }
}

impl<C: Codec> WsTransport<C> {
    pub fn with_codec<K: Connector>(
        config: TransportConfig,
        connector: K,
        codec: C,
    ) -> TransportResult<(Self, Events)> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let identity = LocalIdentity::from_config(config)?;
        let (events, events_rx) = EventSink::new();

        let transport = Self {
            identity: Arc::new(identity),
            connector: Arc::new(connector),
            codec: Arc::new(codec),
            runtime,
            events,
            session: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        };
        Ok((transport, events_rx))
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    fn encode(&self, message: Outgoing) -> TransportResult<Bytes> {
        let frame = match message {
            Outgoing::Command(command) => self.codec.encode(&command, &[])?,
            Outgoing::Message { command, payload } => self.codec.encode(&command, &payload)?,
            Outgoing::Frame(frame) => frame,
        };
        Ok(frame)
    }
}

impl<C: Codec> Transport for WsTransport<C> {
    fn bootstrap(&self) -> Vec<String> {
        self.identity.seeds.clone()
    }

    fn connect(&self, address: &str, protocols: &[String]) -> TransportResult<()> {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let id = {
            let mut slot = self.session.lock();
            if slot.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            *slot = Some(SessionHandle { id, commands, closing: false });
            id
        };
        debug!(target: "bm::ws", id, %address, ?protocols, "connecting");

        let driver = Driver {
            id,
            address: address.to_string(),
            protocols: protocols.to_vec(),
            identity: self.identity.clone(),
            policy: self.identity.gateway_policy(),
            connector: self.connector.clone(),
            codec: self.codec.clone(),
            events: self.events.clone(),
            slot: self.session.clone(),
            commands: commands_rx,
            handshake: Handshake::new(),
        };
        self.runtime.spawn(driver.run());
        Ok(())
    }

    fn send(&self, message: Outgoing) -> TransportResult<()> {
        let slot = self.session.lock();
        let session = slot
            .as_ref()
            .filter(|session| !session.closing)
            .ok_or(TransportError::NotConnected)?;
        let frame = self.encode(message)?;
        session
            .commands
            .send(Command::Send(frame))
            .map_err(|_| TransportError::NotConnected)
    }

    fn close(&self) {
        let mut slot = self.session.lock();
        if let Some(session) = slot.as_mut().filter(|session| !session.closing) {
            debug!(target: "bm::ws", id = session.id, "close requested");
            session.closing = true;
            // the driver may already be gone; then its close event is out
            let _ = session.commands.send(Command::Close);
        }
    }

    fn is_connected(&self) -> bool {
        self.session.lock().as_ref().map_or(false, |session| !session.closing)
    }
}

impl<C: Codec> Drop for WsTransport<C> {
    fn drop(&mut self) {
        self.close();
    }
}
