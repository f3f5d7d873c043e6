// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Per-connection task. Owns the channel exclusively and handles channel
//! events and caller commands one at a time.

use std::ops::ControlFlow;
use std::sync::Arc;

use bm_wire::{Codec, VersionPolicy, VERACK_COMMAND};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::channel::{Channel, ChannelEvent, Connector};
use crate::event::{EventSink, TransportEvent};
use crate::handshake::{Handshake, HandshakeAction};
use crate::{LocalIdentity, TransportError};

#[derive(Debug)]
pub(crate) enum Command {
    Send(Bytes),
    Close,
}

#[derive(Debug)]
pub(crate) struct SessionHandle {
    pub id: u64,
    pub commands: mpsc::UnboundedSender<Command>,
    /// Set by `close`. The slot stays occupied until the driver is done.
    pub closing: bool,
}

pub(crate) type SessionSlot = Arc<Mutex<Option<SessionHandle>>>;

pub(crate) struct Driver<C> {
    pub id: u64,
    pub address: String,
    pub protocols: Vec<String>,
    pub identity: Arc<LocalIdentity>,
    pub policy: VersionPolicy,
    pub connector: Arc<dyn Connector>,
    pub codec: Arc<C>,
    pub events: EventSink,
    pub slot: SessionSlot,
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub handshake: Handshake,
}

impl<C: Codec> Driver<C> {
    pub async fn run(mut self) {
        match self.connector.open(&self.address, &self.protocols).await {
            Ok(channel) => self.serve(channel).await,
            Err(err) => {
                warn!(target: "bm::ws", id = self.id, address = %self.address, %err, "open failed");
                self.events.emit(TransportEvent::Error(err.into()));
            }
        }

        // the only place a session leaves the slot; before the event so a
        // `close` handler can connect again right away
        self.release();
        debug!(target: "bm::ws", id = self.id, address = %self.address, "connection closed");
        self.events.emit(TransportEvent::Close);
    }

    async fn serve(&mut self, mut channel: Box<dyn Channel>) {
        let Some(queued) = self.take_queued() else {
            debug!(target: "bm::ws", id = self.id, address = %self.address, "closed while opening");
            self.close_channel(channel.as_mut()).await;
            return;
        };

        debug!(target: "bm::ws", id = self.id, address = %self.address, "channel open");
        self.events.emit(TransportEvent::Open);
        self.send_version(channel.as_mut()).await;
        for frame in queued {
            self.send_frame(channel.as_mut(), frame).await;
        }

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => self.send_frame(channel.as_mut(), frame).await,
                    // no handle left means the transport was closed or dropped
                    Some(Command::Close) | None => {
                        self.close_channel(channel.as_mut()).await;
                        break;
                    }
                },
                event = channel.recv() => match event {
                    Some(ChannelEvent::Message(bytes)) => {
                        if self.on_frame(channel.as_mut(), &bytes).await.is_break() {
                            break;
                        }
                    }
                    Some(ChannelEvent::Error(err)) => {
                        warn!(target: "bm::ws", id = self.id, %err, "channel error");
                        self.events.emit(TransportEvent::Error(err.into()));
                    }
                    Some(ChannelEvent::Closed) | None => break,
                },
            }
        }
    }

    /// Frames sent while the channel was opening, or `None` if the caller
    /// closed in the meantime.
    fn take_queued(&mut self) -> Option<Vec<Bytes>> {
        let mut queued = Vec::new();
        loop {
            match self.commands.try_recv() {
                Ok(Command::Send(frame)) => queued.push(frame),
                Ok(Command::Close) | Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) => return Some(queued),
            }
        }
    }

    async fn send_version(&self, channel: &mut dyn Channel) {
        let version = self.identity.version_payload();
        match self.codec.encode_version(&version) {
            Ok(frame) => self.send_frame(channel, frame).await,
            Err(err) => self.events.emit(TransportEvent::Error(err.into())),
        }
    }

    async fn send_frame(&self, channel: &mut dyn Channel, frame: Bytes) {
        trace!(target: "bm::ws", id = self.id, len = frame.len(), "send frame");
        if let Err(err) = channel.send(frame).await {
            warn!(target: "bm::ws", id = self.id, %err, "send failed");
            self.events.emit(TransportEvent::Error(err.into()));
        }
    }

    async fn close_channel(&self, channel: &mut dyn Channel) {
        if let Err(err) = channel.close().await {
            warn!(target: "bm::ws", id = self.id, %err, "close failed");
            self.events.emit(TransportEvent::Error(err.into()));
        }
    }

    async fn on_frame(&mut self, channel: &mut dyn Channel, bytes: &[u8]) -> ControlFlow<()> {
        let frame = match self.codec.decode(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(target: "bm::ws", id = self.id, %err, "message decoding error");
                self.events.emit(TransportEvent::Warning(err));
                return ControlFlow::Continue(());
            }
        };

        let pending = !self.handshake.is_established();
        let (command, payload) = (frame.command.clone(), frame.payload.clone());
        self.events.emit(TransportEvent::Message(frame));
        if !pending {
            return ControlFlow::Continue(());
        }

        let codec = &self.codec;
        let policy = &self.policy;
        let actions = match self
            .handshake
            .on_message(&command, &payload, |payload| codec.decode_version(payload, policy))
        {
            Ok(actions) => actions,
            Err(err) => {
                warn!(target: "bm::ws", id = self.id, %err, "rejecting remote version");
                self.events.emit(TransportEvent::Error(TransportError::InvalidVersion(err)));
                self.close_channel(channel).await;
                return ControlFlow::Break(());
            }
        };

        for action in actions {
            match action {
                HandshakeAction::SendVerack => match self.codec.encode(VERACK_COMMAND, &[]) {
                    Ok(verack) => self.send_frame(channel, verack).await,
                    Err(err) => self.events.emit(TransportEvent::Error(err.into())),
                },
                HandshakeAction::Established(remote) => {
                    debug!(
                        target: "bm::ws",
                        id = self.id,
                        user_agent = %remote.user_agent,
                        services = %remote.services,
                        "handshake established"
                    );
                    self.events.emit(TransportEvent::Established(remote));
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn release(&self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().map_or(false, |session| session.id == self.id) {
            *slot = None;
        }
    }
}
