// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use std::pin::Pin;
use std::task::{Context, Poll};

use bm_wire::{DecodeError, Frame, VersionPayload};
use futures::Stream;
use tokio::sync::mpsc;

use crate::TransportError;

/// Everything a transport reports to its owner.
#[derive(Debug)]
pub enum TransportEvent {
    /// The channel is open; our "version" is about to go out.
    Open,
    /// A frame decoded successfully. Handshake messages are reported too.
    Message(Frame),
    /// Handshake completed; carries the remote version.
    Established(VersionPayload),
    /// A frame could not be decoded. The connection stays up.
    Warning(DecodeError),
    /// Channel failure or a rejected remote version.
    Error(TransportError),
    /// The connection is gone and the transport may connect again.
    Close,
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::Open => "open",
            TransportEvent::Message(_) => "message",
            TransportEvent::Established(_) => "established",
            TransportEvent::Warning(_) => "warning",
            TransportEvent::Error(_) => "error",
            TransportEvent::Close => "close",
        }
    }
}

/// Receiving half of a transport's event stream.
#[derive(Debug)]
pub struct Events {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Events {
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<TransportEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Events {
    type Item = TransportEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    pub(crate) fn new() -> (Self, Events) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Events { rx })
    }

    pub(crate) fn emit(&self, event: TransportEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::trace!(target: "bm::ws", kind = err.0.kind(), "event dropped, no receiver");
        }
    }
}
