// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Bitmessage client transport over WebSocket.
//!
//! A browser-style socket delivers whole messages rather than a byte stream,
//! so each WebSocket message carries exactly one wire frame. [`WsTransport`]
//! opens the socket, runs the version/verack handshake and then passes
//! frames through in both directions, reporting everything on its
//! [`Events`] stream:
//!
//! ```no_run
//! use bm_ws::{Transport, TransportConfig, TransportEvent, WsConnector, WsTransport};
//!
//! # async fn run() -> Result<(), bm_ws::TransportError> {
//! let config = TransportConfig::new().with_seeds(["wss://gateway.example:8443"]);
//! let (transport, mut events) = WsTransport::new(config, WsConnector)?;
//! let seed = transport.bootstrap().remove(0);
//! transport.connect(&seed, &[])?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TransportEvent::Established(remote) => {
//!             println!("connected to {}", remote.user_agent);
//!             transport.send("getaddr".into())?;
//!         }
//!         TransportEvent::Message(frame) => println!("<- {}", frame.command),
//!         TransportEvent::Close => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! There is no handshake deadline: a peer that never answers leaves the
//! connection waiting until the caller closes it.

pub use {channel::*, config::*, error::*, event::*, handshake::*, transport::*};

pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod handshake;
pub mod transport;

mod driver;
