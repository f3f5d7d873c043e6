// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Bitmessage wire protocol: message framing, primitive encodings, the
//! services bit-set and the "version" handshake payload.
//!
//! Every message on the wire is a 24-byte header followed by its payload:
//!
//! | field    | size | notes                                 |
//! |----------|------|---------------------------------------|
//! | magic    | 4    | `0xE9BEB4D9`                          |
//! | command  | 12   | ASCII, NUL padded                     |
//! | length   | 4    | payload length, big-endian            |
//! | checksum | 4    | first 4 bytes of SHA-512(payload)     |

pub use {codec::*, encoding::*, frame::*, services::*, version::*};

pub mod codec;
pub mod encoding;
pub mod frame;
pub mod services;
pub mod version;
