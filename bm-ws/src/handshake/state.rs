// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use bm_wire::VersionPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// At least one direction is unconfirmed.
    ///
    /// `remote` holds the accepted remote version and is `Some` exactly when
    /// our "verack" has been sent.
    Awaiting {
        remote: Option<VersionPayload>,
        verack_received: bool,
    },
    /// Both sides confirmed. Terminal for the lifetime of the connection.
    Established(VersionPayload),
}

impl Default for HandshakeState {
    fn default() -> Self {
        Self::Awaiting { remote: None, verack_received: false }
    }
}
