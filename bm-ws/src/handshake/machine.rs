// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use bm_wire::{VersionError, VersionPayload, VERACK_COMMAND, VERSION_COMMAND};

use super::state::HandshakeState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Acknowledge the remote version.
    SendVerack,
    /// Both directions confirmed; carries the remote version.
    Established(VersionPayload),
}

/// Version/verack exchange for one connection.
///
/// Either side may speak first, so establishment is checked both when our
/// "verack" goes out and when theirs comes in.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn is_established(&self) -> bool {
        matches!(self.state, HandshakeState::Established(_))
    }

    pub fn verack_sent(&self) -> bool {
        match &self.state {
            HandshakeState::Awaiting { remote, .. } => remote.is_some(),
            HandshakeState::Established(_) => true,
        }
    }

    pub fn verack_received(&self) -> bool {
        match &self.state {
            HandshakeState::Awaiting { verack_received, .. } => *verack_received,
            HandshakeState::Established(_) => true,
        }
    }

    pub fn remote_version(&self) -> Option<&VersionPayload> {
        match &self.state {
            HandshakeState::Awaiting { remote, .. } => remote.as_ref(),
            HandshakeState::Established(remote) => Some(remote),
        }
    }

    /// Feeds one inbound message.
    ///
    /// `decode_version` is only called for the first "version"; its error is
    /// fatal for the connection and leaves the state untouched. Anything
    /// other than "version"/"verack", and everything once established, yields
    /// no actions.
    pub fn on_message<F>(
        &mut self,
        command: &str,
        payload: &[u8],
        decode_version: F,
    ) -> Result<Vec<HandshakeAction>, VersionError>
    where
        F: FnOnce(&[u8]) -> Result<VersionPayload, VersionError>,
    {
        let HandshakeState::Awaiting { remote, verack_received } = &mut self.state else {
            return Ok(Vec::new());
        };

        match command {
            VERSION_COMMAND if remote.is_none() => {
                let version = decode_version(payload)?;
                if *verack_received {
                    self.state = HandshakeState::Established(version.clone());
                    Ok(vec![HandshakeAction::SendVerack, HandshakeAction::Established(version)])
                } else {
                    *remote = Some(version);
                    Ok(vec![HandshakeAction::SendVerack])
                }
            }
            VERACK_COMMAND => {
                *verack_received = true;
                match remote.take() {
                    Some(version) => {
                        self.state = HandshakeState::Established(version.clone());
                        Ok(vec![HandshakeAction::Established(version)])
                    }
                    None => Ok(Vec::new()),
                }
            }
            _ => Ok(Vec::new()),
        }
    }
}
