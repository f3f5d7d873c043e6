// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

mod machine;
mod state;

pub use machine::{Handshake, HandshakeAction};
pub use state::HandshakeState;
