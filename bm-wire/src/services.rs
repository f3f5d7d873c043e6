// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Node services bit-set advertised in the version message.

use serde::{Deserialize, Serialize};

/// Services bit-set.
///
/// Unknown bits are preserved as-is so peers advertising newer services are
/// neither rejected nor rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Services(u64);

impl Services {
    pub const NONE: Services = Services(0);
    /// A normal network node that relays objects.
    pub const NODE_NETWORK: Services = Services(1 << 0);
    /// A node bridging non-routable clients into the network.
    pub const NODE_GATEWAY: Services = Services(1 << 1);
    /// A mobile or otherwise constrained client.
    pub const NODE_MOBILE: Services = Services(1 << 2);
    pub const NODE_SIMPLE: Services = Services(1 << 3);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn contains(self, other: Services) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Services, enabled: bool) {
        if enabled {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    pub fn with(mut self, other: Services) -> Self {
        self.set(other, true);
        self
    }
}

impl std::ops::BitOr for Services {
    type Output = Services;

    fn bitor(self, rhs: Services) -> Services {
        Services(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(Services, &str); 4] = [
            (Services::NODE_NETWORK, "NODE_NETWORK"),
            (Services::NODE_GATEWAY, "NODE_GATEWAY"),
            (Services::NODE_MOBILE, "NODE_MOBILE"),
            (Services::NODE_SIMPLE, "NODE_SIMPLE"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{:#x} [{}]", self.0, names.join(" | "))
    }
}
