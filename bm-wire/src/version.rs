// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};

use crate::encoding::{write_var_int_list, write_var_str, DecodeError, SliceReader};
use crate::services::Services;

pub const PROTOCOL_VERSION: u32 = 3;
pub const MAX_USER_AGENT_LEN: usize = 5000;
pub const MAX_STREAMS: usize = 160_000;
pub const MAX_TIME_OFFSET_SECS: i64 = 3600;

/// Port advertised as our own listening port. A client behind a gateway is
/// not reachable, so the value is never dialled.
pub const PLACEHOLDER_PORT: u16 = 8444;

/// Network address without the time field, as embedded in "version".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAddr {
    pub services: Services,
    pub ip: IpAddr,
    pub port: u16,
}

impl NetAddr {
    pub fn new(services: Services, addr: SocketAddr) -> Self {
        Self { services, ip: addr.ip(), port: addr.port() }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64(self.services.bits());
        let octets = match self.ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        buf.put_slice(&octets);
        buf.put_u16(self.port);
    }

    fn decode(reader: &mut SliceReader<'_>) -> Result<Self, DecodeError> {
        let services = Services::from_bits(reader.read_u64()?);
        let v6 = Ipv6Addr::from(reader.read_array::<16>()?);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        let port = reader.read_u16()?;
        Ok(Self { services, ip, port })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    pub version: u32,
    pub services: Services,
    pub timestamp: i64,
    pub addr_recv: NetAddr,
    pub addr_from: NetAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub streams: Vec<u64>,
}

impl VersionPayload {
    /// Builds the local version announcement.
    ///
    /// `remote` fills `addr_recv`; a gateway ignores it, so callers without a
    /// resolved peer address pass [`VersionPayload::placeholder_remote`].
    /// Length limits are not checked here; peers enforce them on decode.
    pub fn new(
        services: Services,
        user_agent: impl Into<String>,
        streams: Vec<u64>,
        nonce: u64,
        remote: SocketAddr,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            services,
            timestamp: unix_now(),
            addr_recv: NetAddr::new(Services::NODE_NETWORK, remote),
            addr_from: NetAddr::new(services, Self::placeholder_remote()),
            nonce,
            user_agent: user_agent.into(),
            streams,
        }
    }

    pub fn placeholder_remote() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), PLACEHOLDER_PORT)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(80 + self.user_agent.len() + self.streams.len());
        buf.put_u32(self.version);
        buf.put_u64(self.services.bits());
        buf.put_i64(self.timestamp);
        self.addr_recv.encode(&mut buf);
        self.addr_from.encode(&mut buf);
        buf.put_u64(self.nonce);
        write_var_str(&mut buf, &self.user_agent);
        write_var_int_list(&mut buf, &self.streams);
        buf.freeze()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = SliceReader::new(payload);
        let version = reader.read_u32()?;
        let services = Services::from_bits(reader.read_u64()?);
        let timestamp = reader.read_i64()?;
        let addr_recv = NetAddr::decode(&mut reader)?;
        let addr_from = NetAddr::decode(&mut reader)?;
        let nonce = reader.read_u64()?;
        let user_agent = reader.read_var_str(MAX_USER_AGENT_LEN)?;
        let streams = reader.read_var_int_list(MAX_STREAMS)?;
        if streams.is_empty() {
            return Err(DecodeError::InvalidValue("empty stream list"));
        }
        if streams.contains(&0) {
            return Err(DecodeError::InvalidValue("stream number 0"));
        }
        if reader.remaining() > 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }

        Ok(Self { version, services, timestamp, addr_recv, addr_from, nonce, user_agent, streams })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version: malformed payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("version: unsupported protocol version {0}")]
    UnsupportedProtocol(u32),

    #[error("version: connection to self")]
    SelfConnection,

    #[error("version: clock offset of {0}s is too large")]
    TimeOffset(i64),

    #[error("version: no stream in common")]
    NoCommonStream,

    #[error("version: not a network node: {0}")]
    NotNetworkNode(Services),

    #[error("version: receiver address {0}:{1} is not routable")]
    UnroutableReceiver(IpAddr, u16),
}

/// How strictly an inbound version is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Peer-to-peer between routable nodes.
    Network,
    /// A non-routable client talking to a gateway: the remote is not asked to
    /// be a relaying node and our claimed address is not checked.
    #[default]
    Gateway,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    pub nonce: u64,
    pub streams: Vec<u64>,
    pub mode: ValidationMode,
    pub max_time_offset: i64,
}

impl VersionPolicy {
    pub fn new(nonce: u64, streams: Vec<u64>, mode: ValidationMode) -> Self {
        Self { nonce, streams, mode, max_time_offset: MAX_TIME_OFFSET_SECS }
    }

    pub fn gateway(nonce: u64, streams: Vec<u64>) -> Self {
        Self::new(nonce, streams, ValidationMode::Gateway)
    }

    pub fn validate(&self, version: &VersionPayload, now: i64) -> Result<(), VersionError> {
        if version.version < PROTOCOL_VERSION {
            return Err(VersionError::UnsupportedProtocol(version.version));
        }
        if version.nonce == self.nonce {
            return Err(VersionError::SelfConnection);
        }
        let offset = version.timestamp.saturating_sub(now);
        if offset.saturating_abs() > self.max_time_offset {
            return Err(VersionError::TimeOffset(offset));
        }
        if !version.streams.iter().any(|s| self.streams.contains(s)) {
            return Err(VersionError::NoCommonStream);
        }

        if self.mode == ValidationMode::Network {
            if !version.services.contains(Services::NODE_NETWORK) {
                return Err(VersionError::NotNetworkNode(version.services));
            }
            let recv = &version.addr_recv;
            if recv.port == 0 || recv.ip.is_unspecified() {
                return Err(VersionError::UnroutableReceiver(recv.ip, recv.port));
            }
        }
        Ok(())
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_version() -> VersionPayload {
        let mut version = VersionPayload::new(
            Services::NODE_NETWORK | Services::NODE_GATEWAY,
            "/PyBitmessage:0.6.3/",
            vec![1, 2],
            0xdead_beef,
            "203.0.113.7:8444".parse().unwrap(),
        );
        version.timestamp = 1_700_000_000;
        version
    }

    #[test]
    fn decode_encoded_payload() {
        let version = remote_version();
        let decoded = VersionPayload::decode(&version.encode()).unwrap();
        assert_eq!(decoded, version);
        assert_eq!(decoded.addr_from.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(decoded.addr_from.port, PLACEHOLDER_PORT);
    }

    #[test]
    fn decode_rejects_structural_errors() {
        let mut version = remote_version();
        version.streams = vec![];
        assert_eq!(
            VersionPayload::decode(&version.encode()),
            Err(DecodeError::InvalidValue("empty stream list"))
        );

        let encoded = remote_version().encode();
        assert!(matches!(
            VersionPayload::decode(&encoded[..encoded.len() - 1]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn protocol_version_is_unsigned() {
        let mut version = remote_version();
        version.version = 0x8000_0003;
        let decoded = VersionPayload::decode(&version.encode()).unwrap();
        assert_eq!(decoded.version, 0x8000_0003);
        assert_eq!(VersionPolicy::gateway(7, vec![1]).validate(&decoded, 1_700_000_000), Ok(()));
    }

    #[test]
    fn oversized_user_agent_fails_on_the_peer() {
        let version = VersionPayload::new(
            Services::NODE_MOBILE,
            "x".repeat(MAX_USER_AGENT_LEN + 1),
            vec![1],
            1,
            VersionPayload::placeholder_remote(),
        );
        assert!(matches!(
            VersionPayload::decode(&version.encode()),
            Err(DecodeError::LengthOutOfRange { len: 5001, max: 5000 })
        ));
    }

    #[test]
    fn gateway_policy() {
        let policy = VersionPolicy::gateway(7, vec![1]);
        let now = 1_700_000_000;

        let mut version = remote_version();
        assert_eq!(policy.validate(&version, now), Ok(()));

        version.nonce = 7;
        assert_eq!(policy.validate(&version, now), Err(VersionError::SelfConnection));

        let mut version = remote_version();
        version.timestamp = now + 3601;
        assert_eq!(policy.validate(&version, now), Err(VersionError::TimeOffset(3601)));

        let mut version = remote_version();
        version.streams = vec![5];
        assert_eq!(policy.validate(&version, now), Err(VersionError::NoCommonStream));

        let mut version = remote_version();
        version.version = 2;
        assert_eq!(policy.validate(&version, now), Err(VersionError::UnsupportedProtocol(2)));
    }

    #[test]
    fn gateway_mode_relaxes_network_checks() {
        let now = 1_700_000_000;
        let mut version = remote_version();
        version.services = Services::NODE_GATEWAY;
        version.addr_recv = NetAddr::new(Services::NONE, "0.0.0.0:0".parse().unwrap());

        assert_eq!(VersionPolicy::gateway(7, vec![1]).validate(&version, now), Ok(()));

        let strict = VersionPolicy::new(7, vec![1], ValidationMode::Network);
        assert_eq!(
            strict.validate(&version, now),
            Err(VersionError::NotNetworkNode(Services::NODE_GATEWAY))
        );
        version.services = Services::NODE_NETWORK;
        assert!(matches!(
            strict.validate(&version, now),
            Err(VersionError::UnroutableReceiver(_, 0))
        ));
    }
}
