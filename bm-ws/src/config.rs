// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Transport configuration and the local identity derived from it.

use bm_wire::{Services, VersionPayload, VersionPolicy, MAX_STREAMS, MAX_USER_AGENT_LEN};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{TransportError, TransportResult};

pub const DEFAULT_STREAM: u64 = 1;

pub fn default_user_agent() -> String {
    format!("/bm-ws:{}/", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Services advertised in our version message.
    pub services: Services,
    pub user_agent: String,
    /// Stream numbers we are interested in, e.g. `[1]`.
    pub streams: Vec<u64>,
    /// Gateway addresses handed out by `bootstrap`, like "wss://gw.example:8443".
    pub seeds: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            services: Services::NODE_MOBILE,
            user_agent: default_user_agent(),
            streams: vec![DEFAULT_STREAM],
            seeds: Vec::new(),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> TransportResult<Self> {
        let config: Self = toml::from_str(source).map_err(|err| TransportError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_streams(mut self, streams: Vec<u64>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds = seeds.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.streams.is_empty() {
            return Err(TransportError::invalid_config("streams must not be empty"));
        }
        if self.streams.len() > MAX_STREAMS {
            return Err(TransportError::invalid_config(format!(
                "at most {} streams are allowed",
                MAX_STREAMS
            )));
        }
        if self.streams.contains(&0) {
            return Err(TransportError::invalid_config("stream numbers start at 1"));
        }
        if self.user_agent.len() > MAX_USER_AGENT_LEN {
            return Err(TransportError::invalid_config(format!(
                "user_agent exceeds {} bytes",
                MAX_USER_AGENT_LEN
            )));
        }
        if self.seeds.iter().any(|seed| seed.trim().is_empty()) {
            return Err(TransportError::invalid_config("seed address must not be empty"));
        }
        Ok(())
    }
}

/// Who we are on the wire. Fixed for the lifetime of a transport.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    pub services: Services,
    pub user_agent: String,
    pub streams: Vec<u64>,
    pub seeds: Vec<String>,
    /// Random per-transport nonce, used to detect connections to ourselves.
    pub nonce: u64,
}

impl LocalIdentity {
    pub fn from_config(config: TransportConfig) -> TransportResult<Self> {
        config.validate()?;
        Ok(Self {
            services: config.services,
            user_agent: config.user_agent,
            streams: config.streams,
            seeds: config.seeds,
            nonce: rand::thread_rng().gen(),
        })
    }

    pub fn version_payload(&self) -> VersionPayload {
        VersionPayload::new(
            self.services,
            self.user_agent.clone(),
            self.streams.clone(),
            self.nonce,
            VersionPayload::placeholder_remote(),
        )
    }

    pub fn gateway_policy(&self) -> VersionPolicy {
        VersionPolicy::gateway(self.nonce, self.streams.clone())
    }
}
