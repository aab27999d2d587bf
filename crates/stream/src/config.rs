// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-config stream configuration.

use std::fmt;
use std::time::Duration;

/// Tuning for the auto-config SSE subscription.
#[derive(Clone)]
pub struct StreamConfig {
    /// Auto-configuration key, sent as the `Authorization` header.
    pub auto_config_key: String,
    /// Base URI of the upstream service; the stream path is appended.
    pub base_uri: String,
    /// First reconnect delay after a dropped connection.
    pub initial_retry_delay: Duration,
    /// Upper bound for the exponential reconnect delay.
    pub max_retry_delay: Duration,
    /// Total jitter ratio applied to each delay (spread of ±ratio/2).
    pub jitter_ratio: f64,
    /// A connection held at least this long resets the reconnect delay.
    pub retry_reset_interval: Duration,
    /// Maximum silence on the stream before the connection is recycled.
    /// The upstream heartbeats well inside this window.
    pub read_timeout: Duration,
    /// Auto-config protocol version; versions above 1 are advertised via a
    /// query parameter.
    pub protocol_version: u32,
    /// Pre-built HTTP client, e.g. for proxy or TLS configuration. Must not
    /// carry a total request timeout: that would sever the stream mid-flight.
    pub client: Option<reqwest::Client>,
}

impl StreamConfig {
    pub fn new(auto_config_key: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self {
            auto_config_key: auto_config_key.into(),
            base_uri: base_uri.into(),
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            jitter_ratio: 0.5,
            retry_reset_interval: Duration::from_secs(60),
            read_timeout: Duration::from_secs(300),
            protocol_version: 1,
            client: None,
        }
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("auto_config_key", &"<redacted>")
            .field("base_uri", &self.base_uri)
            .field("initial_retry_delay", &self.initial_retry_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("jitter_ratio", &self.jitter_ratio)
            .field("retry_reset_interval", &self.retry_reset_interval)
            .field("read_timeout", &self.read_timeout)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}
