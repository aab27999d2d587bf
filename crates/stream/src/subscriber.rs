// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The subscription half of the stream manager.
//!
//! Owns the HTTP connection to the auto-config endpoint, decodes SSE frames
//! into typed protocol events, and feeds them to the dispatcher in arrival
//! order. Reconnects with backoff on transport failures; 401/403 is
//! permanent and surfaces on the ready channel instead.

use crate::backoff::RetryDelay;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::protocol::{self, ProtocolEvent};
use crate::sse::{SseDecoder, SseEvent};
use futures_util::StreamExt;
use relay_core::obscure_event_data;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub(crate) const STREAM_PATH: &str = "/relay_auto_config";
const PROTOCOL_VERSION_PARAM: &str = "rpacProtocolVersion";

pub(crate) struct Subscriber {
    config: StreamConfig,
    event_tx: mpsc::Sender<ProtocolEvent>,
    ready_tx: Option<oneshot::Sender<Result<(), StreamError>>>,
    halt: CancellationToken,
}

/// What to do after one connection attempt ends.
enum ConnectionOutcome {
    /// Transport/protocol trouble; reconnect after backoff.
    Retry,
    /// Permanent failure or shutdown; stop the subscription task.
    Stop,
}

/// What to do after handling one decoded SSE event.
enum EventOutcome {
    Continue,
    /// Protocol break or server-requested reconnect: drop the connection,
    /// keep all state.
    Restart,
    /// The dispatcher is gone; the manager is closing.
    Halt,
}

impl Subscriber {
    pub fn new(
        config: StreamConfig,
        event_tx: mpsc::Sender<ProtocolEvent>,
        ready_tx: oneshot::Sender<Result<(), StreamError>>,
        halt: CancellationToken,
    ) -> Self {
        Self { config, event_tx, ready_tx: Some(ready_tx), halt }
    }

    pub async fn run(mut self) {
        let url = match stream_url(&self.config) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "auto-config stream cannot start");
                self.deliver_ready(Err(e));
                return;
            }
        };
        let client = match self.config.client.clone().map(Ok).unwrap_or_else(default_client) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "auto-config stream cannot start");
                self.deliver_ready(Err(e));
                return;
            }
        };
        let mut retry = RetryDelay::new(
            self.config.initial_retry_delay,
            self.config.max_retry_delay,
            self.config.jitter_ratio,
            self.config.retry_reset_interval,
        );

        loop {
            match self.connect_and_read(&client, &url, &mut retry).await {
                ConnectionOutcome::Stop => break,
                ConnectionOutcome::Retry => {
                    let delay = retry.next_delay(Instant::now());
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting auto-config stream");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.halt.cancelled() => break,
                    }
                }
            }
        }
        // if we never connected, let the caller stop waiting
        self.deliver_ready(Err(StreamError::Closed));
    }

    async fn connect_and_read(
        &mut self,
        client: &reqwest::Client,
        url: &reqwest::Url,
        retry: &mut RetryDelay,
    ) -> ConnectionOutcome {
        let request = client
            .get(url.clone())
            .header(reqwest::header::AUTHORIZATION, self.config.auto_config_key.clone());
        let response = tokio::select! {
            response = request.send() => response,
            _ = self.halt.cancelled() => return ConnectionOutcome::Stop,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "auto-config connection failed");
                return ConnectionOutcome::Retry;
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            tracing::error!(%status, "auto-config key rejected, giving up");
            self.deliver_ready(Err(StreamError::Unauthorized { status: status.as_u16() }));
            return ConnectionOutcome::Stop;
        }
        if !status.is_success() {
            tracing::warn!(%status, "unexpected auto-config response status");
            return ConnectionOutcome::Retry;
        }

        tracing::info!("connected to auto-config stream");
        self.deliver_ready(Ok(()));
        retry.connected(Instant::now());

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut events = Vec::new();
        loop {
            let read = tokio::select! {
                read = tokio::time::timeout(self.config.read_timeout, body.next()) => read,
                _ = self.halt.cancelled() => return ConnectionOutcome::Stop,
            };
            let chunk = match read {
                Err(_) => {
                    tracing::warn!("auto-config stream went silent, reconnecting");
                    return ConnectionOutcome::Retry;
                }
                Ok(None) => {
                    tracing::warn!("auto-config stream ended");
                    return ConnectionOutcome::Retry;
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, "auto-config stream read failed");
                    return ConnectionOutcome::Retry;
                }
                Ok(Some(Ok(chunk))) => chunk,
            };
            decoder.feed(&chunk, &mut events);
            for event in events.drain(..) {
                match self.handle_event(event).await {
                    EventOutcome::Continue => {}
                    EventOutcome::Restart => return ConnectionOutcome::Retry,
                    EventOutcome::Halt => return ConnectionOutcome::Stop,
                }
            }
        }
    }

    async fn handle_event(&mut self, event: SseEvent) -> EventOutcome {
        tracing::debug!(
            event = %event.name,
            data = %obscure_event_data(&event.data),
            "auto-config event"
        );
        if event.name == protocol::EVENT_RECONNECT {
            tracing::info!("server requested reconnect");
            return EventOutcome::Restart;
        }
        match protocol::decode_event(&event.name, &event.data) {
            Ok(Some(decoded)) => {
                if self.event_tx.send(decoded).await.is_err() {
                    EventOutcome::Halt
                } else {
                    EventOutcome::Continue
                }
            }
            Ok(None) => EventOutcome::Continue,
            Err(e) => {
                tracing::error!(
                    event = %event.name,
                    error = %e,
                    "malformed auto-config event, restarting stream"
                );
                EventOutcome::Restart
            }
        }
    }

    fn deliver_ready(&mut self, result: Result<(), StreamError>) {
        if let Some(ready_tx) = self.ready_tx.take() {
            let _ = ready_tx.send(result);
        }
    }
}

/// Build the stream URL from the configured base URI.
pub(crate) fn stream_url(config: &StreamConfig) -> Result<reqwest::Url, StreamError> {
    let raw = format!("{}{}", config.base_uri.trim_end_matches('/'), STREAM_PATH);
    let mut url: reqwest::Url =
        raw.parse().map_err(|_| StreamError::InvalidUri(config.base_uri.clone()))?;
    if config.protocol_version > 1 {
        url.query_pairs_mut()
            .append_pair(PROTOCOL_VERSION_PARAM, &config.protocol_version.to_string());
    }
    Ok(url)
}

/// The default client carries no total request timeout: it reads an endless
/// stream. Silence is bounded by the configured read timeout instead.
fn default_client() -> Result<reqwest::Client, StreamError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| StreamError::HttpClient(e.to_string()))
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
