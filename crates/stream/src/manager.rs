// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! StreamManager: the auto-config subscription and its dispatcher.
//!
//! Two tasks cooperate here. The subscriber (see `subscriber`) owns the HTTP
//! connection and turns SSE frames into typed events. The dispatcher below
//! is the single owner of all receiver state and the expiry-timer map, and
//! the only caller of the UpdateHandler; it multiplexes the event queue, the
//! expired-key queue, and the halt signal. Expiry timers are one-shot tasks
//! that publish onto the expired-key queue and exit.

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::protocol::ProtocolEvent;
use crate::subscriber::Subscriber;
use relay_core::{
    Action, Clock, EnvironmentId, EnvironmentParams, EnvironmentRep, FilterId, FilterParams,
    FilterRep, MessageReceiver, SdkKey, SystemClock, UpdateHandler,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;
/// Buffered so expiry timer tasks never block on a busy dispatcher.
const EXPIRED_KEY_CHANNEL_CAPACITY: usize = 16;

/// Notification published by an expiry timer task.
#[derive(Debug)]
struct ExpiredKey {
    env_id: EnvironmentId,
    key: SdkKey,
}

/// Owns one upstream auto-config subscription and keeps the downstream
/// handler in sync with it.
pub struct StreamManager<H, C: Clock = SystemClock> {
    config: StreamConfig,
    handler: Arc<H>,
    clock: C,
    halt: CancellationToken,
    started: AtomicBool,
}

impl<H: UpdateHandler> StreamManager<H> {
    pub fn new(config: StreamConfig, handler: Arc<H>) -> Self {
        Self::with_clock(config, handler, SystemClock)
    }
}

impl<H: UpdateHandler, C: Clock> StreamManager<H, C> {
    pub fn with_clock(config: StreamConfig, handler: Arc<H>, clock: C) -> Self {
        Self { config, handler, clock, halt: CancellationToken::new(), started: AtomicBool::new(false) }
    }

    /// Launch the subscription.
    ///
    /// The returned channel yields exactly one value: `Ok(())` on the first
    /// successful connection, or the permanent failure (bad URI, rejected
    /// key) that stopped the stream before it ever came up.
    pub fn start(&self) -> oneshot::Receiver<Result<(), StreamError>> {
        let (ready_tx, ready_rx) = oneshot::channel();
        if self.started.swap(true, Ordering::SeqCst) {
            let _ = ready_tx.send(Err(StreamError::AlreadyStarted));
            return ready_rx;
        }
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (expired_tx, expired_rx) = mpsc::channel(EXPIRED_KEY_CHANNEL_CAPACITY);
        let subscriber =
            Subscriber::new(self.config.clone(), event_tx, ready_tx, self.halt.clone());
        let dispatcher =
            Dispatcher::new(Arc::clone(&self.handler), self.clock.clone(), expired_tx);
        tokio::spawn(subscriber.run());
        tokio::spawn(dispatcher.run(event_rx, expired_rx, self.halt.clone()));
        ready_rx
    }

    /// Idempotent shutdown: stops the subscription, cancels every expiry
    /// timer, and lets both worker tasks drain. Safe to call from any task,
    /// including concurrently with `start`.
    pub fn close(&self) {
        self.halt.cancel();
    }
}

impl<H, C: Clock> Drop for StreamManager<H, C> {
    fn drop(&mut self) {
        self.halt.cancel();
    }
}

/// Single owner of receiver state, expiry timers, and handler invocation.
struct Dispatcher<H, C: Clock> {
    handler: Arc<H>,
    clock: C,
    environments: MessageReceiver<EnvironmentRep>,
    filters: MessageReceiver<FilterRep>,
    expiry_timers: HashMap<SdkKey, JoinHandle<()>>,
    expired_tx: mpsc::Sender<ExpiredKey>,
}

impl<H: UpdateHandler, C: Clock> Dispatcher<H, C> {
    fn new(handler: Arc<H>, clock: C, expired_tx: mpsc::Sender<ExpiredKey>) -> Self {
        Self {
            handler,
            clock,
            environments: MessageReceiver::new(),
            filters: MessageReceiver::new(),
            expiry_timers: HashMap::new(),
            expired_tx,
        }
    }

    async fn run(
        mut self,
        mut event_rx: mpsc::Receiver<ProtocolEvent>,
        mut expired_rx: mpsc::Receiver<ExpiredKey>,
        halt: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = halt.cancelled() => break,
                Some(expired) = expired_rx.recv() => self.handle_expired(expired).await,
                event = event_rx.recv() => match event {
                    Some(event) => self.apply(event).await,
                    None => break,
                },
            }
        }
        for (_, timer) in self.expiry_timers.drain() {
            timer.abort();
        }
    }

    async fn apply(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::Put { environments, filters } => {
                self.apply_put(environments, filters).await;
            }
            ProtocolEvent::PatchEnvironment(rep) => {
                let action = self.environments.upsert(rep.env_id.as_str(), rep.clone(), rep.version);
                self.dispatch_environment(rep, action).await;
            }
            ProtocolEvent::PatchFilter(rep) => {
                let action = self.filters.upsert(rep.filter_key.as_str(), rep.clone(), rep.version);
                self.dispatch_filter(rep, action).await;
            }
            ProtocolEvent::DeleteEnvironment { env_id, version } => {
                if self.environments.delete(env_id.as_str(), version) == Action::Delete {
                    self.handler.delete_environment(&env_id, None).await;
                }
            }
            ProtocolEvent::DeleteFilter { filter_id, version } => {
                if self.filters.delete(filter_id.as_str(), version) == Action::Delete {
                    self.handler.delete_filter(&filter_id).await;
                }
            }
        }
    }

    async fn apply_put(
        &mut self,
        environments: HashMap<String, EnvironmentRep>,
        filters: HashMap<String, FilterRep>,
    ) {
        tracing::info!(
            environments = environments.len(),
            filters = filters.len(),
            "received configuration snapshot"
        );
        for (id, rep) in &environments {
            if rep.env_id.as_str() != id.as_str() {
                tracing::warn!(
                    key = %id,
                    env_id = %rep.env_id,
                    "environment key does not match its envID, skipping"
                );
                continue;
            }
            let action = self.environments.upsert(id, rep.clone(), rep.version);
            self.dispatch_environment(rep.clone(), action).await;
        }
        // filter entries are taken at their map key as-is; only the patch
        // path cross-checks the embedded filterKey
        for (id, rep) in &filters {
            let action = self.filters.upsert(id, rep.clone(), rep.version);
            self.dispatch_filter(rep.clone(), action).await;
        }
        // anything the snapshot no longer lists is gone
        for env_id in self.environments.retain(|id| environments.contains_key(id)) {
            self.handler.delete_environment(&EnvironmentId::new(env_id), None).await;
        }
        for filter_id in self.filters.retain(|id| filters.contains_key(id)) {
            self.handler.delete_filter(&FilterId::new(filter_id)).await;
        }
        self.handler.received_all().await;
    }

    async fn dispatch_environment(&mut self, rep: EnvironmentRep, action: Action) {
        match action {
            Action::Noop | Action::Delete => {}
            Action::Insert => {
                let params = self.environment_params(&rep);
                self.handler.add_environment(params).await;
            }
            Action::Update => {
                let params = self.environment_params(&rep);
                self.handler.update_environment(params).await;
            }
        }
    }

    async fn dispatch_filter(&mut self, rep: FilterRep, action: Action) {
        match action {
            Action::Noop | Action::Delete => {}
            // the handler contract has no separate filter update; a changed
            // filter is re-added under the same key
            Action::Insert | Action::Update => {
                self.handler.add_filter(FilterParams::from(&rep)).await;
            }
        }
    }

    /// Build handler params for a live environment, applying expiring-key
    /// policy: stale expiries are cleared before dispatch, future expiries
    /// get at most one timer per distinct key.
    fn environment_params(&mut self, rep: &EnvironmentRep) -> EnvironmentParams {
        let mut params = EnvironmentParams::from(rep);
        if let Some(expiring) = rep.sdk_key.expiring.as_ref().filter(|e| e.is_defined()) {
            if self.expiry_timers.contains_key(&expiring.value) {
                // already armed; a repeat notification must not double-fire
            } else if expiring.timestamp <= self.clock.epoch_ms() {
                // rotation already elapsed: never hand the old key out as valid
                params.expiring_sdk_key = None;
            } else {
                self.arm_expiry_timer(
                    rep.env_id.clone(),
                    expiring.value.clone(),
                    expiring.timestamp,
                );
            }
        }
        params
    }

    fn arm_expiry_timer(&mut self, env_id: EnvironmentId, key: SdkKey, deadline_ms: u64) {
        let delay = self.clock.until_epoch_ms(deadline_ms);
        tracing::debug!(
            %env_id,
            delay_ms = delay.as_millis() as u64,
            "scheduling sdk key expiry"
        );
        let expired_tx = self.expired_tx.clone();
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = expired_tx.send(ExpiredKey { env_id, key }).await;
        });
        self.expiry_timers.insert(timer_key, timer);
    }

    async fn handle_expired(&mut self, expired: ExpiredKey) {
        self.expiry_timers.remove(&expired.key);
        tracing::info!(env_id = %expired.env_id, "sdk key for environment has expired");
        self.handler.key_expired(&expired.env_id, &expired.key).await;
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
