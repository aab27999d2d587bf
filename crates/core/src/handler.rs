// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Downstream contract: environment lifecycle callbacks into the relay.

use crate::env::{EnvironmentId, EnvironmentParams, FilterId, FilterParams, SdkKey};
use async_trait::async_trait;

/// Sink for the environment lifecycle produced by either data source.
///
/// Exactly one manager drives a given handler at a time, and that manager
/// invokes it serially from a single task. Implementations own any further
/// synchronisation they need.
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    /// A previously unknown environment came into existence.
    async fn add_environment(&self, params: EnvironmentParams);

    /// An existing environment changed; identity is preserved.
    async fn update_environment(&self, params: EnvironmentParams);

    /// An environment ceased to exist. The filter key accompanies deletes
    /// originating from a filtered archive snapshot.
    async fn delete_environment(&self, env_id: &EnvironmentId, filter_key: Option<&FilterId>);

    /// Stream mode only: a payload filter was added or changed.
    async fn add_filter(&self, params: FilterParams);

    /// Stream mode only: a payload filter was removed.
    async fn delete_filter(&self, filter_id: &FilterId);

    /// Stream mode only: a rotated SDK key reached its expiry timestamp and
    /// must no longer be accepted. Emitted once per elapsed timer.
    async fn key_expired(&self, env_id: &EnvironmentId, old_key: &SdkKey);

    /// All data for the current put/snapshot has been delivered.
    async fn received_all(&self);
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::UpdateHandler;
    use crate::env::{EnvironmentId, EnvironmentParams, FilterId, FilterParams, SdkKey};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded handler invocation.
    #[derive(Debug, Clone, PartialEq)]
    pub enum HandlerCall {
        AddEnvironment(EnvironmentParams),
        UpdateEnvironment(EnvironmentParams),
        DeleteEnvironment(EnvironmentId, Option<FilterId>),
        AddFilter(FilterParams),
        DeleteFilter(FilterId),
        KeyExpired(EnvironmentId, SdkKey),
        ReceivedAll,
    }

    /// Fake handler for testing: records every call in order.
    #[derive(Clone, Default)]
    pub struct FakeUpdateHandler {
        calls: Arc<Mutex<Vec<HandlerCall>>>,
    }

    impl FakeUpdateHandler {
        pub fn new() -> Self {
            Self::default()
        }

        /// All calls recorded so far, in invocation order.
        pub fn calls(&self) -> Vec<HandlerCall> {
            self.calls.lock().clone()
        }

        /// Drain the recorded calls.
        pub fn take_calls(&self) -> Vec<HandlerCall> {
            std::mem::take(&mut *self.calls.lock())
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn record(&self, call: HandlerCall) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl UpdateHandler for FakeUpdateHandler {
        async fn add_environment(&self, params: EnvironmentParams) {
            self.record(HandlerCall::AddEnvironment(params));
        }

        async fn update_environment(&self, params: EnvironmentParams) {
            self.record(HandlerCall::UpdateEnvironment(params));
        }

        async fn delete_environment(
            &self,
            env_id: &EnvironmentId,
            filter_key: Option<&FilterId>,
        ) {
            self.record(HandlerCall::DeleteEnvironment(env_id.clone(), filter_key.cloned()));
        }

        async fn add_filter(&self, params: FilterParams) {
            self.record(HandlerCall::AddFilter(params));
        }

        async fn delete_filter(&self, filter_id: &FilterId) {
            self.record(HandlerCall::DeleteFilter(filter_id.clone()));
        }

        async fn key_expired(&self, env_id: &EnvironmentId, old_key: &SdkKey) {
            self.record(HandlerCall::KeyExpired(env_id.clone(), old_key.clone()));
        }

        async fn received_all(&self) {
            self.record(HandlerCall::ReceivedAll);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeUpdateHandler, HandlerCall};
