// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: shared data model and ordering primitives for the relay's
//! dynamic-environment management plane.
//!
//! Both data sources (the auto-config stream and the offline archive) speak
//! the types defined here and drive the same [`UpdateHandler`] contract.

pub mod macros;

pub mod clock;
pub mod env;
pub mod handler;
pub mod receiver;
pub mod redact;
pub mod sdk_data;

pub use clock::{Clock, FakeClock, SystemClock};
pub use env::{
    EnvironmentId, EnvironmentParams, EnvironmentRep, ExpiringKeyRep, FilterId, FilterParams,
    FilterRep, MobileKey, SdkKey, SdkKeyRep,
};
#[cfg(any(test, feature = "test-support"))]
pub use handler::{FakeUpdateHandler, HandlerCall};
pub use handler::UpdateHandler;
pub use receiver::{Action, MessageReceiver};
pub use redact::obscure_event_data;
pub use sdk_data::{SdkData, SdkDataError};
