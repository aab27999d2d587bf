// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream client errors.
//!
//! Only permanent conditions reach the caller (via the ready channel);
//! transient transport and protocol failures are retried internally.

use thiserror::Error;

/// Permanent failures of the auto-config subscription.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The configured base URI could not be parsed.
    #[error("invalid stream URI: {0}")]
    InvalidUri(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The auto-config key was rejected upstream; reconnecting would only
    /// repeat the rejection.
    #[error("auto-config key rejected (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The manager was closed before a connection was established.
    #[error("stream manager closed")]
    Closed,

    /// `start` was called more than once on the same manager.
    #[error("stream manager already started")]
    AlreadyStarted,
}
