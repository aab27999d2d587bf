// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive errors.
//!
//! Archive-level failures make the whole snapshot unusable; per-environment
//! failures are recoverable (that environment is skipped for the reload).

use relay_core::SdkDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("archive member {path:?} exceeds the size limit ({size} > {limit} bytes)")]
    MemberTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("archive has no checksum file")]
    ChecksumMissing,

    #[error("archive checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    #[error("environment {env_id} metadata is unreadable: {source}")]
    Metadata {
        env_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment {env_id} sdk data is unreadable: {source}")]
    Data {
        env_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment {env_id}: {source}")]
    SdkData {
        env_id: String,
        #[source]
        source: SdkDataError,
    },
}
