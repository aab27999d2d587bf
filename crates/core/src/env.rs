// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment and payload-filter data model.
//!
//! The wire/file forms ([`EnvironmentRep`], [`FilterRep`]) mirror the
//! auto-config JSON field for field. The internal forms
//! ([`EnvironmentParams`], [`FilterParams`]) carry exactly what the
//! downstream [`UpdateHandler`](crate::UpdateHandler) needs, nothing more.

use crate::sdk_data::SdkData;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Upstream-assigned environment identifier.
    ///
    /// Doubles as the credential browser-side SDKs authenticate with.
    pub struct EnvironmentId;
}

crate::define_id! {
    /// Payload filter key, unique within a project.
    pub struct FilterId;
}

crate::define_id! {
    /// Server-side SDK credential.
    pub struct SdkKey;
}

crate::define_id! {
    /// Mobile SDK credential.
    pub struct MobileKey;
}

/// Environment record as carried by the auto-config stream and the offline
/// archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRep {
    #[serde(rename = "envID")]
    pub env_id: EnvironmentId,
    pub env_key: String,
    pub env_name: String,
    pub proj_key: String,
    pub proj_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mob_key: Option<MobileKey>,
    pub sdk_key: SdkKeyRep,
    #[serde(default)]
    pub default_ttl: u32,
    #[serde(default)]
    pub secure_mode: bool,
    pub version: u64,
}

/// Current SDK key plus an optional rotated-out predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkKeyRep {
    pub value: SdkKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiring: Option<ExpiringKeyRep>,
}

impl SdkKeyRep {
    pub fn new(value: impl Into<SdkKey>) -> Self {
        Self { value: value.into(), expiring: None }
    }
}

/// A rotated-out SDK key that stays valid until `timestamp` (epoch ms),
/// after which the relay must reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringKeyRep {
    pub value: SdkKey,
    pub timestamp: u64,
}

impl ExpiringKeyRep {
    /// True when the record actually describes an expiry. Upstream sends
    /// empty-value or zero-timestamp records to mean "nothing expiring".
    pub fn is_defined(&self) -> bool {
        !self.value.is_empty() && self.timestamp != 0
    }
}

/// Payload filter record from the auto-config stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRep {
    pub filter_key: FilterId,
    pub proj_key: String,
    pub version: u64,
}

/// The subset of an environment the downstream handler needs to create or
/// reconfigure an SDK context.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentParams {
    pub env_id: EnvironmentId,
    pub env_key: String,
    pub env_name: String,
    pub proj_key: String,
    pub proj_name: String,
    pub sdk_key: SdkKey,
    pub mob_key: Option<MobileKey>,
    /// Previous SDK key still honoured until its expiry timer fires. Cleared
    /// before dispatch when the expiry timestamp has already passed.
    pub expiring_sdk_key: Option<SdkKey>,
    pub default_ttl: Duration,
    pub secure_mode: bool,
    /// Set by the archive source when the snapshot describes a filtered
    /// environment; `None` in stream mode.
    pub filter_key: Option<FilterId>,
    /// Flag/segment payload attached by the archive source on inserts and on
    /// data-bearing updates; `None` in stream mode and on metadata-only
    /// updates.
    pub sdk_data: Option<SdkData>,
}

impl From<&EnvironmentRep> for EnvironmentParams {
    fn from(rep: &EnvironmentRep) -> Self {
        Self {
            env_id: rep.env_id.clone(),
            env_key: rep.env_key.clone(),
            env_name: rep.env_name.clone(),
            proj_key: rep.proj_key.clone(),
            proj_name: rep.proj_name.clone(),
            sdk_key: rep.sdk_key.value.clone(),
            mob_key: rep.mob_key.clone(),
            expiring_sdk_key: rep
                .sdk_key
                .expiring
                .as_ref()
                .filter(|expiring| !expiring.value.is_empty())
                .map(|expiring| expiring.value.clone()),
            default_ttl: Duration::from_secs(u64::from(rep.default_ttl)),
            secure_mode: rep.secure_mode,
            filter_key: None,
            sdk_data: None,
        }
    }
}

/// The subset of a payload filter the downstream handler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParams {
    pub key: FilterId,
    pub proj_key: String,
}

impl From<&FilterRep> for FilterParams {
    fn from(rep: &FilterRep) -> Self {
        Self { key: rep.filter_key.clone(), proj_key: rep.proj_key.clone() }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
