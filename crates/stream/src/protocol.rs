// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed decoding of the auto-config protocol.
//!
//! Unknown event names, unknown path prefixes, non-root puts, and entity-id
//! mismatches are understood-and-ignored (forward compatible); only JSON
//! that fails to parse is a protocol break, which the subscriber answers
//! with a stream restart.

use relay_core::{EnvironmentId, EnvironmentRep, FilterId, FilterRep};
use serde::Deserialize;
use std::collections::HashMap;

pub(crate) const EVENT_PUT: &str = "put";
pub(crate) const EVENT_PATCH: &str = "patch";
pub(crate) const EVENT_DELETE: &str = "delete";
pub(crate) const EVENT_RECONNECT: &str = "reconnect";

const ENVIRONMENTS_PREFIX: &str = "environments/";
const FILTERS_PREFIX: &str = "filters/";

/// A decoded auto-config message, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProtocolEvent {
    /// Full snapshot of all environments and filters.
    Put {
        environments: HashMap<String, EnvironmentRep>,
        filters: HashMap<String, FilterRep>,
    },
    PatchEnvironment(EnvironmentRep),
    PatchFilter(FilterRep),
    DeleteEnvironment { env_id: EnvironmentId, version: u64 },
    DeleteFilter { filter_id: FilterId, version: u64 },
}

#[derive(Debug, Deserialize)]
struct PutMessage {
    path: String,
    data: PutData,
}

#[derive(Debug, Default, Deserialize)]
struct PutData {
    #[serde(default)]
    environments: HashMap<String, EnvironmentRep>,
    #[serde(default)]
    filters: HashMap<String, FilterRep>,
}

#[derive(Debug, Deserialize)]
struct PatchMessage {
    path: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DeleteMessage {
    path: String,
    version: u64,
}

/// Entity kind addressed by a patch/delete path.
enum ItemPath<'a> {
    Environment(&'a str),
    Filter(&'a str),
    Unknown,
}

fn parse_item_path(path: &str) -> ItemPath<'_> {
    if let Some(id) = path.strip_prefix(ENVIRONMENTS_PREFIX) {
        ItemPath::Environment(id)
    } else if let Some(id) = path.strip_prefix(FILTERS_PREFIX) {
        ItemPath::Filter(id)
    } else {
        ItemPath::Unknown
    }
}

/// Decode one named SSE event into a protocol event.
///
/// `Ok(None)` means understood-and-ignored; `Err` means malformed JSON.
pub(crate) fn decode_event(
    name: &str,
    data: &str,
) -> Result<Option<ProtocolEvent>, serde_json::Error> {
    match name {
        EVENT_PUT => {
            let msg: PutMessage = serde_json::from_str(data)?;
            if msg.path != "/" {
                tracing::warn!(path = %msg.path, "ignoring put for non-root path");
                return Ok(None);
            }
            Ok(Some(ProtocolEvent::Put {
                environments: msg.data.environments,
                filters: msg.data.filters,
            }))
        }
        EVENT_PATCH => {
            let msg: PatchMessage = serde_json::from_str(data)?;
            match parse_item_path(&msg.path) {
                ItemPath::Environment(id) => {
                    let rep: EnvironmentRep = serde_json::from_value(msg.data)?;
                    if rep.env_id.as_str() != id {
                        tracing::warn!(
                            path_id = id,
                            env_id = %rep.env_id,
                            "patched environment disagrees with its path id, dropping"
                        );
                        return Ok(None);
                    }
                    Ok(Some(ProtocolEvent::PatchEnvironment(rep)))
                }
                ItemPath::Filter(id) => {
                    let rep: FilterRep = serde_json::from_value(msg.data)?;
                    if rep.filter_key.as_str() != id {
                        tracing::warn!(
                            path_id = id,
                            filter_key = %rep.filter_key,
                            "patched filter disagrees with its path id, dropping"
                        );
                        return Ok(None);
                    }
                    Ok(Some(ProtocolEvent::PatchFilter(rep)))
                }
                ItemPath::Unknown => {
                    tracing::debug!(path = %msg.path, "ignoring patch for unrecognised path");
                    Ok(None)
                }
            }
        }
        EVENT_DELETE => {
            let msg: DeleteMessage = serde_json::from_str(data)?;
            match parse_item_path(&msg.path) {
                ItemPath::Environment(id) => Ok(Some(ProtocolEvent::DeleteEnvironment {
                    env_id: EnvironmentId::new(id),
                    version: msg.version,
                })),
                ItemPath::Filter(id) => Ok(Some(ProtocolEvent::DeleteFilter {
                    filter_id: FilterId::new(id),
                    version: msg.version,
                })),
                ItemPath::Unknown => {
                    tracing::debug!(path = %msg.path, "ignoring delete for unrecognised path");
                    Ok(None)
                }
            }
        }
        other => {
            tracing::warn!(event = other, "ignoring unrecognised auto-config event");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
