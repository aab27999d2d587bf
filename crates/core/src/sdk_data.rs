// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flag and segment payloads carried by the offline archive.
//!
//! The relay serves these payloads, it does not evaluate them, so items stay
//! opaque JSON. Parsing still validates shape item by item: a single
//! malformed flag names itself instead of poisoning the whole file.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from SDK data parsing.
#[derive(Debug, Error)]
pub enum SdkDataError {
    #[error("sdk data is not a JSON object")]
    NotAnObject,
    #[error("{kind} collection is not a JSON object")]
    MalformedCollection { kind: &'static str },
    #[error("malformed {kind} {key:?}: expected a JSON object")]
    MalformedItem { kind: &'static str, key: String },
}

/// Deserialised flag/segment collections for one environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdkData {
    pub flags: HashMap<String, Value>,
    pub segments: HashMap<String, Value>,
}

impl SdkData {
    /// Parse `{flags: {...}, segments: {...}}`. Unknown collection kinds are
    /// ignored for forward compatibility.
    pub fn from_value(value: Value) -> Result<Self, SdkDataError> {
        let Value::Object(map) = value else {
            return Err(SdkDataError::NotAnObject);
        };
        let mut data = SdkData::default();
        for (kind, items) in map {
            let (kind_name, dest) = match kind.as_str() {
                "flags" => ("flag", &mut data.flags),
                "segments" => ("segment", &mut data.segments),
                _ => continue,
            };
            let Value::Object(items) = items else {
                return Err(SdkDataError::MalformedCollection { kind: kind_name });
            };
            for (key, item) in items {
                if !item.is_object() {
                    return Err(SdkDataError::MalformedItem { kind: kind_name, key });
                }
                dest.insert(key, item);
            }
        }
        Ok(data)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.segments.is_empty()
    }
}

#[cfg(test)]
#[path = "sdk_data_tests.rs"]
mod tests;
