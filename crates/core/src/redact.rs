// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential redaction for logged event payloads.
//!
//! Auto-config payloads carry live SDK and mobile keys. Anything logged at
//! debug level goes through [`obscure_event_data`] first.

use regex::{Captures, Regex};
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static KEY_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(value|mobKey)":\s*"([^"]*)""#).expect("constant regex pattern is valid")
});

/// Rewrite SDK/mobile key fields in a raw JSON payload so at most the last
/// four characters survive, e.g. `"value":"...XXXX"`.
pub fn obscure_event_data(data: &str) -> String {
    KEY_FIELDS
        .replace_all(data, |caps: &Captures<'_>| {
            format!(r#""{}":"{}""#, &caps[1], obscure_key(&caps[2]))
        })
        .into_owned()
}

/// Keep the last four characters of a credential when it is long enough for
/// that to reveal nothing useful; shorter values are dropped entirely.
fn obscure_key(key: &str) -> String {
    let chars = key.chars().count();
    if chars >= 8 {
        let tail: String = key.chars().skip(chars - 4).collect();
        format!("...{tail}")
    } else {
        "...".to_string()
    }
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
