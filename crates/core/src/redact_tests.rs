// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    sdk_key = { r#"{"sdkKey":{"value":"sdk-1234abcd"}}"#, r#"{"sdkKey":{"value":"...abcd"}}"# },
    mob_key = { r#"{"mobKey":"mob-5678efgh"}"#, r#"{"mobKey":"...efgh"}"# },
    spaced = { r#"{"value": "sdk-1234abcd"}"#, r#"{"value":"...abcd"}"# },
    short_key = { r#"{"value":"tiny"}"#, r#"{"value":"..."}"# },
    empty_key = { r#"{"value":""}"#, r#"{"value":"..."}"# },
)]
fn obscures_key_fields(input: &str, expected: &str) {
    assert_eq!(obscure_event_data(input), expected);
}

#[test]
fn leaves_other_fields_alone() {
    let input = r#"{"envKey":"production","version":7}"#;
    assert_eq!(obscure_event_data(input), input);
}

#[test]
fn obscures_every_occurrence() {
    let input = concat!(
        r#"{"environments":{"a":{"sdkKey":{"value":"sdk-aaaa1111","#,
        r#""expiring":{"value":"sdk-bbbb2222","timestamp":5}},"mobKey":"mob-cccc3333"}}}"#,
    );
    let out = obscure_event_data(input);
    assert!(!out.contains("sdk-aaaa1111"));
    assert!(!out.contains("sdk-bbbb2222"));
    assert!(!out.contains("mob-cccc3333"));
    assert!(out.contains(r#""value":"...1111""#));
    assert!(out.contains(r#""value":"...2222""#));
    assert!(out.contains(r#""mobKey":"...3333""#));
}
