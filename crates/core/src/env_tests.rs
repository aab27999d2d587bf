// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn wire_env() -> &'static str {
    r#"{
        "envID": "5f0cd466a0",
        "envKey": "production",
        "envName": "Production",
        "projKey": "demo",
        "projName": "Demo",
        "mobKey": "mob-11aa22bb",
        "sdkKey": {
            "value": "sdk-99ff88ee",
            "expiring": {"value": "sdk-00aa11bb", "timestamp": 1500000}
        },
        "defaultTtl": 60,
        "secureMode": true,
        "version": 12
    }"#
}

#[test]
fn environment_rep_from_wire_json() {
    let rep: EnvironmentRep = serde_json::from_str(wire_env()).unwrap();
    assert_eq!(rep.env_id.as_str(), "5f0cd466a0");
    assert_eq!(rep.env_key, "production");
    assert_eq!(rep.proj_name, "Demo");
    assert_eq!(rep.mob_key.as_ref().unwrap().as_str(), "mob-11aa22bb");
    assert_eq!(rep.sdk_key.value.as_str(), "sdk-99ff88ee");
    let expiring = rep.sdk_key.expiring.as_ref().unwrap();
    assert_eq!(expiring.value.as_str(), "sdk-00aa11bb");
    assert_eq!(expiring.timestamp, 1_500_000);
    assert_eq!(rep.default_ttl, 60);
    assert!(rep.secure_mode);
    assert_eq!(rep.version, 12);
}

#[test]
fn optional_fields_default() {
    let rep: EnvironmentRep = serde_json::from_str(
        r#"{
            "envID": "e1",
            "envKey": "k",
            "envName": "n",
            "projKey": "p",
            "projName": "pn",
            "sdkKey": {"value": "sdk-x"},
            "version": 1
        }"#,
    )
    .unwrap();
    assert!(rep.mob_key.is_none());
    assert!(rep.sdk_key.expiring.is_none());
    assert_eq!(rep.default_ttl, 0);
    assert!(!rep.secure_mode);
}

#[test]
fn params_carry_the_handler_subset() {
    let rep: EnvironmentRep = serde_json::from_str(wire_env()).unwrap();
    let params = EnvironmentParams::from(&rep);
    assert_eq!(params.env_id, rep.env_id);
    assert_eq!(params.sdk_key, rep.sdk_key.value);
    assert_eq!(params.expiring_sdk_key.as_ref().unwrap().as_str(), "sdk-00aa11bb");
    assert_eq!(params.default_ttl, Duration::from_secs(60));
    assert!(params.secure_mode);
    assert!(params.filter_key.is_none());
    assert!(params.sdk_data.is_none());
}

#[test]
fn empty_expiring_value_maps_to_none() {
    let mut rep: EnvironmentRep = serde_json::from_str(wire_env()).unwrap();
    rep.sdk_key.expiring = Some(ExpiringKeyRep { value: SdkKey::new(""), timestamp: 99 });
    let params = EnvironmentParams::from(&rep);
    assert!(params.expiring_sdk_key.is_none());
}

#[test]
fn zero_timestamp_expiry_is_kept_in_params() {
    // no expiry is scheduled for it, but the key itself is still honoured
    let mut rep: EnvironmentRep = serde_json::from_str(wire_env()).unwrap();
    rep.sdk_key.expiring = Some(ExpiringKeyRep { value: SdkKey::new("sdk-old"), timestamp: 0 });
    assert!(!rep.sdk_key.expiring.as_ref().unwrap().is_defined());
    let params = EnvironmentParams::from(&rep);
    assert_eq!(params.expiring_sdk_key.as_ref().unwrap().as_str(), "sdk-old");
}

#[test]
fn filter_rep_from_wire_json() {
    let rep: FilterRep = serde_json::from_str(
        r#"{"filterKey": "mobile-only", "projKey": "demo", "version": 3}"#,
    )
    .unwrap();
    assert_eq!(rep.filter_key.as_str(), "mobile-only");
    let params = FilterParams::from(&rep);
    assert_eq!(params.key, rep.filter_key);
    assert_eq!(params.proj_key, "demo");
}

#[test]
fn rep_serde_round_trip() {
    let rep: EnvironmentRep = serde_json::from_str(wire_env()).unwrap();
    let json = serde_json::to_string(&rep).unwrap();
    let back: EnvironmentRep = serde_json::from_str(&json).unwrap();
    assert_eq!(back, rep);
    // wire names survive the round trip
    assert!(json.contains(r#""envID":"#));
    assert!(json.contains(r#""mobKey":"#));
    assert!(json.contains(r#""defaultTtl":"#));
}
