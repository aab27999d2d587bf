// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn env_json(env_id: &str, version: u64) -> String {
    format!(
        r#"{{"envID": "{env_id}", "envKey": "k", "envName": "n", "projKey": "p",
            "projName": "pn", "sdkKey": {{"value": "sdk-12345678"}}, "version": {version}}}"#
    )
}

#[test]
fn decodes_a_root_put() {
    let data = format!(
        r#"{{"path": "/", "data": {{
            "environments": {{"e1": {}}},
            "filters": {{"f1": {{"filterKey": "f1", "projKey": "p", "version": 1}}}}
        }}}}"#,
        env_json("e1", 3)
    );
    match decode_event(EVENT_PUT, &data).unwrap() {
        Some(ProtocolEvent::Put { environments, filters }) => {
            assert_eq!(environments.len(), 1);
            assert_eq!(environments["e1"].version, 3);
            assert_eq!(filters["f1"].filter_key.as_str(), "f1");
        }
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn put_without_filters_decodes() {
    let data = format!(r#"{{"path": "/", "data": {{"environments": {{"e1": {}}}}}}}"#, env_json("e1", 1));
    match decode_event(EVENT_PUT, &data).unwrap() {
        Some(ProtocolEvent::Put { environments, filters }) => {
            assert_eq!(environments.len(), 1);
            assert!(filters.is_empty());
        }
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn non_root_put_is_ignored() {
    let data = r#"{"path": "/elsewhere", "data": {"environments": {}}}"#;
    assert_eq!(decode_event(EVENT_PUT, data).unwrap(), None);
}

#[test]
fn decodes_an_environment_patch() {
    let data = format!(r#"{{"path": "environments/e1", "data": {}}}"#, env_json("e1", 5));
    match decode_event(EVENT_PATCH, &data).unwrap() {
        Some(ProtocolEvent::PatchEnvironment(rep)) => {
            assert_eq!(rep.env_id.as_str(), "e1");
            assert_eq!(rep.version, 5);
        }
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn patch_with_mismatched_env_id_is_dropped() {
    let data = format!(r#"{{"path": "environments/e1", "data": {}}}"#, env_json("e2", 5));
    assert_eq!(decode_event(EVENT_PATCH, &data).unwrap(), None);
}

#[test]
fn decodes_a_filter_patch() {
    let data = r#"{"path": "filters/f9",
        "data": {"filterKey": "f9", "projKey": "p", "version": 2}}"#;
    match decode_event(EVENT_PATCH, data).unwrap() {
        Some(ProtocolEvent::PatchFilter(rep)) => assert_eq!(rep.filter_key.as_str(), "f9"),
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn patch_for_unknown_path_is_ignored() {
    let data = r#"{"path": "widgets/w1", "data": {}}"#;
    assert_eq!(decode_event(EVENT_PATCH, data).unwrap(), None);
}

#[test]
fn decodes_deletes_by_path_prefix() {
    let env = decode_event(EVENT_DELETE, r#"{"path": "environments/e1", "version": 9}"#).unwrap();
    assert_eq!(
        env,
        Some(ProtocolEvent::DeleteEnvironment { env_id: EnvironmentId::new("e1"), version: 9 })
    );
    let filter = decode_event(EVENT_DELETE, r#"{"path": "filters/f1", "version": 4}"#).unwrap();
    assert_eq!(
        filter,
        Some(ProtocolEvent::DeleteFilter { filter_id: FilterId::new("f1"), version: 4 })
    );
    assert_eq!(decode_event(EVENT_DELETE, r#"{"path": "widgets/w1", "version": 1}"#).unwrap(), None);
}

#[test]
fn malformed_json_is_an_error() {
    assert!(decode_event(EVENT_PUT, "{not json").is_err());
    assert!(decode_event(EVENT_PATCH, r#"{"path": "environments/e1", "data": {"envID": 7}}"#).is_err());
    assert!(decode_event(EVENT_DELETE, r#"{"path": "environments/e1"}"#).is_err());
}

#[test]
fn unknown_event_names_are_ignored() {
    assert_eq!(decode_event("upsert", "{}").unwrap(), None);
}
