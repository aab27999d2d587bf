// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_fixtures::{data_json, metadata_json, metadata_json_with, ArchiveBuilder};
use relay_core::SdkDataError;

fn archive_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("flags.tar")
}

#[test]
fn opens_a_plain_tar_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env("env-b", 2, "d1", &["flag-x"])
        .env("env-a", 1, "d1", &["flag-y", "flag-z"])
        .write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    let ids: Vec<&str> = reader.environment_ids().iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["env-a", "env-b"]);

    let metadata = reader.environment_metadata(&EnvironmentId::new("env-a")).unwrap();
    assert_eq!(metadata.version, 1);
    assert_eq!(metadata.data_id, "d1");
    assert_eq!(metadata.params.env_key, "env-a-key");
    assert_eq!(metadata.params.sdk_key.as_str(), "sdk-env-a-12345678");
    assert!(metadata.params.filter_key.is_none());

    let data = reader.environment_sdk_data(&EnvironmentId::new("env-a")).unwrap();
    assert_eq!(data.flags.len(), 2);
    assert!(data.flags.contains_key("flag-y"));
    assert!(data.segments.is_empty());
}

#[test]
fn opens_a_gzipped_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new().gzip().env("env-a", 3, "d9", &["flag-x"]).write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.environment_ids().len(), 1);
    assert_eq!(reader.environment_metadata(&EnvironmentId::new("env-a")).unwrap().version, 3);
}

#[test]
fn metadata_carries_the_filter_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env_raw("env-a", metadata_json_with("env-a", 1, "d1", Some("mobile")), data_json(&[]))
        .write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    let metadata = reader.environment_metadata(&EnvironmentId::new("env-a")).unwrap();
    assert_eq!(metadata.params.filter_key.as_ref().unwrap().as_str(), "mobile");
}

#[test]
fn checksum_mismatch_rejects_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env("env-a", 1, "d1", &[])
        .checksum("00000000000000000000000000000000")
        .write(&path);

    match ArchiveReader::open(&path) {
        Err(ArchiveError::ChecksumMismatch { expected, .. }) => {
            assert_eq!(expected, "00000000000000000000000000000000");
        }
        other => panic!("unexpected open result: {:?}", other.err()),
    }
}

#[test]
fn missing_checksum_rejects_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new().env("env-a", 1, "d1", &[]).omit_checksum().write(&path);

    assert!(matches!(ArchiveReader::open(&path), Err(ArchiveError::ChecksumMissing)));
}

#[test]
fn garbage_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    std::fs::write(&path, b"this is not a tar archive at all").unwrap();
    assert!(ArchiveReader::open(&path).is_err());
}

#[test]
fn missing_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ArchiveReader::open(&dir.path().join("nope.tar")),
        Err(ArchiveError::Io(_))
    ));
}

#[test]
fn nested_members_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env("env-a", 1, "d1", &[])
        .extra("nested/env-z.json", b"{}")
        .write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    let ids: Vec<&str> = reader.environment_ids().iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["env-a"]);
}

#[test]
fn oversized_member_is_rejected() {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        let payload = vec![0u8; 64];
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "big.json", payload.as_slice()).unwrap();
    }
    let dest = tempfile::tempdir().unwrap();
    let result = unpack(tar::Archive::new(tar_bytes.as_slice()), dest.path(), 16);
    match result {
        Err(ArchiveError::MemberTooLarge { size, limit, .. }) => {
            assert_eq!(size, 64);
            assert_eq!(limit, 16);
        }
        other => panic!("unexpected unpack result: {:?}", other.err()),
    }
}

#[test]
fn malformed_metadata_is_a_per_environment_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env("env-a", 1, "d1", &["flag-x"])
        .env_raw("env-b", b"{broken".to_vec(), data_json(&[]))
        .write(&path);

    // the checksum covers raw bytes, so the archive itself opens fine
    let reader = ArchiveReader::open(&path).unwrap();
    assert!(reader.environment_metadata(&EnvironmentId::new("env-a")).is_ok());
    match reader.environment_metadata(&EnvironmentId::new("env-b")) {
        Err(ArchiveError::Metadata { env_id, .. }) => assert_eq!(env_id, "env-b"),
        other => panic!("unexpected metadata result: {:?}", other.err()),
    }
}

#[test]
fn malformed_flag_names_itself() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new()
        .env_raw(
            "env-a",
            metadata_json("env-a", 1, "d1"),
            br#"{"flags": {"broken-flag": 42}}"#.to_vec(),
        )
        .write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    match reader.environment_sdk_data(&EnvironmentId::new("env-a")) {
        Err(ArchiveError::SdkData {
            env_id,
            source: SdkDataError::MalformedItem { key, .. },
        }) => {
            assert_eq!(env_id, "env-a");
            assert_eq!(key, "broken-flag");
        }
        other => panic!("unexpected sdk data result: {:?}", other.err()),
    }
}

#[test]
fn close_removes_the_extraction_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = archive_path(&dir);
    ArchiveBuilder::new().env("env-a", 1, "d1", &[]).write(&path);

    let reader = ArchiveReader::open(&path).unwrap();
    let extracted = reader.dir.path().to_path_buf();
    assert!(extracted.exists());
    reader.close().unwrap();
    assert!(!extracted.exists());
}
