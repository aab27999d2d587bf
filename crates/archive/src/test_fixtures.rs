// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for building archive fixtures in tests.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;

pub(crate) fn metadata_json(id: &str, version: u64, data_id: &str) -> Vec<u8> {
    metadata_json_with(id, version, data_id, None)
}

pub(crate) fn metadata_json_with(
    id: &str,
    version: u64,
    data_id: &str,
    filter_key: Option<&str>,
) -> Vec<u8> {
    let mut value = serde_json::json!({
        "envID": id,
        "envKey": format!("{id}-key"),
        "envName": id.to_uppercase(),
        "projKey": "proj",
        "projName": "Proj",
        "sdkKey": {"value": format!("sdk-{id}-12345678")},
        "defaultTtl": 0,
        "secureMode": false,
        "version": version,
        "dataId": data_id,
    });
    if let Some(filter_key) = filter_key {
        value["filterKey"] = serde_json::json!(filter_key);
    }
    serde_json::to_vec(&value).unwrap()
}

pub(crate) fn data_json(flag_keys: &[&str]) -> Vec<u8> {
    let flags: serde_json::Map<String, serde_json::Value> = flag_keys
        .iter()
        .map(|key| (key.to_string(), serde_json::json!({"key": key, "on": true})))
        .collect();
    serde_json::to_vec(&serde_json::json!({"flags": flags, "segments": {}})).unwrap()
}

/// Builds archives the way the upstream export does: env file pairs plus a
/// checksum over their concatenation in ascending env-id order.
pub(crate) struct ArchiveBuilder {
    gzip: bool,
    envs: Vec<(String, Vec<u8>, Vec<u8>)>,
    extra_files: Vec<(String, Vec<u8>)>,
    omit_checksum: bool,
    checksum_override: Option<String>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            gzip: false,
            envs: Vec::new(),
            extra_files: Vec::new(),
            omit_checksum: false,
            checksum_override: None,
        }
    }

    pub fn gzip(mut self) -> Self {
        self.gzip = true;
        self
    }

    pub fn env(self, id: &str, version: u64, data_id: &str, flag_keys: &[&str]) -> Self {
        let metadata = metadata_json(id, version, data_id);
        let data = data_json(flag_keys);
        self.env_raw(id, metadata, data)
    }

    pub fn env_raw(mut self, id: &str, metadata: Vec<u8>, data: Vec<u8>) -> Self {
        self.envs.push((id.to_string(), metadata, data));
        self
    }

    pub fn extra(mut self, name: &str, bytes: &[u8]) -> Self {
        self.extra_files.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn omit_checksum(mut self) -> Self {
        self.omit_checksum = true;
        self
    }

    pub fn checksum(mut self, checksum: &str) -> Self {
        self.checksum_override = Some(checksum.to_string());
        self
    }

    pub fn write(mut self, path: &Path) {
        self.envs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut digest_input = Vec::new();
        for (_, metadata, data) in &self.envs {
            digest_input.extend_from_slice(metadata);
            digest_input.extend_from_slice(data);
        }
        let checksum = self
            .checksum_override
            .clone()
            .unwrap_or_else(|| format!("{:x}", md5::compute(&digest_input)));

        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let mut append = |name: &str, bytes: &[u8]| {
                let mut header = tar::Header::new_gnu();
                header.set_size(bytes.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, bytes).unwrap();
            };
            for (id, metadata, data) in &self.envs {
                append(&format!("{id}.json"), metadata);
                append(&format!("{id}-data.json"), data);
            }
            if !self.omit_checksum {
                append("checksum.md5", checksum.as_bytes());
            }
            for (name, bytes) in &self.extra_files {
                append(name, bytes);
            }
        }

        let out = if self.gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&tar_bytes).unwrap();
            encoder.finish().unwrap()
        } else {
            tar_bytes
        };

        // replace-by-rename, like a well-behaved producer
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, out).unwrap();
        std::fs::rename(&tmp, path).unwrap();
    }
}
