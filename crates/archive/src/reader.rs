// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only decoder for one offline data-file snapshot.
//!
//! An archive is a tar stream, optionally gzip-compressed, of top-level
//! files: `<envId>.json` (environment metadata), `<envId>-data.json`
//! (flag/segment payload), and `checksum.md5`. `open` materialises it into
//! a private temp directory and verifies the checksum before exposing
//! anything.

use crate::error::ArchiveError;
use relay_core::{EnvironmentId, EnvironmentParams, EnvironmentRep, FilterId, SdkData};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tempfile::TempDir;

/// Uncompressed size cap for any single archive member. A member above this
/// is treated as malformed (or adversarial) and rejects the whole archive.
pub const MAX_MEMBER_SIZE: u64 = 200 * 1024 * 1024;

const CHECKSUM_FILE: &str = "checksum.md5";
const DATA_SUFFIX: &str = "-data.json";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Environment metadata file: the wire rep plus snapshot bookkeeping.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentMetadataRep {
    #[serde(flatten)]
    env: EnvironmentRep,
    data_id: String,
    #[serde(default)]
    filter_key: Option<FilterId>,
}

/// Decoded `<envId>.json` contents.
#[derive(Debug, Clone)]
pub struct EnvironmentMetadata {
    pub params: EnvironmentParams,
    pub version: u64,
    /// Identifies the flag-data snapshot; when unchanged between reloads,
    /// the flag data need not be re-read.
    pub data_id: String,
}

/// One extracted, checksum-verified archive snapshot.
pub struct ArchiveReader {
    dir: TempDir,
    env_ids: Vec<EnvironmentId>,
}

impl ArchiveReader {
    /// Extract and verify the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let dir = TempDir::new()?;
        extract(path, dir.path())?;
        let env_ids = enumerate_environments(dir.path())?;
        verify_checksum(dir.path(), &env_ids)?;
        Ok(Self { dir, env_ids })
    }

    /// Environment ids present in this snapshot, in ascending order.
    pub fn environment_ids(&self) -> &[EnvironmentId] {
        &self.env_ids
    }

    pub fn environment_metadata(
        &self,
        env_id: &EnvironmentId,
    ) -> Result<EnvironmentMetadata, ArchiveError> {
        let raw = fs::read(self.dir.path().join(format!("{env_id}.json")))?;
        let rep: EnvironmentMetadataRep = serde_json::from_slice(&raw)
            .map_err(|e| ArchiveError::Metadata { env_id: env_id.to_string(), source: e })?;
        let mut params = EnvironmentParams::from(&rep.env);
        params.filter_key = rep.filter_key;
        Ok(EnvironmentMetadata { params, version: rep.env.version, data_id: rep.data_id })
    }

    pub fn environment_sdk_data(&self, env_id: &EnvironmentId) -> Result<SdkData, ArchiveError> {
        let raw = fs::read(self.dir.path().join(format!("{env_id}{DATA_SUFFIX}")))?;
        let value: serde_json::Value = serde_json::from_slice(&raw)
            .map_err(|e| ArchiveError::Data { env_id: env_id.to_string(), source: e })?;
        SdkData::from_value(value)
            .map_err(|e| ArchiveError::SdkData { env_id: env_id.to_string(), source: e })
    }

    /// Remove the extraction directory.
    pub fn close(self) -> Result<(), ArchiveError> {
        self.dir.close().map_err(Into::into)
    }
}

/// Unpack the (optionally gzipped) tar stream into `dest`.
fn extract(path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(ArchiveError::NotAFile(path.to_path_buf()));
    }
    let mut reader = BufReader::new(File::open(path)?);
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        unpack(tar::Archive::new(flate2::read::GzDecoder::new(reader)), dest, MAX_MEMBER_SIZE)
    } else {
        unpack(tar::Archive::new(reader), dest, MAX_MEMBER_SIZE)
    }
}

/// Write the archive's top-level regular files into `dest`, enforcing the
/// member size cap. Directories and nested paths are ignored.
fn unpack<R: Read>(
    mut archive: tar::Archive<R>,
    dest: &Path,
    max_member_size: u64,
) -> Result<(), ArchiveError> {
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Some(name) = top_level_name(&entry.path()?) else {
            continue;
        };
        if entry.size() > max_member_size {
            return Err(ArchiveError::MemberTooLarge {
                path: entry.path()?.into_owned(),
                size: entry.size(),
                limit: max_member_size,
            });
        }
        let mut out = File::create(dest.join(&name))?;
        std::io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

/// The member's file name if it sits at the archive root, `None` otherwise.
fn top_level_name(path: &Path) -> Option<String> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(name)), None) => {
            name.to_str().map(str::to_owned)
        }
        _ => None,
    }
}

/// Environment ids by filename pattern: `*.json` that is not a data file.
fn enumerate_environments(dir: &Path) -> Result<Vec<EnvironmentId>, ArchiveError> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(stem) = name.strip_suffix(".json") {
            if !stem.ends_with("-data") {
                ids.push(EnvironmentId::new(stem));
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Recompute the archive digest and compare it with `checksum.md5`.
///
/// The digest covers `<envId>.json` then `<envId>-data.json` for each
/// environment in ascending id order.
fn verify_checksum(dir: &Path, env_ids: &[EnvironmentId]) -> Result<(), ArchiveError> {
    let expected = match fs::read_to_string(dir.join(CHECKSUM_FILE)) {
        Ok(contents) => contents.trim().to_ascii_lowercase(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArchiveError::ChecksumMissing)
        }
        Err(e) => return Err(e.into()),
    };
    let mut contents = Vec::new();
    for env_id in env_ids {
        contents.extend_from_slice(&fs::read(dir.join(format!("{env_id}.json")))?);
        contents.extend_from_slice(&fs::read(dir.join(format!("{env_id}{DATA_SUFFIX}")))?);
    }
    let computed = format!("{:x}", md5::compute(&contents));
    if computed != expected {
        return Err(ArchiveError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
