use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::record::EventRecord;

pub const SNAPSHOT_FILE: &str = "merged_matchdays.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub records: usize,
    /// Base64 SHA-256 of the snapshot bytes.
    pub digest: String,
}

/// Canonical JSON bytes for a record stream. Identical input gives identical bytes.
pub fn canonical_bytes(records: &[EventRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(records).context("serialize canonical records")
}

pub fn digest(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Write `merged_matchdays.json` into `dir` via a temp file and rename.
pub fn write_snapshot(dir: &Path, records: &[EventRecord]) -> Result<SnapshotInfo> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(SNAPSHOT_FILE);
    let bytes = canonical_bytes(records)?;
    write_atomic(&path, &bytes)?;
    Ok(SnapshotInfo {
        path,
        records: records.len(),
        digest: digest(&bytes),
    })
}

pub fn read_snapshot(path: &Path) -> Result<Vec<EventRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse snapshot {}", path.display()))
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Outcome, Score, VenueSide};
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("matchday_audience_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn snapshot_round_trips_and_digest_is_stable() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 3).unwrap();
        let mut record = EventRecord::new(date, "Ajax - PSV");
        record.audience = Some(1200);
        record.staff = vec!["Kees".into()];
        record.score = Some(Score::new(2, 1));
        record.venue = Some(VenueSide::Home);
        record.outcome = Some(Outcome::Win);
        let records = vec![record];

        let dir = scratch_dir("snapshot");
        let first = write_snapshot(&dir, &records).unwrap();
        let second = write_snapshot(&dir, &records).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(read_snapshot(&first.path).unwrap(), records);
        assert!(!dir.join("merged_matchdays.json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn digest_changes_with_content() {
        let a = digest(b"[]");
        let b = digest(b"[ ]");
        assert_ne!(a, b);
        assert_eq!(a.len(), 44);
    }
}
