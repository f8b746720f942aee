//! Snapshot file naming
//!
//! Files are named `{kind}_{yyyy-MM-dd_HH-mm-ss}.json`. A numeric suffix
//! (`_2`, `_3`, ...) is appended when two snapshots of the same kind land in
//! the same second, so order by [`compare_file_names`], not by plain name:
//! `_10` sorts before `_2` as text.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// What a snapshot file was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Export,
    Backup,
    SafetyBackupBeforeImport,
}

impl SnapshotKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Backup => "backup",
            Self::SafetyBackupBeforeImport => "safety_backup_before_import",
        }
    }

    const ALL: [SnapshotKind; 3] = [
        SnapshotKind::Export,
        SnapshotKind::Backup,
        SnapshotKind::SafetyBackupBeforeImport,
    ];
}

/// Base file name for a snapshot of `kind` taken at `timestamp`
pub fn file_name(kind: SnapshotKind, timestamp: DateTime<Utc>) -> String {
    format!("{}_{}.json", kind.prefix(), timestamp.format(TIMESTAMP_FORMAT))
}

/// First path in `dir` for this kind and timestamp that is not taken yet
pub fn unique_path(dir: &Path, kind: SnapshotKind, timestamp: DateTime<Utc>) -> PathBuf {
    let base = format!("{}_{}", kind.prefix(), timestamp.format(TIMESTAMP_FORMAT));
    let mut candidate = dir.join(format!("{}.json", base));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.json", base, n));
        n += 1;
    }
    candidate
}

/// What a snapshot file name encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotName {
    pub kind: SnapshotKind,
    pub timestamp: DateTime<Utc>,
    /// 1 for the unsuffixed file, then the `_n` suffix
    pub sequence: u32,
}

impl SnapshotName {
    /// Creation order
    pub fn order_key(&self) -> (DateTime<Utc>, u32) {
        (self.timestamp, self.sequence)
    }
}

/// Recover the kind, timestamp and suffix encoded in a snapshot file name
pub fn parse_file_name(name: &str) -> Option<SnapshotName> {
    let stem = name.strip_suffix(".json")?;
    SnapshotKind::ALL.iter().find_map(|kind| {
        let rest = stem.strip_prefix(kind.prefix())?.strip_prefix('_')?;
        let stamp = rest.get(..TIMESTAMP_LEN)?;
        let suffix = &rest[TIMESTAMP_LEN..];
        let sequence = if suffix.is_empty() {
            1
        } else {
            suffix.strip_prefix('_')?.parse::<u32>().ok()?
        };
        let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(SnapshotName {
            kind: *kind,
            timestamp: naive.and_utc(),
            sequence,
        })
    })
}

/// Order file names oldest first; names that do not parse come first
pub fn compare_file_names(a: &str, b: &str) -> Ordering {
    match (parse_file_name(a), parse_file_name(b)) {
        (Some(x), Some(y)) => x.order_key().cmp(&y.order_key()).then_with(|| a.cmp(b)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
