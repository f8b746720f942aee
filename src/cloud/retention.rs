//! Retention policy for cloud snapshots

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::record::BackupRecord;

/// Two independent bounds: how many snapshots, and how old
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_count: usize,
    pub max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(5, Duration::days(30))
    }
}

impl RetentionPolicy {
    pub fn new(max_count: usize, max_age: Duration) -> Self {
        Self { max_count, max_age }
    }

    /// Records that fall outside the policy at `now`, newest first
    ///
    /// The union of everything beyond the newest `max_count` and everything
    /// older than `max_age`, each record at most once.
    pub fn expired(&self, records: &[BackupRecord], now: DateTime<Utc>) -> Vec<BackupRecord> {
        let mut sorted: Vec<&BackupRecord> = records.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let cutoff = now - self.max_age;
        let mut seen = HashSet::new();

        sorted
            .into_iter()
            .enumerate()
            .filter(|(index, record)| *index >= self.max_count || record.created_at < cutoff)
            .filter(|(_, record)| seen.insert(record.path.clone()))
            .map(|(_, record)| record.clone())
            .collect()
    }
}
