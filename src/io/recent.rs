use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::io::config_io::config_dir;
use crate::io::store::atomic_write;

/// Identity of a file's content at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Option<Fingerprint> {
        let meta = fs::metadata(path).ok()?;
        Some(Fingerprint {
            modified: DateTime::<Utc>::from(meta.modified().ok()?),
            size: meta.len(),
        })
    }
}

/// One opened file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFile {
    pub path: PathBuf,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    /// Task index selected when the file was last closed
    #[serde(default)]
    pub cursor: Option<usize>,
    #[serde(default)]
    pub fingerprint: Option<Fingerprint>,
}

impl RecentFile {
    /// Recency decays by half per day; repeat opens count half as much as
    /// the first
    pub fn score(&self, now: DateTime<Utc>) -> f64 {
        let hours = (now - self.last_accessed).num_seconds().max(0) as f64 / 3600.0;
        let recency = 1.0 / (1.0 + hours / 24.0);
        let count = f64::from(self.access_count.max(1));
        let frequency = 1.0 + (count - 1.0) * 0.5;
        recency * frequency
    }
}

/// The recent-file registry persisted as `recent.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentFiles {
    #[serde(default)]
    pub files: Vec<RecentFile>,
}

pub fn recent_path() -> PathBuf {
    config_dir().join("recent.json")
}

impl RecentFiles {
    /// Unreadable or corrupt registries start empty
    pub fn load(path: &Path) -> RecentFiles {
        let Ok(content) = fs::read_to_string(path) else {
            return RecentFiles::default();
        };
        match serde_json::from_str(&content) {
            Ok(recent) => recent,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt recent-file registry");
                RecentFiles::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        atomic_write(path, content.as_bytes())
    }

    /// Record an open (or close, with the cursor to restore next time).
    /// Missing files are pruned, the list is re-ranked and capped at
    /// `max_entries`.
    pub fn record(&mut self, file: &Path, cursor: Option<usize>, now: DateTime<Utc>, max_entries: usize) {
        let path = absolute(file);
        let fingerprint = Fingerprint::of(&path);
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.access_count = entry.access_count.saturating_add(1);
                entry.cursor = cursor;
                entry.fingerprint = fingerprint;
            }
            None => self.files.push(RecentFile {
                path,
                last_accessed: now,
                access_count: 1,
                cursor,
                fingerprint,
            }),
        }
        self.prune_missing();
        self.sort_by_score(now);
        self.files.truncate(max_entries.max(1));
    }

    /// Update the stored cursor without counting another access
    pub fn remember_cursor(&mut self, file: &Path, cursor: Option<usize>) {
        let path = absolute(file);
        if let Some(entry) = self.files.iter_mut().find(|f| f.path == path) {
            entry.cursor = cursor;
            entry.fingerprint = Fingerprint::of(&path);
        }
    }

    pub fn prune_missing(&mut self) {
        let before = self.files.len();
        self.files.retain(|f| f.path.exists());
        if self.files.len() != before {
            debug!(pruned = before - self.files.len(), "pruned missing recent files");
        }
    }

    pub fn sort_by_score(&mut self, now: DateTime<Utc>) {
        self.files
            .sort_by(|a, b| b.score(now).total_cmp(&a.score(now)));
    }

    /// Saved cursor for `file`, only if the file is unchanged since it was
    /// recorded
    pub fn cursor_for(&self, file: &Path) -> Option<usize> {
        let path = absolute(file);
        let entry = self.files.iter().find(|f| f.path == path)?;
        let stored = entry.fingerprint?;
        if Fingerprint::of(&path)? != stored {
            return None;
        }
        entry.cursor
    }

    /// 1-based lookup into the ranked list
    pub fn nth(&self, n: usize) -> Option<&RecentFile> {
        n.checked_sub(1).and_then(|i| self.files.get(i))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(path: &Path, hours_ago: i64, count: u32) -> RecentFile {
        RecentFile {
            path: path.to_path_buf(),
            last_accessed: now() - Duration::hours(hours_ago),
            access_count: count,
            cursor: None,
            fingerprint: None,
        }
    }

    #[test]
    fn record_counts_accesses_and_persists() {
        let dir = TempDir::new().unwrap();
        let todo = dir.path().join("todo.md");
        fs::write(&todo, "- [ ] a\n").unwrap();
        let registry = dir.path().join("cfg").join("recent.json");

        let mut recent = RecentFiles::load(&registry);
        recent.record(&todo, Some(0), now(), 20);
        recent.record(&todo, Some(3), now(), 20);
        recent.save(&registry).unwrap();

        let loaded = RecentFiles::load(&registry);
        assert_eq!(loaded.files.len(), 1);
        assert_eq!(loaded.files[0].access_count, 2);
        assert_eq!(loaded.cursor_for(&todo), Some(3));
    }

    #[test]
    fn cursor_is_dropped_when_file_changes() {
        let dir = TempDir::new().unwrap();
        let todo = dir.path().join("todo.md");
        fs::write(&todo, "- [ ] a\n").unwrap();
        let mut recent = RecentFiles::default();
        recent.record(&todo, Some(1), now(), 20);
        fs::write(&todo, "- [ ] a\n- [ ] b\n").unwrap();
        assert_eq!(recent.cursor_for(&todo), None);
    }

    #[test]
    fn frequent_files_outrank_a_single_newer_open() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        let mut recent = RecentFiles {
            files: vec![entry(&a, 1, 1), entry(&b, 2, 10)],
        };
        recent.sort_by_score(now());
        assert_eq!(recent.files[0].path, b);
    }

    #[test]
    fn recency_dominates_over_a_week() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.md");
        let new = dir.path().join("new.md");
        let mut recent = RecentFiles {
            files: vec![entry(&old, 24 * 30, 3), entry(&new, 0, 1)],
        };
        recent.sort_by_score(now());
        assert_eq!(recent.files[0].path, new);
    }

    #[test]
    fn record_caps_and_prunes() {
        let dir = TempDir::new().unwrap();
        let mut recent = RecentFiles {
            files: vec![entry(&dir.path().join("gone.md"), 0, 5)],
        };
        for name in ["a.md", "b.md", "c.md"] {
            let p = dir.path().join(name);
            fs::write(&p, "").unwrap();
            recent.record(&p, None, now(), 2);
        }
        assert_eq!(recent.files.len(), 2);
        assert!(recent.files.iter().all(|f| f.path.exists()));
    }

    #[test]
    fn nth_is_one_based() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let recent = RecentFiles {
            files: vec![entry(&a, 0, 1)],
        };
        assert_eq!(recent.nth(1).map(|f| f.path.clone()), Some(a));
        assert!(recent.nth(0).is_none());
        assert!(recent.nth(2).is_none());
    }

    #[test]
    fn corrupt_registry_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recent.json");
        fs::write(&path, "{not json").unwrap();
        assert!(RecentFiles::load(&path).files.is_empty());
    }
}
