use crate::config::stack::Service;
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use time::{format_description::FormatItem, macros::format_description, PrimitiveDateTime};

pub const RECORD_PREFIX: &str = "backup_";
const COMPLETE_MARKER: &str = ".complete";

static TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// One timestamped backup directory. The name embeds the creation time in a
/// sortable form, so lexicographic order over record names is creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    path: PathBuf,
}

impl Record {
    /// Creates a fresh record directory named after the given wall-clock time.
    pub fn create(root: &Path, timestamp: PrimitiveDateTime) -> eyre::Result<Record> {
        let name = format!("{}{}", RECORD_PREFIX, timestamp.format(TIMESTAMP_FORMAT)?);
        let path = root.join(name);
        std::fs::create_dir_all(&path)?;
        Ok(Record { path })
    }

    /// Opens an existing record directory.
    pub fn open(path: impl Into<PathBuf>) -> eyre::Result<Record> {
        let path = path.into();
        if !path.is_dir() {
            eyre::bail!("backup record {} not found", path.display());
        }
        Ok(Record { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// The creation time embedded in the directory name.
    pub fn timestamp(&self) -> Option<PrimitiveDateTime> {
        let stamp = self.name()?.strip_prefix(RECORD_PREFIX)?;
        PrimitiveDateTime::parse(stamp, TIMESTAMP_FORMAT).ok()
    }

    pub fn mysql_dump(&self) -> PathBuf {
        self.path.join("mysql_dump.sql")
    }

    pub fn www_archive(&self) -> PathBuf {
        self.path.join("apache_www.tar.gz")
    }

    pub fn certs_archive(&self) -> PathBuf {
        self.path.join("ssl_certs.tar.gz")
    }

    pub fn snapshot(&self, service: Service) -> PathBuf {
        self.path.join(service.snapshot_file())
    }

    /// Whether the completion marker is present. The marker is written after
    /// the last backup step, so an interrupted run leaves a record that
    /// "latest" selection skips.
    pub fn is_complete(&self) -> bool {
        self.path.join(COMPLETE_MARKER).is_file()
    }

    pub fn mark_complete(&self) -> io::Result<()> {
        std::fs::write(self.path.join(COMPLETE_MARKER), b"")
    }
}

/// All records under the root, sorted by name.
pub fn list(root: &Path) -> io::Result<Vec<Record>> {
    let mut records = Vec::new();
    for dir_entry in std::fs::read_dir(root)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_dir() {
            continue;
        }
        let path = dir_entry.path();
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(RECORD_PREFIX) => records.push(Record { path }),
            _ => {}
        }
    }
    records.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(records)
}

/// The most recent complete record, by lexicographically greatest name.
pub fn latest(root: &Path) -> io::Result<Option<Record>> {
    for record in list(root)?.into_iter().rev() {
        if record.is_complete() {
            return Ok(Some(record));
        }
        tracing::warn!(record = ?record.name(), "skipping incomplete backup record");
    }
    Ok(None)
}

/// Deletes records whose embedded timestamp is older than the retention
/// window. Directories whose names don't parse are left alone. Returns the
/// deleted records.
pub fn prune(root: &Path, now: PrimitiveDateTime, retention: Duration) -> io::Result<Vec<Record>> {
    let retention = match time::Duration::try_from(retention) {
        Ok(retention) => retention,
        Err(_) => return Ok(Vec::new()),
    };
    let mut pruned = Vec::new();
    for record in list(root)? {
        let timestamp = match record.timestamp() {
            Some(timestamp) => timestamp,
            None => continue,
        };
        if now - timestamp > retention {
            match std::fs::remove_dir_all(record.path()) {
                Ok(()) => pruned.push(record),
                Err(error) => {
                    tracing::warn!(%error, record = ?record.name(), "failed to delete expired backup record");
                }
            }
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 3600);

    fn make_record(root: &Path, name: &str, complete: bool) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if complete {
            std::fs::write(dir.join(COMPLETE_MARKER), b"").unwrap();
        }
    }

    #[test]
    fn should_name_records_after_the_timestamp() {
        let root = tempfile::tempdir().unwrap();

        let record = Record::create(root.path(), datetime!(2025-01-01 02:00:00)).unwrap();

        assert_eq!(record.name(), Some("backup_20250101_020000"));
        assert_eq!(record.timestamp(), Some(datetime!(2025-01-01 02:00:00)));
    }

    #[test]
    fn should_list_records_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250301_020000", true);
        make_record(root.path(), "backup_20250101_020000", true);
        make_record(root.path(), "not-a-record", true);

        let records = list(root.path()).unwrap();

        let names: Vec<_> = records.iter().map(|r| r.name().unwrap()).collect();
        assert_eq!(
            names,
            vec!["backup_20250101_020000", "backup_20250301_020000"]
        );
    }

    #[test]
    fn should_select_the_latest_record() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250101_020000", true);
        make_record(root.path(), "backup_20250301_020000", true);

        let latest = latest(root.path()).unwrap().unwrap();

        assert_eq!(latest.name(), Some("backup_20250301_020000"));
    }

    #[test]
    fn should_skip_incomplete_records_when_selecting_latest() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250101_020000", true);
        make_record(root.path(), "backup_20250301_020000", false);

        let latest = latest(root.path()).unwrap().unwrap();

        assert_eq!(latest.name(), Some("backup_20250101_020000"));
    }

    #[test]
    fn should_find_no_latest_without_complete_records() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250101_020000", false);

        assert_eq!(latest(root.path()).unwrap(), None);
    }

    #[test]
    fn should_prune_records_older_than_the_retention_window() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250101_020000", true);

        let pruned = prune(root.path(), datetime!(2025-02-10 02:00:00), THIRTY_DAYS).unwrap();

        assert_eq!(pruned.len(), 1);
        assert!(!root.path().join("backup_20250101_020000").exists());
    }

    #[test]
    fn should_retain_records_younger_than_the_retention_window() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_20250101_020000", true);

        let pruned = prune(root.path(), datetime!(2025-01-21 02:00:00), THIRTY_DAYS).unwrap();

        assert!(pruned.is_empty());
        assert!(root.path().join("backup_20250101_020000").exists());
    }

    #[test]
    fn should_leave_unparseable_directory_names_alone() {
        let root = tempfile::tempdir().unwrap();
        make_record(root.path(), "backup_keep-forever", true);

        let pruned = prune(root.path(), datetime!(2030-01-01 00:00:00), THIRTY_DAYS).unwrap();

        assert!(pruned.is_empty());
        assert!(root.path().join("backup_keep-forever").exists());
    }
}
