//! Recurring job installation through the host crontab. The scheduler has no
//! single-entry edit primitive, so every change rewrites the whole table.

use crate::{
    config::backup::JobTime,
    exec::{CommandConfig, Error, Options, Output},
};
use std::{path::PathBuf, process::Stdio};
use tokio::io::AsyncWriteExt;

/// One recurring table entry, rendered as `M H * * * command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub minute: u8,
    pub hour: u8,
    pub command: String,
}

impl Entry {
    pub fn daily(at: JobTime, command: impl Into<String>) -> Self {
        Entry {
            minute: at.minute,
            hour: at.hour,
            command: command.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{} {} * * * {}", self.minute, self.hour, self.command)
    }
}

#[derive(Debug, Clone)]
pub struct Crontab {
    command: CommandConfig,
}

impl Crontab {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Crontab {
            command: CommandConfig::from_path(path),
        }
    }

    /// The current table; a user without a crontab reads as an empty table.
    pub async fn read(&self) -> Result<String, Error> {
        let output = self.command.output(&["-l"]).await?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Ok(String::new())
        }
    }

    async fn write(&self, table: &str) -> Result<(), Error> {
        let mut process = self.command.spawn_with_stdin(
            &["-"],
            &Options {
                stderr: Output::Capture,
                ..Default::default()
            },
            Stdio::piped(),
        )?;
        let mut stdin = process.stdin().take().ok_or(Error::StdinUnavailable)?;
        stdin
            .write_all(table.as_bytes())
            .await
            .map_err(Error::SubprocessIoError)?;
        drop(stdin);
        process.wait_with_output().await?.check()?;
        Ok(())
    }

    /// Idempotently installs the entry. The table is read immediately before
    /// the write and the entry appended only while still absent, so a
    /// concurrent writer's entry is not duplicated. Returns whether the table
    /// changed.
    #[tracing::instrument(level = "debug", skip_all, fields(command = %entry.command))]
    pub async fn ensure_entry(&self, entry: &Entry) -> Result<bool, Error> {
        let current = self.read().await?;
        match merged_table(&current, entry) {
            Some(new_table) => {
                self.write(&new_table).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// The table with the entry appended, or `None` when a line with the entry's
/// command is already present.
fn merged_table(current: &str, entry: &Entry) -> Option<String> {
    if current.lines().any(|line| line.contains(&entry.command)) {
        return None;
    }
    let mut table = current.trim_end().to_owned();
    if !table.is_empty() {
        table.push('\n');
    }
    table.push_str(&entry.render());
    table.push('\n');
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup_entry() -> Entry {
        Entry {
            minute: 0,
            hour: 2,
            command: "/usr/local/bin/stackup backup run".to_owned(),
        }
    }

    #[test]
    fn should_render_daily_entry() {
        assert_eq!(
            backup_entry().render(),
            "0 2 * * * /usr/local/bin/stackup backup run"
        );
    }

    #[test]
    fn should_append_to_an_empty_table() {
        let table = merged_table("", &backup_entry()).unwrap();

        assert_eq!(table, "0 2 * * * /usr/local/bin/stackup backup run\n");
    }

    #[test]
    fn should_preserve_existing_entries() {
        let table = merged_table("30 4 * * * /usr/bin/updatedb\n", &backup_entry()).unwrap();

        assert_eq!(
            table,
            "30 4 * * * /usr/bin/updatedb\n0 2 * * * /usr/local/bin/stackup backup run\n"
        );
    }

    #[test]
    fn should_install_exactly_once() {
        let entry = backup_entry();

        let first = merged_table("", &entry).unwrap();
        let second = merged_table(&first, &entry);

        assert_eq!(second, None);
        assert_eq!(first.matches(&entry.command).count(), 1);
    }

    #[test]
    fn should_match_on_the_command_not_the_schedule() {
        let entry = backup_entry();
        let existing = "15 5 * * * /usr/local/bin/stackup backup run >> /var/log/b.log\n";

        assert_eq!(merged_table(existing, &entry), None);
    }
}
