use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Directory holding one subdirectory per backup record.
    pub root: PathBuf,
    /// Records older than this are deleted on the next backup run.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    #[serde(alias = "log_file")]
    pub log_file: PathBuf,
    /// Daily time of the scheduled backup job.
    #[serde(alias = "backup_at")]
    pub backup_at: JobTime,
    /// Daily time of the scheduled certificate renewal job.
    #[serde(alias = "renew_at")]
    pub renew_at: JobTime,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root: "/opt/podman-backups".into(),
            retention: Duration::from_secs(30 * 24 * 3600),
            log_file: "/var/log/stackup-backup.log".into(),
            backup_at: JobTime { hour: 2, minute: 0 },
            renew_at: JobTime { hour: 3, minute: 0 },
        }
    }
}

/// A wall-clock time of day, written as `HH:MM` in the configuration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct JobTime {
    pub hour: u8,
    pub minute: u8,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct JobTimeParseError(String);

impl std::str::FromStr for JobTime {
    type Err = JobTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| JobTimeParseError(s.to_owned()))?;
        let hour: u8 = hour.parse().map_err(|_| JobTimeParseError(s.to_owned()))?;
        let minute: u8 = minute.parse().map_err(|_| JobTimeParseError(s.to_owned()))?;
        if hour > 23 || minute > 59 {
            return Err(JobTimeParseError(s.to_owned()));
        }
        Ok(JobTime { hour, minute })
    }
}

impl std::fmt::Display for JobTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for JobTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_time_of_day() {
        assert_eq!("02:00".parse::<JobTime>().unwrap(), JobTime { hour: 2, minute: 0 });
        assert_eq!(
            "23:59".parse::<JobTime>().unwrap(),
            JobTime {
                hour: 23,
                minute: 59
            }
        );
    }

    #[test]
    fn should_reject_invalid_times_of_day() {
        assert!("24:00".parse::<JobTime>().is_err());
        assert!("12:60".parse::<JobTime>().is_err());
        assert!("noon".parse::<JobTime>().is_err());
        assert!("12".parse::<JobTime>().is_err());
    }

    #[test]
    fn should_format_time_of_day_zero_padded() {
        let time = JobTime { hour: 2, minute: 5 };
        assert_eq!(time.to_string(), "02:05");
    }
}
