use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod backup;
pub mod stack;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub binaries: Binaries,
    pub stack: stack::Definition,
    pub backup: backup::Settings,

    /// path of the configuration file, if the configuration was loaded from a file
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("invalid configuration string")]
    InvalidConfigString(#[source] toml::de::Error),
    #[error("invalid configuration file {}", .0.display())]
    InvalidConfigFile(PathBuf, #[source] toml::de::Error),
    #[error("i/o error reading configuration file {}", .0.display())]
    IoError(PathBuf, #[source] std::io::Error),
}

impl Config {
    pub fn parse(s: &str) -> Result<Config, ConfigLoadError> {
        toml::from_str(s).map_err(ConfigLoadError::InvalidConfigString)
    }

    pub async fn parse_file(p: &Path) -> Result<Config, ConfigLoadError> {
        let config_string = tokio::fs::read_to_string(p)
            .await
            .map_err(|e| ConfigLoadError::IoError(p.to_owned(), e))?;
        let mut config: Config = toml::from_str(&config_string)
            .map_err(|e| ConfigLoadError::InvalidConfigFile(p.to_owned(), e))?;
        config.source = Some(p.to_owned());
        Ok(config)
    }
}

/// Paths of the external tools the pipelines shell out to. Bare names resolve
/// through PATH.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Binaries {
    pub podman: PathBuf,
    pub certbot: PathBuf,
    pub crontab: PathBuf,
    pub systemctl: PathBuf,
    #[serde(alias = "apt_get")]
    pub apt_get: PathBuf,
    pub powershell: PathBuf,
    pub vboxmanage: PathBuf,
}

impl Default for Binaries {
    fn default() -> Self {
        Binaries {
            podman: "podman".into(),
            certbot: "certbot".into(),
            crontab: "crontab".into(),
            systemctl: "systemctl".into(),
            apt_get: "apt-get".into(),
            powershell: "powershell".into(),
            vboxmanage: "VBoxManage".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn should_get_default_config_from_empty_string() {
        let config = Config::parse("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.stack.network.0, "lamp_network");
        assert_eq!(config.stack.mysql.name.0, "mysql_server");
        assert_eq!(config.backup.retention, Duration::from_secs(30 * 24 * 3600));
    }

    #[test]
    fn should_parse_partial_config() {
        let config = Config::parse(
            //language=TOML
            r#"
            [binaries]
            podman = "/usr/local/bin/podman"

            [stack]
            network = "prod_network"

            [stack.mysql-credentials]
            user = "app"
            root-password = "hunter2"

            [backup]
            root = "/srv/backups"
            retention = "14days"
            backup-at = "01:30"
            "#,
        )
        .unwrap();

        assert_eq!(config.binaries.podman, PathBuf::from("/usr/local/bin/podman"));
        assert_eq!(config.binaries.certbot, PathBuf::from("certbot"));
        assert_eq!(config.stack.network.0, "prod_network");
        assert_eq!(config.stack.mysql_credentials.user, "app");
        assert_eq!(config.stack.mysql_credentials.root_password, "hunter2");
        // untouched sections keep their defaults
        assert_eq!(config.stack.apache.name.0, "apache2_server");
        assert_eq!(config.backup.root, PathBuf::from("/srv/backups"));
        assert_eq!(config.backup.retention, Duration::from_secs(14 * 24 * 3600));
        assert_eq!(config.backup.backup_at.hour, 1);
        assert_eq!(config.backup.backup_at.minute, 30);
        assert_eq!(config.backup.renew_at.hour, 3);
    }

    #[test]
    fn should_support_underscores_instead_of_dashes_in_settings() {
        let config = Config::parse(
            //language=TOML
            r#"
            [binaries]
            apt_get = "/usr/bin/apt-get"

            [stack.mysql_credentials]
            root_password = "secret"

            [stack.paths]
            web_root = "/srv/www"

            [backup]
            log_file = "/tmp/backup.log"
            backup_at = "04:15"
            "#,
        )
        .unwrap();

        assert_eq!(config.binaries.apt_get, PathBuf::from("/usr/bin/apt-get"));
        assert_eq!(config.stack.mysql_credentials.root_password, "secret");
        assert_eq!(config.stack.paths.web_root, PathBuf::from("/srv/www"));
        assert_eq!(config.backup.log_file, PathBuf::from("/tmp/backup.log"));
        assert_eq!(config.backup.backup_at.hour, 4);
    }
}
