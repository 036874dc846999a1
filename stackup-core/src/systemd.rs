use crate::{
    config::stack,
    exec::{CommandConfig, Error},
};
use std::path::{Path, PathBuf};

pub const UNIT_DIR: &str = "/etc/systemd/system";

#[derive(Debug, Clone)]
pub struct Systemctl {
    command: CommandConfig,
}

impl Systemctl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Systemctl {
            command: CommandConfig::from_path(path),
        }
    }

    pub async fn enable_now(&self, unit: &str) -> Result<(), Error> {
        self.command
            .check_output(&["enable", "--now", unit])
            .await?;
        Ok(())
    }

    pub async fn daemon_reload(&self) -> Result<(), Error> {
        self.command.check_output(&["daemon-reload"]).await?;
        Ok(())
    }

    pub async fn enable(&self, unit: &str) -> Result<(), Error> {
        self.command.check_output(&["enable", unit]).await?;
        Ok(())
    }
}

/// Name of the unit podman generates for a container.
pub fn container_unit(name: &stack::Name) -> String {
    format!("container-{}.service", name.0)
}

/// Moves a generated unit file into the systemd unit directory.
/// Copy-and-remove, since a rename can't cross filesystems.
pub async fn install_unit_file(source: &Path, unit_dir: &Path) -> std::io::Result<()> {
    let file_name = source.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "unit file path has no file name",
        )
    })?;
    let target = unit_dir.join(file_name);
    tokio::fs::copy(source, &target).await?;
    tokio::fs::remove_file(source).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_container_units() {
        let name = stack::Name("mysql_server".to_owned());
        assert_eq!(container_unit(&name), "container-mysql_server.service");
    }

    #[tokio::test]
    async fn should_move_unit_file_into_unit_dir() {
        let workdir = tempfile::tempdir().unwrap();
        let unit_dir = tempfile::tempdir().unwrap();
        let unit = "container-test.service";
        let source = workdir.path().join(unit);
        std::fs::write(&source, "[Unit]\n").unwrap();

        install_unit_file(&source, unit_dir.path()).await.unwrap();

        assert!(unit_dir.path().join(unit).is_file());
        assert!(!source.exists());
    }
}
