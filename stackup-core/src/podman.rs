use crate::{
    config::stack,
    exec::{CommandConfig, CommandOutput, Error, Options},
};
use std::{path::PathBuf, time::Duration};

const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Typed wrapper around the podman CLI.
#[derive(Debug, Clone)]
pub struct Podman {
    command: CommandConfig,
}

impl Podman {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Podman {
            command: CommandConfig::from_path(path),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.command.found()
    }

    pub async fn version(&self) -> Result<String, Error> {
        let output = self.command.check_output(&["--version"]).await?;
        Ok(output.stdout.trim().to_owned())
    }

    pub async fn network_exists(&self, name: &stack::NetworkName) -> Result<bool, Error> {
        let output = self
            .command
            .output(&["network", "exists", name.0.as_str()])
            .await?;
        Ok(output.status.success())
    }

    pub async fn network_create(&self, name: &stack::NetworkName) -> Result<(), Error> {
        self.command
            .check_output(&["network", "create", name.0.as_str()])
            .await?;
        Ok(())
    }

    pub async fn stop(&self, name: &stack::Name) -> Result<(), Error> {
        self.command
            .check_output(&["stop", name.0.as_str()])
            .await?;
        Ok(())
    }

    pub async fn rm(&self, name: &stack::Name) -> Result<(), Error> {
        self.command.check_output(&["rm", name.0.as_str()]).await?;
        Ok(())
    }

    pub async fn start(&self, name: &stack::Name) -> Result<(), Error> {
        self.command
            .check_output(&["start", name.0.as_str()])
            .await?;
        Ok(())
    }

    pub async fn restart(&self, name: &stack::Name) -> Result<(), Error> {
        self.command
            .check_output(&["restart", name.0.as_str()])
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(container = %spec.name))]
    pub async fn run_container(&self, spec: &ContainerSpec) -> Result<(), Error> {
        self.command.check_output(&spec.to_args()).await?;
        Ok(())
    }

    /// Container metadata as JSON text.
    pub async fn inspect(&self, name: &stack::Name) -> Result<String, Error> {
        let output = self
            .command
            .check_output(&["inspect", name.0.as_str()])
            .await?;
        Ok(output.stdout)
    }

    pub async fn exec_capture(
        &self,
        container: &stack::Name,
        cmd: &[&str],
    ) -> Result<CommandOutput, Error> {
        let mut args: Vec<String> = vec!["exec".to_owned(), container.0.clone()];
        args.extend(cmd.iter().map(|s| s.to_string()));
        self.command.output(&args).await
    }

    /// `podman exec -i` with the given file as the command's stdin.
    pub async fn exec_with_stdin_file(
        &self,
        container: &stack::Name,
        cmd: &[&str],
        stdin: std::fs::File,
    ) -> Result<(), Error> {
        let mut args: Vec<String> = vec!["exec".to_owned(), "-i".to_owned(), container.0.clone()];
        args.extend(cmd.iter().map(|s| s.to_string()));
        self.command
            .spawn_with_stdin(&args, &Options::capture_output(), stdin)?
            .wait_with_output()
            .await?
            .check()?;
        Ok(())
    }

    /// Writes a `container-<name>.service` unit file into the working
    /// directory.
    pub async fn generate_systemd_unit(&self, name: &stack::Name) -> Result<(), Error> {
        self.command
            .check_output(&[
                "generate",
                "systemd",
                "--new",
                "--name",
                name.0.as_str(),
                "--files",
                "--restart-policy=always",
            ])
            .await?;
        Ok(())
    }

    /// Polls the database's health check until it answers or the deadline
    /// passes. Replaces a fixed startup delay with an explicit readiness
    /// probe.
    #[tracing::instrument(level = "debug", skip_all, fields(container = %container))]
    pub async fn wait_for_mysql(
        &self,
        container: &stack::Name,
        root_password: &str,
        timeout: Duration,
    ) -> Result<(), Error> {
        let password_arg = format!("-p{}", root_password);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ping = self
                .exec_capture(container, &["mysqladmin", "ping", "-uroot", &password_arg])
                .await;
            if let Ok(output) = ping {
                if output.status.success() {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() + READY_POLL_INTERVAL > deadline {
                return Err(Error::ReadinessTimeout(timeout));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    /// Appends the `:Z` SELinux relabel flag.
    pub relabel: bool,
}

impl VolumeMount {
    fn render(&self) -> String {
        if self.relabel {
            format!("{}:{}:Z", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// A detached container run, rendered to `podman run -d …` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: stack::Name,
    pub image: stack::Image,
    pub network: stack::NetworkName,
    pub env: Vec<(String, String)>,
    pub ports: Vec<stack::PortMapping>,
    pub volumes: Vec<VolumeMount>,
    /// Command overriding the image entrypoint, if any.
    pub command: Vec<String>,
}

impl ContainerSpec {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "-d".to_owned(),
            "--name".to_owned(),
            self.name.0.clone(),
            "--network".to_owned(),
            self.network.0.clone(),
        ];
        for (key, value) in &self.env {
            args.push("-e".to_owned());
            args.push(format!("{}={}", key, value));
        }
        for port in &self.ports {
            args.push("-p".to_owned());
            args.push(format!("{}:{}", port.host, port.container));
        }
        for volume in &self.volumes {
            args.push("-v".to_owned());
            args.push(volume.render());
        }
        args.push(self.image.0.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_container_run_args() {
        let spec = ContainerSpec {
            name: stack::Name("mysql_server".to_owned()),
            image: stack::Image("docker.io/library/mysql:8.0".to_owned()),
            network: stack::NetworkName("lamp_network".to_owned()),
            env: vec![("MYSQL_ROOT_PASSWORD".to_owned(), "1".to_owned())],
            ports: vec![stack::PortMapping {
                host: 3306,
                container: 3306,
            }],
            volumes: vec![VolumeMount {
                source: "mysql_data".to_owned(),
                target: "/var/lib/mysql".to_owned(),
                relabel: false,
            }],
            command: vec![],
        };

        assert_eq!(
            spec.to_args(),
            vec![
                "run",
                "-d",
                "--name",
                "mysql_server",
                "--network",
                "lamp_network",
                "-e",
                "MYSQL_ROOT_PASSWORD=1",
                "-p",
                "3306:3306",
                "-v",
                "mysql_data:/var/lib/mysql",
                "docker.io/library/mysql:8.0",
            ]
        );
    }

    #[test]
    fn should_render_relabeled_volume_and_command() {
        let spec = ContainerSpec {
            name: stack::Name("web".to_owned()),
            image: stack::Image("docker.io/library/httpd:2.4".to_owned()),
            network: stack::NetworkName("net".to_owned()),
            env: vec![],
            ports: vec![],
            volumes: vec![VolumeMount {
                source: "/opt/www".to_owned(),
                target: "/usr/local/apache2/htdocs".to_owned(),
                relabel: true,
            }],
            command: vec!["httpd-foreground".to_owned()],
        };

        let args = spec.to_args();
        assert!(args.contains(&"/opt/www:/usr/local/apache2/htdocs:Z".to_owned()));
        assert_eq!(args.last().unwrap(), "httpd-foreground");
    }
}
