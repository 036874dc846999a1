//! VirtualBox management through the VBoxManage CLI.

use crate::exec::{CommandConfig, Error};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForward {
    pub name: &'static str,
    pub host_port: u16,
    pub guest_port: u16,
}

impl PortForward {
    fn render(&self) -> String {
        format!("{},tcp,,{},,{}", self.name, self.host_port, self.guest_port)
    }
}

/// NAT forwards exposing the guest's stack services on the host.
pub const DEFAULT_PORT_FORWARDS: [PortForward; 4] = [
    PortForward {
        name: "ssh",
        host_port: 2222,
        guest_port: 22,
    },
    PortForward {
        name: "http",
        host_port: 8000,
        guest_port: 80,
    },
    PortForward {
        name: "https",
        host_port: 8443,
        guest_port: 443,
    },
    PortForward {
        name: "phpmyadmin",
        host_port: 8080,
        guest_port: 8080,
    },
];

#[derive(Debug, Clone)]
pub struct VBoxManage {
    command: CommandConfig,
}

impl VBoxManage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VBoxManage {
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

    pub async fn vm_exists(&self, name: &str) -> Result<bool, Error> {
        let output = self.command.output(&["showvminfo", name]).await?;
        Ok(output.status.success())
    }

    pub async fn unregister_vm(&self, name: &str) -> Result<(), Error> {
        self.command
            .check_output(&["unregistervm", name, "--delete"])
            .await?;
        Ok(())
    }

    pub async fn create_vm(&self, name: &str) -> Result<(), Error> {
        self.command
            .check_output(&[
                "createvm",
                "--name",
                name,
                "--ostype",
                "Ubuntu_64",
                "--register",
            ])
            .await?;
        Ok(())
    }

    /// Memory, CPUs, boot order, and the NAT nic with its port forwards.
    pub async fn configure_vm(
        &self,
        name: &str,
        memory_mb: u32,
        cpu_count: u32,
        forwards: &[PortForward],
    ) -> Result<(), Error> {
        let mut args: Vec<String> = vec![
            "modifyvm".to_owned(),
            name.to_owned(),
            "--memory".to_owned(),
            memory_mb.to_string(),
            "--cpus".to_owned(),
            cpu_count.to_string(),
            "--vram".to_owned(),
            "128".to_owned(),
            "--boot1".to_owned(),
            "dvd".to_owned(),
            "--boot2".to_owned(),
            "disk".to_owned(),
            "--boot3".to_owned(),
            "none".to_owned(),
            "--boot4".to_owned(),
            "none".to_owned(),
            "--audio".to_owned(),
            "none".to_owned(),
            "--nic1".to_owned(),
            "nat".to_owned(),
        ];
        for forward in forwards {
            args.push("--natpf1".to_owned());
            args.push(forward.render());
        }
        self.command.check_output(&args).await?;
        Ok(())
    }

    /// The directory VirtualBox placed the VM's machine file in.
    pub async fn vm_folder(&self, name: &str) -> Result<Option<PathBuf>, Error> {
        let output = self
            .command
            .check_output(&["showvminfo", name, "--machinereadable"])
            .await?;
        Ok(parse_cfg_file(&output.stdout).and_then(|cfg| cfg.parent().map(Path::to_owned)))
    }

    pub async fn create_storage_controller(&self, name: &str) -> Result<(), Error> {
        self.command
            .check_output(&[
                "storagectl",
                name,
                "--name",
                "SATA",
                "--add",
                "sata",
                "--controller",
                "IntelAhci",
                "--portcount",
                "2",
                "--bootable",
                "on",
            ])
            .await?;
        Ok(())
    }

    pub async fn create_disk(&self, path: &Path, size_mb: u64) -> Result<(), Error> {
        let args: Vec<OsString> = vec![
            "createmedium".into(),
            "disk".into(),
            "--filename".into(),
            path.as_os_str().to_owned(),
            "--size".into(),
            size_mb.to_string().into(),
            "--format".into(),
            "VDI".into(),
        ];
        self.command.check_output(&args).await?;
        Ok(())
    }

    pub async fn attach_disk(&self, name: &str, disk: &Path) -> Result<(), Error> {
        self.storage_attach(name, "0", "hdd", disk).await
    }

    pub async fn attach_iso(&self, name: &str, iso: &Path) -> Result<(), Error> {
        self.storage_attach(name, "1", "dvddrive", iso).await
    }

    async fn storage_attach(
        &self,
        name: &str,
        port: &str,
        medium_type: &str,
        medium: &Path,
    ) -> Result<(), Error> {
        let args: Vec<OsString> = vec![
            "storageattach".into(),
            name.into(),
            "--storagectl".into(),
            "SATA".into(),
            "--port".into(),
            port.into(),
            "--device".into(),
            "0".into(),
            "--type".into(),
            medium_type.into(),
            "--medium".into(),
            medium.as_os_str().to_owned(),
        ];
        self.command.check_output(&args).await?;
        Ok(())
    }

    pub async fn unattended_install(
        &self,
        name: &str,
        iso: &Path,
        username: &str,
        password: &str,
        hostname: &str,
    ) -> Result<(), Error> {
        let args: Vec<OsString> = vec![
            "unattended".into(),
            "install".into(),
            name.into(),
            "--iso".into(),
            iso.as_os_str().to_owned(),
            "--user".into(),
            username.into(),
            "--password".into(),
            password.into(),
            "--full-user-name".into(),
            username.into(),
            "--hostname".into(),
            hostname.into(),
            "--install-additions".into(),
            "--time-zone".into(),
            "UTC".into(),
        ];
        self.command.check_output(&args).await?;
        Ok(())
    }

    pub async fn enable_autostart(&self, name: &str) -> Result<(), Error> {
        self.command
            .check_output(&["modifyvm", name, "--autostart-enabled", "on"])
            .await?;
        self.command
            .check_output(&["modifyvm", name, "--autostart-delay", "10"])
            .await?;
        Ok(())
    }

    pub async fn start_vm(&self, name: &str, headless: bool) -> Result<(), Error> {
        let vm_type = if headless { "headless" } else { "gui" };
        self.command
            .check_output(&["startvm", name, "--type", vm_type])
            .await?;
        Ok(())
    }
}

/// Extracts the machine file path from `showvminfo --machinereadable` output.
fn parse_cfg_file(machine_readable: &str) -> Option<PathBuf> {
    for line in machine_readable.lines() {
        if let Some(value) = line.strip_prefix("CfgFile=") {
            return Some(PathBuf::from(value.trim().trim_matches('"')));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_machine_file_path() {
        let output = "name=\"ubuntu\"\nCfgFile=\"/home/user/VirtualBox VMs/ubuntu/ubuntu.vbox\"\nmemory=4096\n";

        let cfg = parse_cfg_file(output).unwrap();

        assert_eq!(
            cfg,
            PathBuf::from("/home/user/VirtualBox VMs/ubuntu/ubuntu.vbox")
        );
    }

    #[test]
    fn should_find_no_machine_file_in_unrelated_output() {
        assert_eq!(parse_cfg_file("name=\"ubuntu\"\nmemory=4096\n"), None);
    }

    #[test]
    fn should_render_port_forward_rules() {
        assert_eq!(
            PortForward {
                name: "ssh",
                host_port: 2222,
                guest_port: 22
            }
            .render(),
            "ssh,tcp,,2222,,22"
        );
    }
}
