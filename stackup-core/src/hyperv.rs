//! Hyper-V management through PowerShell cmdlets. Invocations are assembled
//! from typed parameters and rendered with single-quote escaping, so VM and
//! switch names never break out of the command text.

use crate::exec::{CommandConfig, CommandOutput, Error};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(u64),
    Bool(bool),
    /// A parameter without a value, e.g. `-Force`.
    Switch,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// A single cmdlet invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmdlet {
    name: &'static str,
    params: Vec<(&'static str, Value)>,
}

impl Cmdlet {
    pub fn new(name: &'static str) -> Self {
        Cmdlet {
            name,
            params: Vec::new(),
        }
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    pub fn switch(mut self, name: &'static str) -> Self {
        self.params.push((name, Value::Switch));
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.name.to_owned();
        for (name, value) in &self.params {
            out.push_str(" -");
            out.push_str(name);
            match value {
                Value::Switch => {}
                Value::Str(s) => {
                    out.push(' ');
                    out.push_str(&quote(s));
                }
                Value::Int(i) => {
                    out.push(' ');
                    out.push_str(&i.to_string());
                }
                Value::Bool(b) => {
                    out.push_str(if *b { " $true" } else { " $false" });
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PowerShell {
    command: CommandConfig,
}

impl PowerShell {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PowerShell {
            command: CommandConfig::from_path(path),
        }
    }

    pub async fn run_script(&self, script: &str) -> Result<CommandOutput, Error> {
        self.command
            .output(&["-NoProfile", "-Command", script])
            .await
    }

    pub async fn invoke(&self, cmdlet: &Cmdlet) -> Result<CommandOutput, Error> {
        self.run_script(&cmdlet.render()).await
    }

    pub async fn check_invoke(&self, cmdlet: &Cmdlet) -> Result<CommandOutput, Error> {
        self.invoke(cmdlet).await?.check()
    }
}

const ADMIN_CHECK: &str = "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";
const FEATURE_CHECK: &str = "Get-WindowsOptionalFeature -Online -FeatureName Microsoft-Hyper-V-All | Select-Object -ExpandProperty State";
const FIRST_UP_ADAPTER: &str = "Get-NetAdapter | Where-Object {$_.Status -eq 'Up'} | Select-Object -First 1 -ExpandProperty Name";

/// Hyper-V operations used by the VM provisioning pipeline.
#[derive(Debug, Clone)]
pub struct HyperV {
    shell: PowerShell,
}

impl HyperV {
    pub fn new(shell: PowerShell) -> Self {
        HyperV { shell }
    }

    pub async fn is_administrator(&self) -> Result<bool, Error> {
        let output = self.shell.run_script(ADMIN_CHECK).await?;
        Ok(output.status.success() && output.stdout.contains("True"))
    }

    pub async fn hyperv_enabled(&self) -> Result<bool, Error> {
        let output = self.shell.run_script(FEATURE_CHECK).await?;
        Ok(output.status.success() && output.stdout.contains("Enabled"))
    }

    pub async fn vm_exists(&self, name: &str) -> Result<bool, Error> {
        let output = self
            .shell
            .invoke(&Cmdlet::new("Get-VM").arg("Name", name))
            .await?;
        Ok(output.status.success() && output.stdout.contains(name))
    }

    pub async fn stop_vm(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Stop-VM")
                    .arg("Name", name)
                    .switch("Force")
                    .switch("TurnOff"),
            )
            .await?;
        Ok(())
    }

    pub async fn remove_vm(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(&Cmdlet::new("Remove-VM").arg("Name", name).switch("Force"))
            .await?;
        Ok(())
    }

    pub async fn new_vm(&self, name: &str, memory_bytes: u64, vm_path: &Path) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("New-VM")
                    .arg("Name", name)
                    .arg("MemoryStartupBytes", memory_bytes)
                    .arg("Generation", 2u64)
                    .arg("Path", vm_path.to_string_lossy().into_owned()),
            )
            .await?;
        Ok(())
    }

    /// Processor count, boot-time autostart with a short delay, and disabled
    /// checkpoints.
    pub async fn configure_vm(&self, name: &str, cpu_count: u64) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Set-VM")
                    .arg("Name", name)
                    .arg("ProcessorCount", cpu_count)
                    .arg("AutomaticStartAction", "Start")
                    .arg("AutomaticStartDelay", 10u64),
            )
            .await?;
        self.shell
            .check_invoke(
                &Cmdlet::new("Set-VM")
                    .arg("Name", name)
                    .arg("CheckpointType", "Disabled"),
            )
            .await?;
        Ok(())
    }

    /// Nested virtualization, for running containers inside the guest.
    pub async fn expose_virtualization_extensions(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Set-VMProcessor")
                    .arg("VMName", name)
                    .arg("ExposeVirtualizationExtensions", true),
            )
            .await?;
        Ok(())
    }

    pub async fn new_vhd(&self, path: &Path, size_bytes: u64) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("New-VHD")
                    .arg("Path", path.to_string_lossy().into_owned())
                    .arg("SizeBytes", size_bytes)
                    .switch("Dynamic"),
            )
            .await?;
        Ok(())
    }

    pub async fn add_scsi_controller(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(&Cmdlet::new("Add-VMScsiController").arg("VMName", name))
            .await?;
        Ok(())
    }

    pub async fn add_hard_disk(&self, name: &str, path: &Path) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Add-VMHardDiskDrive")
                    .arg("VMName", name)
                    .arg("Path", path.to_string_lossy().into_owned()),
            )
            .await?;
        Ok(())
    }

    pub async fn add_dvd_drive(&self, name: &str, iso: &Path) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Add-VMDvdDrive")
                    .arg("VMName", name)
                    .arg("Path", iso.to_string_lossy().into_owned()),
            )
            .await?;
        Ok(())
    }

    pub async fn set_boot_order_dvd_first(&self, name: &str) -> Result<(), Error> {
        let script = format!(
            "$dvd = Get-VMDvdDrive -VMName {n}; $hdd = Get-VMHardDiskDrive -VMName {n}; \
             Set-VMFirmware -VMName {n} -BootOrder $dvd,$hdd",
            n = quote(name)
        );
        self.shell.run_script(&script).await?.check()?;
        Ok(())
    }

    pub async fn disable_secure_boot(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Set-VMFirmware")
                    .arg("VMName", name)
                    .arg("EnableSecureBoot", "Off"),
            )
            .await?;
        Ok(())
    }

    pub async fn switch_exists(&self, name: &str) -> Result<bool, Error> {
        let output = self
            .shell
            .invoke(&Cmdlet::new("Get-VMSwitch").arg("Name", name))
            .await?;
        Ok(output.status.success() && output.stdout.contains(name))
    }

    /// Name of the first network adapter that is up, if any.
    pub async fn first_up_adapter(&self) -> Result<Option<String>, Error> {
        let output = self.shell.run_script(FIRST_UP_ADAPTER).await?;
        let name = output.stdout.trim();
        if output.status.success() && !name.is_empty() {
            Ok(Some(name.to_owned()))
        } else {
            Ok(None)
        }
    }

    pub async fn new_external_switch(&self, name: &str, adapter: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("New-VMSwitch")
                    .arg("Name", name)
                    .arg("NetAdapterName", adapter)
                    .arg("AllowManagementOS", true),
            )
            .await?;
        Ok(())
    }

    pub async fn new_internal_switch(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("New-VMSwitch")
                    .arg("Name", name)
                    .arg("SwitchType", "Internal"),
            )
            .await?;
        Ok(())
    }

    pub async fn connect_network_adapter(&self, name: &str, switch: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(
                &Cmdlet::new("Add-VMNetworkAdapter")
                    .arg("VMName", name)
                    .arg("SwitchName", switch),
            )
            .await?;
        Ok(())
    }

    pub async fn start_vm(&self, name: &str) -> Result<(), Error> {
        self.shell
            .check_invoke(&Cmdlet::new("Start-VM").arg("Name", name))
            .await?;
        Ok(())
    }

    /// Opens the interactive console viewer for the VM.
    pub async fn open_console(&self, name: &str) -> Result<(), Error> {
        let script = format!("vmconnect localhost {}", quote(name));
        self.shell.run_script(&script).await?.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_cmdlet_with_typed_parameters() {
        let cmdlet = Cmdlet::new("New-VM")
            .arg("Name", "Ubuntu-24.04-Server")
            .arg("MemoryStartupBytes", 4294967296u64)
            .arg("Generation", 2u64)
            .arg("Path", "C:\\VMs");

        assert_eq!(
            cmdlet.render(),
            "New-VM -Name 'Ubuntu-24.04-Server' -MemoryStartupBytes 4294967296 \
             -Generation 2 -Path 'C:\\VMs'"
        );
    }

    #[test]
    fn should_render_switches_and_booleans() {
        let cmdlet = Cmdlet::new("Stop-VM")
            .arg("Name", "vm")
            .switch("Force")
            .switch("TurnOff");
        assert_eq!(cmdlet.render(), "Stop-VM -Name 'vm' -Force -TurnOff");

        let cmdlet = Cmdlet::new("Set-VMProcessor")
            .arg("VMName", "vm")
            .arg("ExposeVirtualizationExtensions", true);
        assert_eq!(
            cmdlet.render(),
            "Set-VMProcessor -VMName 'vm' -ExposeVirtualizationExtensions $true"
        );
    }

    #[test]
    fn should_escape_single_quotes_in_names() {
        let cmdlet = Cmdlet::new("Get-VM").arg("Name", "it's; Remove-VM");

        assert_eq!(cmdlet.render(), "Get-VM -Name 'it''s; Remove-VM'");
    }
}
