use std::path::PathBuf;

/// Provisions an Ubuntu server as a virtual machine or a podman LAMP stack,
/// with scheduled backup and restore for the stack.
#[derive(clap::Parser)]
#[command(name = "stackup", version)]
pub struct Cli {
    /// Sets a custom configuration file path
    #[arg(short, long, env = "STACKUP_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Sets the configuration from a string
    #[arg(long, env = "STACKUP_CONFIG")]
    pub config_string: Option<String>,

    #[command(subcommand)]
    pub subcommand: Cmd,
}

#[derive(clap::Subcommand)]
pub enum Cmd {
    /// Provisions the podman container stack
    Stack(stack::Cli),

    /// Creates an Ubuntu server virtual machine
    Vm(vm::Cli),

    /// Runs and schedules stack backups
    Backup(backup::Cli),

    /// Restores the stack from a backup record
    Restore(restore::Cli),

    /// Prints the active configuration
    Config,

    /// Prints version information
    Version,
}

pub mod stack {
    #[derive(clap::Args)]
    pub struct Cli {
        #[command(subcommand)]
        pub subcommand: Cmd,
    }

    #[derive(clap::Subcommand)]
    pub enum Cmd {
        /// Sets up MySQL, Apache, and phpMyAdmin containers with daily backups
        Setup(Setup),
    }

    #[derive(clap::Args)]
    pub struct Setup {
        /// Domain name for Let's Encrypt SSL
        #[arg(long)]
        pub domain: Option<String>,

        /// Email address for Let's Encrypt; defaults to admin@<domain>
        #[arg(long)]
        pub email: Option<String>,
    }
}

pub mod vm {
    use std::path::PathBuf;

    #[derive(clap::Args)]
    pub struct Cli {
        #[command(subcommand)]
        pub subcommand: Cmd,
    }

    #[derive(clap::Subcommand)]
    pub enum Cmd {
        /// Creates the VM in Hyper-V
        Hyperv(Hyperv),

        /// Creates the VM in VirtualBox
        Virtualbox(Virtualbox),
    }

    #[derive(clap::Args)]
    pub struct Hyperv {
        /// VM name
        #[arg(long, default_value = "Ubuntu-24.04-Server")]
        pub vm_name: String,

        /// Path to the Ubuntu ISO file
        #[arg(long)]
        pub iso_path: PathBuf,

        /// RAM in GB
        #[arg(long, default_value_t = 4)]
        pub memory: u64,

        /// Number of CPUs
        #[arg(long, default_value_t = 2)]
        pub cpus: u64,

        /// Disk size in GB
        #[arg(long, default_value_t = 50)]
        pub disk_size: u64,

        /// VM storage path
        #[arg(long, default_value = "C:\\ProgramData\\Microsoft\\Windows\\Hyper-V")]
        pub vm_path: PathBuf,

        /// Virtual switch name
        #[arg(long, default_value = "External-Switch")]
        pub switch_name: String,

        /// Do not start the VM after creation
        #[arg(long)]
        pub no_start: bool,
    }

    #[derive(clap::Args)]
    pub struct Virtualbox {
        /// VM name
        #[arg(long, default_value = "Ubuntu-24.04-Server")]
        pub vm_name: String,

        /// Path to the Ubuntu ISO file
        #[arg(long)]
        pub iso_path: PathBuf,

        /// RAM in MB
        #[arg(long, default_value_t = 4096)]
        pub memory: u32,

        /// Number of CPUs
        #[arg(long, default_value_t = 2)]
        pub cpus: u32,

        /// Disk size in GB
        #[arg(long, default_value_t = 50)]
        pub disk_size: u64,

        /// User name for the unattended install
        #[arg(long, default_value = "ubuntu")]
        pub username: String,

        /// Password for the unattended install
        #[arg(long, default_value = "ubuntu")]
        pub password: String,

        /// Guest host name
        #[arg(long, default_value = "ubuntu-server")]
        pub hostname: String,

        /// Start the VM without a display
        #[arg(long)]
        pub headless: bool,

        /// Do not start the VM after creation
        #[arg(long)]
        pub no_start: bool,

        /// Skip the unattended installation and install Ubuntu by hand
        #[arg(long)]
        pub manual_install: bool,
    }
}

pub mod backup {
    #[derive(clap::Args)]
    pub struct Cli {
        #[command(subcommand)]
        pub subcommand: Cmd,
    }

    #[derive(clap::Subcommand)]
    pub enum Cmd {
        /// Takes one backup of the stack now
        Run,

        /// Installs the daily backup job into the crontab
        InstallSchedule,

        /// Lists the existing backup records
        List,
    }
}

pub mod restore {
    use std::path::PathBuf;

    #[derive(clap::Args)]
    pub struct Cli {
        /// Backup record to restore; the most recent one if not given
        #[arg(value_name = "RECORD_PATH")]
        pub record: Option<PathBuf>,
    }
}
