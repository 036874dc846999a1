use crate::cli;
use stackup_core::{
    config::Config,
    exec::tolerated,
    hyperv::{HyperV, PowerShell},
    vbox::{VBoxManage, DEFAULT_PORT_FORWARDS},
};

pub async fn hyperv(config: &Config, args: cli::vm::Hyperv) -> eyre::Result<()> {
    println!("{}", "=".repeat(50));
    println!("Ubuntu Hyper-V VM Creator");
    println!("{}", "=".repeat(50));
    println!();

    let hyperv = HyperV::new(PowerShell::new(&config.binaries.powershell));

    println!("[1/6] Checking administrator privileges...");
    if !hyperv.is_administrator().await? {
        eyre::bail!(
            "this command must be run as Administrator; right-click PowerShell \
             and select 'Run as Administrator'"
        );
    }
    println!("Running with administrator privileges");

    println!("\n[2/6] Checking Hyper-V status...");
    if !hyperv.hyperv_enabled().await? {
        eyre::bail!(
            "Hyper-V is not enabled; enable it with 'Enable-WindowsOptionalFeature \
             -Online -FeatureName Microsoft-Hyper-V-All' and restart the computer"
        );
    }
    println!("Hyper-V is enabled");

    println!("\n[3/6] Checking Ubuntu ISO...");
    if !args.iso_path.is_file() {
        eyre::bail!(
            "ISO not found: {}; download the Ubuntu server ISO from \
             https://releases.ubuntu.com/ and pass it with --iso-path",
            args.iso_path.display()
        );
    }
    println!("ISO found: {}", args.iso_path.display());

    println!("\n[4/6] Creating VM: {}...", args.vm_name);
    if hyperv.vm_exists(&args.vm_name).await? {
        println!("VM '{}' already exists. Removing it...", args.vm_name);
        tolerated("stopping existing VM", hyperv.stop_vm(&args.vm_name)).await;
        tolerated("removing existing VM", hyperv.remove_vm(&args.vm_name)).await;
    }
    let memory_bytes = args.memory * 1024 * 1024 * 1024;
    hyperv
        .new_vm(&args.vm_name, memory_bytes, &args.vm_path)
        .await?;
    hyperv.configure_vm(&args.vm_name, args.cpus).await?;
    tolerated(
        "exposing virtualization extensions",
        hyperv.expose_virtualization_extensions(&args.vm_name),
    )
    .await;
    println!("VM created with {}GB RAM, {} CPUs", args.memory, args.cpus);

    println!("\n[5/6] Creating storage...");
    let vhdx_path = args
        .vm_path
        .join(&args.vm_name)
        .join("Virtual Hard Disks")
        .join(format!("{}.vhdx", args.vm_name));
    let disk_size_bytes = args.disk_size * 1024 * 1024 * 1024;
    hyperv.new_vhd(&vhdx_path, disk_size_bytes).await?;
    tolerated(
        "adding SCSI controller",
        hyperv.add_scsi_controller(&args.vm_name),
    )
    .await;
    hyperv.add_hard_disk(&args.vm_name, &vhdx_path).await?;
    hyperv.add_dvd_drive(&args.vm_name, &args.iso_path).await?;
    hyperv.set_boot_order_dvd_first(&args.vm_name).await?;
    hyperv.disable_secure_boot(&args.vm_name).await?;
    println!("Storage created: {}GB disk", args.disk_size);
    println!("ISO attached: {}", args.iso_path.display());

    println!("\n[6/6] Configuring network...");
    if hyperv.switch_exists(&args.switch_name).await? {
        println!("Using existing virtual switch: {}", args.switch_name);
    } else {
        println!("Creating external virtual switch: {}...", args.switch_name);
        println!("This will use your default network adapter.");
        match hyperv.first_up_adapter().await? {
            Some(adapter) => {
                hyperv
                    .new_external_switch(&args.switch_name, &adapter)
                    .await?;
                println!("Virtual switch created using adapter: {}", adapter);
            }
            None => {
                println!(
                    "WARNING: could not find an active adapter. \
                     Creating internal switch instead."
                );
                hyperv.new_internal_switch(&args.switch_name).await?;
            }
        }
    }
    hyperv
        .connect_network_adapter(&args.vm_name, &args.switch_name)
        .await?;
    println!("VM connected to network switch");

    if args.no_start {
        println!("\nVM created but not started (--no-start flag)");
    } else {
        println!("\nStarting VM: {}...", args.vm_name);
        hyperv.start_vm(&args.vm_name).await?;
        println!("VM started");
        println!("Opening VM console...");
        tolerated("opening VM console", hyperv.open_console(&args.vm_name)).await;
    }

    print_hyperv_summary(&args);
    Ok(())
}

pub async fn virtualbox(config: &Config, args: cli::vm::Virtualbox) -> eyre::Result<()> {
    println!("{}", "=".repeat(50));
    println!("Ubuntu VirtualBox VM Creator");
    println!("{}", "=".repeat(50));
    println!();

    let vbox = VBoxManage::new(&config.binaries.vboxmanage);

    println!("[1/7] Checking VirtualBox installation...");
    if !vbox.is_installed() {
        eyre::bail!(
            "VBoxManage not found in PATH; install VirtualBox from \
             https://www.virtualbox.org/wiki/Downloads"
        );
    }
    let version = vbox.version().await?;
    println!("VirtualBox found: {}", version);

    println!("\n[2/7] Checking Ubuntu ISO...");
    if !args.iso_path.is_file() {
        eyre::bail!(
            "ISO not found: {}; download the Ubuntu server ISO from \
             https://releases.ubuntu.com/ and pass it with --iso-path",
            args.iso_path.display()
        );
    }
    println!("ISO found: {}", args.iso_path.display());

    println!("\n[3/7] Creating VM: {}...", args.vm_name);
    if vbox.vm_exists(&args.vm_name).await? {
        println!("VM '{}' already exists. Removing it...", args.vm_name);
        tolerated("removing existing VM", vbox.unregister_vm(&args.vm_name)).await;
    }
    vbox.create_vm(&args.vm_name).await?;
    vbox.configure_vm(&args.vm_name, args.memory, args.cpus, &DEFAULT_PORT_FORWARDS)
        .await?;
    println!("VM created with {}MB RAM, {} CPUs", args.memory, args.cpus);

    println!("\n[4/7] Creating storage...");
    let vm_folder = vbox
        .vm_folder(&args.vm_name)
        .await?
        .ok_or_else(|| eyre::eyre!("could not determine the VM folder"))?;
    let vdi_path = vm_folder.join(format!("{}.vdi", args.vm_name));
    vbox.create_storage_controller(&args.vm_name).await?;
    vbox.create_disk(&vdi_path, args.disk_size * 1024).await?;
    vbox.attach_disk(&args.vm_name, &vdi_path).await?;
    vbox.attach_iso(&args.vm_name, &args.iso_path).await?;
    println!("Storage created: {}GB disk", args.disk_size);
    println!("ISO attached: {}", args.iso_path.display());

    let mut unattended = false;
    if args.manual_install {
        println!("\n[5/7] Skipping unattended installation (--manual-install flag)");
    } else {
        println!("\n[5/7] Configuring unattended installation...");
        match vbox
            .unattended_install(
                &args.vm_name,
                &args.iso_path,
                &args.username,
                &args.password,
                &args.hostname,
            )
            .await
        {
            Ok(()) => {
                println!("Unattended install configured (user: {})", args.username);
                unattended = true;
            }
            Err(error) => {
                tracing::warn!(%error, "unattended installation setup failed");
                println!("WARNING: unattended installation setup failed");
                println!("You will need to install Ubuntu manually");
            }
        }
    }

    println!("\n[6/7] Enabling autostart on host boot...");
    tolerated("enabling autostart", vbox.enable_autostart(&args.vm_name)).await;
    println!("VM autostart enabled (10 second delay)");

    if args.no_start {
        println!("\nVM created but not started (--no-start flag)");
    } else {
        println!("\n[7/7] Starting VM...");
        vbox.start_vm(&args.vm_name, args.headless).await?;
        if args.headless {
            println!("VM started in headless mode");
        } else {
            println!("VM started with GUI");
        }
    }

    print_virtualbox_summary(&args, unattended);
    Ok(())
}

fn print_hyperv_summary(args: &cli::vm::Hyperv) {
    println!();
    println!("{}", "=".repeat(50));
    println!("VM Creation Complete!");
    println!("{}", "=".repeat(50));

    println!("\nVM Name: {}", args.vm_name);
    println!("\nResources:");
    println!("  - RAM: {}GB", args.memory);
    println!("  - CPUs: {}", args.cpus);
    println!("  - Disk: {}GB", args.disk_size);

    println!("\nNetwork:");
    println!("  - Virtual Switch: {}", args.switch_name);

    println!("\nISO: {}", args.iso_path.display());

    println!("\nAutostart:");
    println!("  - VM will automatically start on host boot");
    println!("  - Autostart delay: 10 seconds");

    println!("\nInstallation:");
    println!("  - Follow the Ubuntu installer in the VM console");
    println!("  - After installation, remove the ISO:");
    println!(
        "    Get-VMDvdDrive -VMName \"{}\" | Remove-VMDvdDrive",
        args.vm_name
    );

    println!("\nUseful PowerShell commands:");
    println!("  Get-VM -Name \"{}\"          # Show VM info", args.vm_name);
    println!("  Start-VM -Name \"{}\"        # Start VM", args.vm_name);
    println!("  Stop-VM -Name \"{}\"         # Shutdown VM", args.vm_name);
    println!("  vmconnect localhost \"{}\"   # Open console", args.vm_name);
    println!("  Remove-VM -Name \"{}\" -Force # Delete VM", args.vm_name);

    println!("\nAfter Ubuntu installation:");
    println!("  - Install SSH server in Ubuntu: sudo apt install openssh-server");
    println!("  - Configure port forwarding or use bridged network for access");

    println!("{}", "=".repeat(50));
}

fn print_virtualbox_summary(args: &cli::vm::Virtualbox, unattended: bool) {
    println!();
    println!("{}", "=".repeat(50));
    println!("VM Creation Complete!");
    println!("{}", "=".repeat(50));

    println!("\nVM Name: {}", args.vm_name);
    println!("Hostname: {}", args.hostname);
    println!("Username: {}", args.username);
    println!("Password: {}", args.password);

    println!("\nResources:");
    println!("  - RAM: {}MB", args.memory);
    println!("  - CPUs: {}", args.cpus);
    println!("  - Disk: {}GB", args.disk_size);

    println!("\nPort Forwarding (Host -> VM):");
    for forward in &DEFAULT_PORT_FORWARDS {
        println!(
            "  - {:<11} localhost:{}  -> VM:{}",
            format!("{}:", forward.name),
            forward.host_port,
            forward.guest_port
        );
    }

    if unattended {
        println!("\nUbuntu is installing unattended; the VM reboots when done");
    } else {
        println!("\nFollow the Ubuntu installer in the VM window");
    }

    println!("\nUseful VBoxManage commands:");
    println!(
        "  VBoxManage startvm \"{}\" --type gui       # Start with display",
        args.vm_name
    );
    println!(
        "  VBoxManage startvm \"{}\" --type headless  # Start without display",
        args.vm_name
    );
    println!(
        "  VBoxManage controlvm \"{}\" acpipowerbutton # Graceful shutdown",
        args.vm_name
    );
    println!(
        "  VBoxManage showvminfo \"{}\"               # Show VM info",
        args.vm_name
    );
    println!(
        "  VBoxManage unregistervm \"{}\" --delete    # Delete VM",
        args.vm_name
    );

    println!("{}", "=".repeat(50));
}
