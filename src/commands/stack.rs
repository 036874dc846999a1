use crate::cli;
use stackup_core::{
    certbot::{self, Certbot},
    config::{stack, Config},
    crontab::{Crontab, Entry},
    exec::{tolerated, CommandConfig},
    host,
    podman::Podman,
    services,
    systemd::{self, Systemctl},
};
use std::{path::Path, time::Duration};

const DATABASE_READY_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn setup(config: &Config, args: cli::stack::Setup) -> eyre::Result<()> {
    if !host::is_root() {
        eyre::bail!("stack setup must run as root (try sudo)");
    }

    println!("{}", "=".repeat(40));
    println!("Podman LAMP Stack Setup");
    println!("{}", "=".repeat(40));
    println!();

    let podman = Podman::new(&config.binaries.podman);
    let systemctl = Systemctl::new(&config.binaries.systemctl);
    let apt_get = CommandConfig::from_path(&config.binaries.apt_get);

    println!("[1/6] Checking podman installation...");
    if podman.is_installed() {
        match podman.version().await {
            Ok(version) => println!("podman is already installed ({})", version),
            Err(error) => tracing::warn!(%error, "failed to query podman version"),
        }
    } else {
        println!("podman not found. Installing podman...");
        host::apt_install(&apt_get, "podman").await?;
        println!("podman installed successfully.");
    }

    let email = match &args.domain {
        Some(domain) => {
            println!("\n[2/6] Installing certbot for Let's Encrypt...");
            let certbot = Certbot::new(&config.binaries.certbot);
            if certbot.is_installed() {
                println!("certbot is already installed");
            } else {
                host::apt_install(&apt_get, "certbot").await?;
                println!("certbot installed successfully.");
            }
            Some(
                args.email
                    .clone()
                    .unwrap_or_else(|| format!("admin@{}", domain)),
            )
        }
        None => None,
    };

    println!("\n[3/6] Enabling podman systemd socket...");
    tolerated(
        "enabling podman socket",
        systemctl.enable_now("podman.socket"),
    )
    .await;

    println!("\n[4/6] Creating podman network...");
    let network = &config.stack.network;
    if podman.network_exists(network).await? {
        println!("Network {} already exists", network.0);
    } else {
        podman.network_create(network).await?;
        println!("Network {} created", network.0);
    }

    println!("\n[5/6] Setting up MySQL container...");
    setup_mysql(config, &podman, &systemctl).await?;

    println!("\n[6/6] Setting up Apache2 container...");
    let has_ssl = setup_apache(
        config,
        &podman,
        &systemctl,
        args.domain.as_deref(),
        email.as_deref(),
    )
    .await?;

    println!("\n[Bonus] Setting up phpMyAdmin container...");
    setup_phpmyadmin(config, &podman, &systemctl).await?;

    println!("\n[Backup] Setting up automatic daily backups...");
    setup_backups(config, &podman).await?;

    print_summary(config, args.domain.as_deref(), has_ssl);
    Ok(())
}

/// Registers the generated systemd unit so the container comes back after a
/// host reboot.
async fn install_autostart_unit(
    podman: &Podman,
    systemctl: &Systemctl,
    name: &stack::Name,
) -> eyre::Result<()> {
    podman.generate_systemd_unit(name).await?;
    let unit = systemd::container_unit(name);
    systemd::install_unit_file(Path::new(&unit), Path::new(systemd::UNIT_DIR)).await?;
    systemctl.daemon_reload().await?;
    systemctl.enable(&unit).await?;
    Ok(())
}

async fn setup_mysql(config: &Config, podman: &Podman, systemctl: &Systemctl) -> eyre::Result<()> {
    let stack = &config.stack;
    tolerated("stopping leftover container", podman.stop(&stack.mysql.name)).await;
    tolerated("removing leftover container", podman.rm(&stack.mysql.name)).await;
    podman.run_container(&services::mysql(stack)).await?;
    println!(
        "MySQL container created (user: {}, password: {})",
        stack.mysql_credentials.user, stack.mysql_credentials.password
    );

    install_autostart_unit(podman, systemctl, &stack.mysql.name).await?;
    println!("MySQL auto-start enabled");
    Ok(())
}

async fn setup_apache(
    config: &Config,
    podman: &Podman,
    systemctl: &Systemctl,
    domain: Option<&str>,
    email: Option<&str>,
) -> eyre::Result<bool> {
    let stack = &config.stack;
    tolerated("stopping leftover container", podman.stop(&stack.apache.name)).await;
    tolerated("removing leftover container", podman.rm(&stack.apache.name)).await;

    tokio::fs::create_dir_all(&stack.paths.certs_dir).await?;
    tokio::fs::create_dir_all(&stack.paths.web_root).await?;

    let mut has_ssl = false;
    if let (Some(domain), Some(email)) = (domain, email) {
        if obtain_certificate(config, podman, domain, email).await? {
            tokio::fs::write(&stack.paths.ssl_conf, certbot::ssl_vhost_config(domain)).await?;
            podman.run_container(&services::apache(stack, true)).await?;
            println!("Apache2 container created with SSL support");
            has_ssl = true;
            install_renewal_job(config, domain).await?;
        } else {
            println!("Certificate not found, creating Apache without SSL");
        }
    }

    if !has_ssl {
        podman.run_container(&services::apache(stack, false)).await?;
        println!("Apache2 container created (HTTP only)");
        if domain.is_none() {
            println!(
                "To enable SSL, run: sudo stackup stack setup \
                 --domain your-domain.com --email your-email@example.com"
            );
        }
    }

    install_autostart_unit(podman, systemctl, &stack.apache.name).await?;
    println!("Apache2 auto-start enabled");
    Ok(has_ssl)
}

async fn obtain_certificate(
    config: &Config,
    podman: &Podman,
    domain: &str,
    email: &str,
) -> eyre::Result<bool> {
    println!("Obtaining Let's Encrypt certificate for {}...", domain);
    println!("Note: ensure that your domain points to this server's IP address");

    // the standalone challenge needs port 80 free
    tolerated("stopping web container", podman.stop(&config.stack.apache.name)).await;

    let certbot = Certbot::new(&config.binaries.certbot);
    if !certbot.obtain_standalone(domain, email).await? {
        println!("Certificate generation failed. You may need to configure DNS first.");
        return Ok(false);
    }

    let paths = &config.stack.paths;
    if certbot::live_dir(&paths.letsencrypt_dir, domain).is_dir() {
        certbot::install_live_certs(&paths.letsencrypt_dir, domain, &paths.certs_dir)?;
        println!("SSL certificate installed for {}", domain);
        Ok(true)
    } else {
        Ok(false)
    }
}

async fn install_renewal_job(config: &Config, domain: &str) -> eyre::Result<()> {
    println!("Setting up automatic certificate renewal...");
    let crontab = Crontab::new(&config.binaries.crontab);
    let command = certbot::renewal_command(
        &config.binaries.certbot,
        &config.binaries.podman,
        &config.stack.paths.letsencrypt_dir,
        domain,
        &config.stack.paths.certs_dir,
        &config.stack.apache.name,
    );
    crontab
        .ensure_entry(&Entry::daily(config.backup.renew_at, command))
        .await?;
    println!(
        "Auto-renewal configured (daily check at {})",
        config.backup.renew_at
    );
    Ok(())
}

async fn setup_phpmyadmin(
    config: &Config,
    podman: &Podman,
    systemctl: &Systemctl,
) -> eyre::Result<()> {
    let stack = &config.stack;
    tolerated(
        "stopping leftover container",
        podman.stop(&stack.phpmyadmin.name),
    )
    .await;
    tolerated(
        "removing leftover container",
        podman.rm(&stack.phpmyadmin.name),
    )
    .await;

    println!("Waiting for MySQL to be ready...");
    if let Err(error) = podman
        .wait_for_mysql(
            &stack.mysql.name,
            &stack.mysql_credentials.root_password,
            DATABASE_READY_TIMEOUT,
        )
        .await
    {
        tracing::warn!(%error, "database readiness probe failed, continuing");
    }

    podman.run_container(&services::phpmyadmin(stack)).await?;
    println!("phpMyAdmin container created with login authentication");

    install_autostart_unit(podman, systemctl, &stack.phpmyadmin.name).await?;
    println!("phpMyAdmin auto-start enabled");
    Ok(())
}

async fn setup_backups(config: &Config, podman: &Podman) -> eyre::Result<()> {
    tokio::fs::create_dir_all(&config.backup.root).await?;
    crate::commands::backup::install_schedule(config).await?;

    println!("Running initial backup...");
    if let Some(record) = tolerated("initial backup", stackup_core::backup::run(podman, config)).await
    {
        println!("Backup completed: {}", record.path().display());
    }
    Ok(())
}

fn print_summary(config: &Config, domain: Option<&str>, has_ssl: bool) {
    let stack = &config.stack;
    let backup = &config.backup;

    println!();
    println!("{}", "=".repeat(40));
    println!("Installation Complete!");
    println!("{}", "=".repeat(40));
    println!("\nServices Status:");

    match domain {
        Some(domain) if has_ssl => println!(
            "  - Apache2:    Running on https://{} (HTTP: port 80, HTTPS: port 443)",
            domain
        ),
        _ => println!("  - Apache2:    Running on http://localhost:80"),
    }
    println!("  - MySQL:      Running on port 3306");
    println!("  - phpMyAdmin: Running on http://localhost:8080");

    println!("\nMySQL Credentials:");
    println!("  - Username: {}", stack.mysql_credentials.user);
    println!("  - Password: {}", stack.mysql_credentials.password);
    println!("  - Root Password: {}", stack.mysql_credentials.root_password);

    if has_ssl {
        if let Some(domain) = domain {
            println!("\nSSL Certificate:");
            println!("  - Domain: {}", domain);
            println!("  - Auto-renewal: Enabled (checks daily at {})", backup.renew_at);
            println!("  - Certificate location: {}/", stack.paths.certs_dir.display());
        }
    }

    println!("\nWeb Root Directory: {}", stack.paths.web_root.display());
    println!("All services are set to auto-start on boot");

    println!("\nBackup Configuration:");
    println!("  - Backup directory: {}", backup.root.display());
    println!("  - Automatic backup: Every day at {}", backup.backup_at);
    println!(
        "  - Retention period: {} days",
        backup.retention.as_secs() / 86400
    );
    println!("  - Backup log: {}", backup.log_file.display());

    println!("\nUseful commands:");
    println!("  - sudo podman ps                    # List running containers");
    println!("  - sudo podman logs <container>      # View container logs");
    println!("  - sudo systemctl status container-* # Check service status");
    println!("  - sudo stackup backup run           # Manual backup");
    println!("  - sudo stackup restore              # Restore latest backup");
    println!("  - sudo stackup backup list          # View backups");

    if domain.is_some() {
        println!("  - sudo certbot renew --dry-run      # Test certificate renewal");
        println!("  - sudo certbot certificates         # View certificate info");
        println!(
            "\nNote: certbot renew runs automatically every day at {}",
            backup.renew_at
        );
    }

    println!("{}", "=".repeat(40));
}
