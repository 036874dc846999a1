use stackup_core::{
    backup,
    config::Config,
    crontab::{Crontab, Entry},
    podman::Podman,
};

pub async fn run(config: &Config) -> eyre::Result<()> {
    let podman = Podman::new(&config.binaries.podman);
    let record = backup::run(&podman, config).await?;
    println!("Backup completed: {}", record.path().display());
    Ok(())
}

pub async fn install_schedule(config: &Config) -> eyre::Result<()> {
    let crontab = Crontab::new(&config.binaries.crontab);
    let entry = Entry::daily(config.backup.backup_at, backup_command(config)?);
    if crontab.ensure_entry(&entry).await? {
        println!(
            "Automatic backup configured (daily at {})",
            config.backup.backup_at
        );
        println!("Backup directory: {}", config.backup.root.display());
        println!(
            "Backup retention: {} days",
            config.backup.retention.as_secs() / 86400
        );
    } else {
        println!("Backup cron job already exists");
    }
    Ok(())
}

pub fn list(config: &Config) -> eyre::Result<()> {
    let root = &config.backup.root;
    if !root.is_dir() {
        println!("No backups found in {}", root.display());
        return Ok(());
    }
    let records = backup::record::list(root)?;
    if records.is_empty() {
        println!("No backups found in {}", root.display());
        return Ok(());
    }
    for record in records {
        if record.is_complete() {
            println!("{}", record.path().display());
        } else {
            println!("{} (incomplete)", record.path().display());
        }
    }
    Ok(())
}

/// The scheduled job re-invokes this binary; its output is appended to the
/// backup log by the cron shell.
fn backup_command(config: &Config) -> eyre::Result<String> {
    let exe = std::env::current_exe()?;
    Ok(format!(
        "{} backup run >> {} 2>&1",
        exe.display(),
        config.backup.log_file.display()
    ))
}
