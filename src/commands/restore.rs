use crate::cli;
use stackup_core::{config::Config, podman::Podman, restore};

pub async fn run(config: &Config, args: cli::restore::Cli) -> eyre::Result<()> {
    println!("{}", "=".repeat(40));
    println!("Podman LAMP Stack Restore");
    println!("{}", "=".repeat(40));
    println!();

    let record = restore::select_record(config, args.record.as_deref())?;
    println!("Restoring from: {}", record.path().display());

    let podman = Podman::new(&config.binaries.podman);
    restore::run(&podman, config, &record).await?;

    println!();
    println!("{}", "=".repeat(40));
    println!("Restore Complete!");
    println!("{}", "=".repeat(40));
    println!("\nRestored from: {}", record.path().display());
    println!("All services have been restarted");
    Ok(())
}
