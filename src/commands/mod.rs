use stackup_core::{config::Config, podman::Podman};

pub mod backup;
pub mod restore;
pub mod stack;
pub mod vm;

pub fn config(config: &Config) -> eyre::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub async fn version(config: &Config) -> eyre::Result<()> {
    println!("stackup: {}", stackup_core::VERSION);

    let podman = Podman::new(&config.binaries.podman);
    match podman.version().await {
        Ok(podman_version) => println!("podman: {}", podman_version),
        Err(err) => println!(
            "Could not determine podman version ({}), is podman installed correctly?",
            err
        ),
    }
    Ok(())
}
