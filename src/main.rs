use clap::Parser;
use stackup::{cli, commands};
use stackup_core::config::Config;
use std::path::PathBuf;

fn default_config_path() -> eyre::Result<PathBuf> {
    dirs_next::config_dir()
        .map(|dir| dir.join("stackup").join("config.toml"))
        .ok_or_else(|| eyre::eyre!("failed to get default config file path"))
}

fn setup_logger() -> eyre::Result<()> {
    use tracing_subscriber::{
        filter::{EnvFilter, LevelFilter},
        fmt::layer,
        layer::SubscriberExt,
        util::SubscriberInitExt,
        Registry,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    Registry::default()
        .with(filter)
        .with(layer().with_target(false).without_time())
        .try_init()?;
    Ok(())
}

async fn load_config(args: &cli::Cli) -> eyre::Result<Config> {
    if let Some(config_string) = &args.config_string {
        Ok(Config::parse(config_string)?)
    } else if let Some(config_file) = &args.config_file {
        Ok(Config::parse_file(config_file).await?)
    } else {
        // without an explicit file the built-in defaults apply
        let path = default_config_path()?;
        if path.is_file() {
            Ok(Config::parse_file(&path).await?)
        } else {
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    setup_logger()?;

    let args = cli::Cli::parse();
    let config = load_config(&args).await?;

    match args.subcommand {
        cli::Cmd::Stack(args) => match args.subcommand {
            cli::stack::Cmd::Setup(args) => commands::stack::setup(&config, args).await,
        },
        cli::Cmd::Vm(args) => match args.subcommand {
            cli::vm::Cmd::Hyperv(args) => commands::vm::hyperv(&config, args).await,
            cli::vm::Cmd::Virtualbox(args) => commands::vm::virtualbox(&config, args).await,
        },
        cli::Cmd::Backup(args) => match args.subcommand {
            cli::backup::Cmd::Run => commands::backup::run(&config).await,
            cli::backup::Cmd::InstallSchedule => commands::backup::install_schedule(&config).await,
            cli::backup::Cmd::List => commands::backup::list(&config),
        },
        cli::Cmd::Restore(args) => commands::restore::run(&config, args).await,
        cli::Cmd::Config => commands::config(&config),
        cli::Cmd::Version => commands::version(&config).await,
    }
}
