//! The backup engine. One run produces one record: database dump, web tree
//! archive, certificate archive when present, and per-service metadata
//! snapshots. The steps are independent; a failing step is logged and the
//! rest still run. Expired records are pruned at the end of the run.

use crate::{
    config::{stack::Service, Config},
    exec::tolerated,
    podman::Podman,
};
use eyre::WrapErr;
use time::{OffsetDateTime, PrimitiveDateTime};

pub mod archive;
pub mod record;

pub use record::Record;

/// Wall-clock time used for record names; falls back to UTC when the local
/// offset is indeterminate.
pub fn now_local() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

#[tracing::instrument(skip_all)]
pub async fn run(podman: &Podman, config: &Config) -> eyre::Result<Record> {
    let settings = &config.backup;
    tokio::fs::create_dir_all(&settings.root)
        .await
        .wrap_err_with(|| {
            format!(
                "failed to create backup directory {}",
                settings.root.display()
            )
        })?;

    let now = now_local();
    let record = Record::create(&settings.root, now)?;
    tracing::info!(record = ?record.name(), "created backup record");

    tolerated("database dump", dump_database(podman, config, &record)).await;
    tolerated("web tree archive", archive_web_root(config, &record)).await;
    tolerated("certificate archive", archive_certs(config, &record)).await;
    for service in Service::ALL {
        tolerated(
            "service metadata snapshot",
            snapshot_service(podman, config, &record, service),
        )
        .await;
    }

    record.mark_complete()?;

    let pruned = record::prune(&settings.root, now, settings.retention)?;
    for expired in &pruned {
        tracing::info!(record = ?expired.name(), "deleted expired backup record");
    }

    Ok(record)
}

async fn dump_database(podman: &Podman, config: &Config, record: &Record) -> eyre::Result<()> {
    let stack = &config.stack;
    let password_arg = format!("-p{}", stack.mysql_credentials.root_password);
    let output = podman
        .exec_capture(
            &stack.mysql.name,
            &["mysqldump", "-u", "root", &password_arg, "--all-databases"],
        )
        .await?
        .check()?;
    tokio::fs::write(record.mysql_dump(), output.stdout).await?;
    Ok(())
}

async fn archive_web_root(config: &Config, record: &Record) -> eyre::Result<()> {
    let web_root = config.stack.paths.web_root.clone();
    if !web_root.exists() {
        eyre::bail!("web root {} does not exist", web_root.display());
    }
    let target = record.www_archive();
    tokio::task::spawn_blocking(move || archive::create(&target, &[&web_root])).await??;
    Ok(())
}

async fn archive_certs(config: &Config, record: &Record) -> eyre::Result<()> {
    let certs_dir = config.stack.paths.certs_dir.clone();
    if !certs_dir.exists() {
        return Ok(());
    }
    let letsencrypt_dir = config.stack.paths.letsencrypt_dir.clone();
    let target = record.certs_archive();
    tokio::task::spawn_blocking(move || archive::create(&target, &[&certs_dir, &letsencrypt_dir]))
        .await??;
    Ok(())
}

async fn snapshot_service(
    podman: &Podman,
    config: &Config,
    record: &Record,
    service: Service,
) -> eyre::Result<()> {
    let container = &config.stack.container(service).name;
    let json = podman.inspect(container).await?;
    tokio::fs::write(record.snapshot(service), json).await?;
    Ok(())
}
