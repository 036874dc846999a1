//! The restore engine: the backup sequence reversed. Services are stopped,
//! the database dump loaded, the archived trees unpacked, and the services
//! restarted. A missing artifact is skipped with a warning; partial restores
//! are allowed to succeed.

use crate::{
    backup::{archive, record, Record},
    config::Config,
    exec::tolerated,
    podman::Podman,
};
use eyre::WrapErr;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const DATABASE_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Selects the record to restore: an explicit path, or the most recent
/// complete record under the backup root.
pub fn select_record(config: &Config, path: Option<&Path>) -> eyre::Result<Record> {
    match path {
        Some(path) => Record::open(path),
        None => {
            let root = &config.backup.root;
            if !root.is_dir() {
                eyre::bail!("backup directory {} not found", root.display());
            }
            record::latest(root)?
                .ok_or_else(|| eyre::eyre!("no backups found in {}", root.display()))
        }
    }
}

pub async fn run(podman: &Podman, config: &Config, record: &Record) -> eyre::Result<()> {
    restore_at(podman, config, record, Path::new("/")).await
}

/// Same as [`run`] with the unpack root made explicit; tests restore into a
/// scratch directory.
#[tracing::instrument(skip_all, fields(record = ?record.name()))]
pub async fn restore_at(
    podman: &Podman,
    config: &Config,
    record: &Record,
    fs_root: &Path,
) -> eyre::Result<()> {
    let stack = &config.stack;

    tracing::info!("stopping containers");
    tolerated("stopping database container", podman.stop(&stack.mysql.name)).await;
    tolerated("stopping web container", podman.stop(&stack.apache.name)).await;

    let dump = record.mysql_dump();
    if dump.is_file() {
        tracing::info!("restoring database");
        tolerated("starting database container", podman.start(&stack.mysql.name)).await;
        match podman
            .wait_for_mysql(
                &stack.mysql.name,
                &stack.mysql_credentials.root_password,
                DATABASE_READY_TIMEOUT,
            )
            .await
        {
            Ok(()) => {
                tolerated("database load", load_dump(podman, config, &dump)).await;
            }
            Err(error) => {
                tracing::warn!(%error, "database never became ready, skipping dump load");
            }
        }
    } else {
        tracing::warn!("database dump not found in record, skipping");
    }

    let www = record.www_archive();
    if www.is_file() {
        tracing::info!("restoring web tree");
        tolerated("web tree unpack", unpack(www, fs_root.to_owned())).await;
    } else {
        tracing::warn!("web tree archive not found in record, skipping");
    }

    let certs = record.certs_archive();
    if certs.is_file() {
        tracing::info!("restoring certificates");
        tolerated("certificate unpack", unpack(certs, fs_root.to_owned())).await;
    } else {
        tracing::info!("no certificate archive in record");
    }

    tracing::info!("restarting containers");
    tolerated(
        "restarting database container",
        podman.restart(&stack.mysql.name),
    )
    .await;
    tolerated("restarting web container", podman.restart(&stack.apache.name)).await;

    Ok(())
}

async fn load_dump(podman: &Podman, config: &Config, dump: &Path) -> eyre::Result<()> {
    let stack = &config.stack;
    let password_arg = format!("-p{}", stack.mysql_credentials.root_password);
    let file = std::fs::File::open(dump)
        .wrap_err_with(|| format!("failed to open {}", dump.display()))?;
    podman
        .exec_with_stdin_file(
            &stack.mysql.name,
            &["mysql", "-u", "root", &password_arg],
            file,
        )
        .await?;
    Ok(())
}

async fn unpack(archive_path: PathBuf, fs_root: PathBuf) -> eyre::Result<()> {
    tokio::task::spawn_blocking(move || archive::unpack(&archive_path, &fs_root)).await??;
    Ok(())
}
