use crate::exec::{CommandConfig, Error};

/// Whether the current process runs with root privileges.
#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Installs a package with apt-get; used when a required tool is missing from
/// the host.
pub async fn apt_install(apt_get: &CommandConfig, package: &str) -> Result<(), Error> {
    apt_get.check_output(&["update"]).await?;
    apt_get.check_output(&["install", "-y", package]).await?;
    Ok(())
}
