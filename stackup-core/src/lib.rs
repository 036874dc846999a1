pub mod backup;
pub mod certbot;
pub mod config;
pub mod crontab;
pub mod exec;
pub mod host;
pub mod hyperv;
pub mod podman;
pub mod restore;
pub mod services;
pub mod systemd;
pub mod vbox;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
