//! Let's Encrypt certificate issuance and renewal through the certbot CLI.

use crate::{
    config::stack,
    exec::{CommandConfig, Error},
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Certbot {
    command: CommandConfig,
}

impl Certbot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Certbot {
            command: CommandConfig::from_path(path),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.command.found()
    }

    /// Runs the standalone HTTP challenge. Returns whether a certificate was
    /// issued; a certbot failure is reported to the caller rather than
    /// aborting, the stack then comes up without TLS.
    #[tracing::instrument(skip(self, email))]
    pub async fn obtain_standalone(&self, domain: &str, email: &str) -> Result<bool, Error> {
        let output = self
            .command
            .output(&[
                "certonly",
                "--standalone",
                "--non-interactive",
                "--agree-tos",
                "--email",
                email,
                "-d",
                domain,
                "--preferred-challenges",
                "http",
            ])
            .await?;
        if !output.status.success() {
            tracing::warn!(stderr = %output.stderr.trim(), "certificate issuance failed");
        }
        Ok(output.status.success())
    }
}

/// Directory holding the live certificate pair for a domain.
pub fn live_dir(letsencrypt_dir: &Path, domain: &str) -> PathBuf {
    letsencrypt_dir.join("live").join(domain)
}

/// Copies the issued certificate pair into the stack's certificate directory
/// where the web container mounts it.
pub fn install_live_certs(
    letsencrypt_dir: &Path,
    domain: &str,
    certs_dir: &Path,
) -> std::io::Result<()> {
    let live = live_dir(letsencrypt_dir, domain);
    for file in ["fullchain.pem", "privkey.pem"] {
        let target = certs_dir.join(file);
        std::fs::copy(live.join(file), &target)?;
        #[cfg(unix)]
        {
            use std::{fs::Permissions, os::unix::fs::PermissionsExt};
            std::fs::set_permissions(&target, Permissions::from_mode(0o644))?;
        }
    }
    Ok(())
}

/// The renewal job command: re-run certbot and, after a successful renewal,
/// re-install the certificate pair and bounce the web container. Executed by
/// the cron shell.
pub fn renewal_command(
    certbot: &Path,
    podman: &Path,
    letsencrypt_dir: &Path,
    domain: &str,
    certs_dir: &Path,
    apache: &stack::Name,
) -> String {
    let live = live_dir(letsencrypt_dir, domain);
    format!(
        "{certbot} renew --quiet --deploy-hook \
         'cp {live}/fullchain.pem {certs}/ && cp {live}/privkey.pem {certs}/ && {podman} restart {apache}'",
        certbot = certbot.display(),
        live = live.display(),
        certs = certs_dir.display(),
        podman = podman.display(),
        apache = apache,
    )
}

/// Apache TLS vhost configuration, served from inside the httpd container.
pub fn ssl_vhost_config(domain: &str) -> String {
    format!(
        r#"LoadModule ssl_module modules/mod_ssl.so
LoadModule socache_shmcb_module modules/mod_socache_shmcb.so

Listen 443

SSLCipherSuite HIGH:MEDIUM:!MD5:!RC4:!3DES
SSLProxyCipherSuite HIGH:MEDIUM:!MD5:!RC4:!3DES
SSLHonorCipherOrder on
SSLProtocol all -SSLv3 -TLSv1 -TLSv1.1
SSLProxyProtocol all -SSLv3 -TLSv1 -TLSv1.1
SSLPassPhraseDialog  builtin
SSLSessionCache        "shmcb:/usr/local/apache2/logs/ssl_scache(512000)"
SSLSessionCacheTimeout  300

<VirtualHost *:443>
    ServerName {domain}
    DocumentRoot /usr/local/apache2/htdocs

    SSLEngine on
    SSLCertificateFile /usr/local/apache2/conf/certs/fullchain.pem
    SSLCertificateKeyFile /usr/local/apache2/conf/certs/privkey.pem

    <Directory /usr/local/apache2/htdocs>
        Options Indexes FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>
</VirtualHost>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_vhost_for_the_domain() {
        let config = ssl_vhost_config("example.org");

        assert!(config.contains("ServerName example.org"));
        assert!(config.contains("SSLCertificateFile /usr/local/apache2/conf/certs/fullchain.pem"));
        assert!(config.contains("SSLProtocol all -SSLv3 -TLSv1 -TLSv1.1"));
    }

    #[test]
    fn should_render_renewal_command_with_deploy_hook() {
        let command = renewal_command(
            Path::new("certbot"),
            Path::new("podman"),
            Path::new("/etc/letsencrypt"),
            "example.org",
            Path::new("/opt/apache-ssl/certs"),
            &stack::Name("apache2_server".to_owned()),
        );

        assert!(command.starts_with("certbot renew --quiet"));
        assert!(command.contains("/etc/letsencrypt/live/example.org/fullchain.pem"));
        assert!(command.contains("podman restart apache2_server"));
    }

    #[test]
    fn should_locate_live_certificates_under_the_domain() {
        let dir = live_dir(Path::new("/etc/letsencrypt"), "example.org");
        assert_eq!(dir, PathBuf::from("/etc/letsencrypt/live/example.org"));
    }
}
