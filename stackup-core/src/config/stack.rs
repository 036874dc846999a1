use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Container name.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(pub String);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Image(pub String);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkName(pub String);

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Container {
    pub name: Name,
    pub image: Image,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

/// The managed container stack. Defaults mirror the stock single-host LAMP
/// deployment.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Definition {
    pub network: NetworkName,
    pub mysql: Container,
    pub apache: Container,
    pub phpmyadmin: Container,
    #[serde(alias = "mysql_credentials")]
    pub mysql_credentials: Credentials,
    pub paths: Paths,
}

impl Default for Definition {
    fn default() -> Self {
        Definition {
            network: NetworkName("lamp_network".to_owned()),
            mysql: Container {
                name: Name("mysql_server".to_owned()),
                image: Image("docker.io/library/mysql:8.0".to_owned()),
                ports: vec![PortMapping {
                    host: 3306,
                    container: 3306,
                }],
            },
            apache: Container {
                name: Name("apache2_server".to_owned()),
                image: Image("docker.io/library/httpd:2.4".to_owned()),
                ports: vec![
                    PortMapping {
                        host: 80,
                        container: 80,
                    },
                    PortMapping {
                        host: 443,
                        container: 443,
                    },
                ],
            },
            phpmyadmin: Container {
                name: Name("phpmyadmin".to_owned()),
                image: Image("docker.io/phpmyadmin/phpmyadmin:latest".to_owned()),
                ports: vec![PortMapping {
                    host: 8080,
                    container: 80,
                }],
            },
            mysql_credentials: Credentials::default(),
            paths: Paths::default(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Credentials {
    pub user: String,
    pub password: String,
    #[serde(alias = "root_password")]
    pub root_password: String,
    pub database: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials {
            user: "user".to_owned(),
            password: "1".to_owned(),
            root_password: "1".to_owned(),
            database: "testdb".to_owned(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct Paths {
    #[serde(alias = "web_root")]
    pub web_root: PathBuf,
    #[serde(alias = "certs_dir")]
    pub certs_dir: PathBuf,
    #[serde(alias = "ssl_conf")]
    pub ssl_conf: PathBuf,
    #[serde(alias = "letsencrypt_dir")]
    pub letsencrypt_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            web_root: "/opt/apache-ssl/www".into(),
            certs_dir: "/opt/apache-ssl/certs".into(),
            ssl_conf: "/opt/apache-ssl/ssl.conf".into(),
            letsencrypt_dir: "/etc/letsencrypt".into(),
        }
    }
}

/// The managed services, in fixed pipeline order.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Service {
    Mysql,
    Apache,
    Phpmyadmin,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Mysql, Service::Apache, Service::Phpmyadmin];

    /// File name of this service's metadata snapshot inside a backup record.
    pub fn snapshot_file(&self) -> &'static str {
        match self {
            Service::Mysql => "mysql_config.json",
            Service::Apache => "apache_config.json",
            Service::Phpmyadmin => "phpmyadmin_config.json",
        }
    }
}

impl Definition {
    pub fn container(&self, service: Service) -> &Container {
        match service {
            Service::Mysql => &self.mysql,
            Service::Apache => &self.apache,
            Service::Phpmyadmin => &self.phpmyadmin,
        }
    }
}
