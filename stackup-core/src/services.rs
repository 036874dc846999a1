//! Run specifications for the managed containers, assembled from the stack
//! configuration.

use crate::{
    config::stack,
    podman::{ContainerSpec, VolumeMount},
};

pub const MYSQL_DATA_VOLUME: &str = "mysql_data";

const HTDOCS: &str = "/usr/local/apache2/htdocs";
const CONTAINER_CERTS: &str = "/usr/local/apache2/conf/certs";
const CONTAINER_SSL_CONF: &str = "/usr/local/apache2/conf/extra/httpd-ssl.conf";

pub fn mysql(stack: &stack::Definition) -> ContainerSpec {
    let credentials = &stack.mysql_credentials;
    ContainerSpec {
        name: stack.mysql.name.clone(),
        image: stack.mysql.image.clone(),
        network: stack.network.clone(),
        env: vec![
            (
                "MYSQL_ROOT_PASSWORD".to_owned(),
                credentials.root_password.clone(),
            ),
            ("MYSQL_USER".to_owned(), credentials.user.clone()),
            ("MYSQL_PASSWORD".to_owned(), credentials.password.clone()),
            ("MYSQL_DATABASE".to_owned(), credentials.database.clone()),
        ],
        ports: stack.mysql.ports.clone(),
        volumes: vec![VolumeMount {
            source: MYSQL_DATA_VOLUME.to_owned(),
            target: "/var/lib/mysql".to_owned(),
            relabel: false,
        }],
        command: vec![],
    }
}

/// The web container. With TLS enabled the certificate directory and vhost
/// configuration are mounted in and the config include is appended before
/// httpd starts.
pub fn apache(stack: &stack::Definition, with_ssl: bool) -> ContainerSpec {
    let paths = &stack.paths;
    let mut volumes = vec![VolumeMount {
        source: paths.web_root.display().to_string(),
        target: HTDOCS.to_owned(),
        relabel: true,
    }];
    let mut command = vec![];
    if with_ssl {
        volumes.push(VolumeMount {
            source: paths.certs_dir.display().to_string(),
            target: CONTAINER_CERTS.to_owned(),
            relabel: true,
        });
        volumes.push(VolumeMount {
            source: paths.ssl_conf.display().to_string(),
            target: CONTAINER_SSL_CONF.to_owned(),
            relabel: true,
        });
        command = vec![
            "sh".to_owned(),
            "-c".to_owned(),
            "echo 'Include conf/extra/httpd-ssl.conf' >> /usr/local/apache2/conf/httpd.conf \
             && httpd-foreground"
                .to_owned(),
        ];
    }
    ContainerSpec {
        name: stack.apache.name.clone(),
        image: stack.apache.image.clone(),
        network: stack.network.clone(),
        env: vec![],
        ports: stack.apache.ports.clone(),
        volumes,
        command,
    }
}

pub fn phpmyadmin(stack: &stack::Definition) -> ContainerSpec {
    ContainerSpec {
        name: stack.phpmyadmin.name.clone(),
        image: stack.phpmyadmin.image.clone(),
        network: stack.network.clone(),
        env: vec![("PMA_HOST".to_owned(), stack.mysql.name.0.clone())],
        ports: stack.phpmyadmin.ports.clone(),
        volumes: vec![],
        command: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pass_credentials_to_the_database_container() {
        let spec = mysql(&stack::Definition::default());

        let args = spec.to_args();
        assert!(args.contains(&"MYSQL_ROOT_PASSWORD=1".to_owned()));
        assert!(args.contains(&"MYSQL_USER=user".to_owned()));
        assert!(args.contains(&"MYSQL_DATABASE=testdb".to_owned()));
        assert!(args.contains(&"mysql_data:/var/lib/mysql".to_owned()));
    }

    #[test]
    fn should_mount_certificates_only_with_ssl() {
        let stack = stack::Definition::default();

        let plain = apache(&stack, false);
        assert_eq!(plain.volumes.len(), 1);
        assert!(plain.command.is_empty());

        let ssl = apache(&stack, true);
        assert_eq!(ssl.volumes.len(), 3);
        assert_eq!(ssl.command[0], "sh");
    }

    #[test]
    fn should_point_phpmyadmin_at_the_database_container() {
        let spec = phpmyadmin(&stack::Definition::default());

        assert!(spec
            .env
            .contains(&("PMA_HOST".to_owned(), "mysql_server".to_owned())));
    }
}
