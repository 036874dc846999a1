//! Engine tests against fake tool binaries. Each test writes a small shell
//! script standing in for the external CLI and points the wrappers at it.

#![cfg(unix)]

use stackup_core::config::Config;
use std::path::{Path, PathBuf};

fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

mod exec {
    use super::*;
    use stackup_core::exec::CommandConfig;

    #[tokio::test]
    async fn should_capture_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "tool", "echo out1; echo err1 >&2");
        let command = CommandConfig::from_path(tool);

        let output = command.output(&["whatever"]).await.unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout, "out1\n");
        assert_eq!(output.stderr, "err1\n");
    }

    #[tokio::test]
    async fn should_fail_check_with_captured_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "tool", "echo broken >&2; exit 3");
        let command = CommandConfig::from_path(tool);

        let error = command.check_output(&["x"]).await.unwrap_err();

        let message = error.to_string();
        assert!(message.contains("error status 3"), "{}", message);
        assert!(message.contains("broken"), "{}", message);
    }
}

mod crontab {
    use super::*;
    use stackup_core::{
        config::backup::JobTime,
        crontab::{Crontab, Entry},
    };

    fn fake_crontab(dir: &Path) -> (Crontab, PathBuf) {
        let state = dir.join("crontab-state");
        let script = format!(
            r#"STATE="{state}"
if [ "$1" = "-l" ]; then
    if [ -f "$STATE" ]; then cat "$STATE"; exit 0; fi
    echo "no crontab for user" >&2
    exit 1
fi
if [ "$1" = "-" ]; then cat > "$STATE"; exit 0; fi
exit 1"#,
            state = state.display()
        );
        let tool = fake_tool(dir, "crontab", &script);
        (Crontab::new(tool), state)
    }

    #[tokio::test]
    async fn should_install_entry_into_empty_crontab() {
        let dir = tempfile::tempdir().unwrap();
        let (crontab, state) = fake_crontab(dir.path());
        let entry = Entry::daily(JobTime { hour: 2, minute: 0 }, "/usr/local/bin/backup run");

        let changed = crontab.ensure_entry(&entry).await.unwrap();

        assert!(changed);
        assert_eq!(
            std::fs::read_to_string(state).unwrap(),
            "0 2 * * * /usr/local/bin/backup run\n"
        );
    }

    #[tokio::test]
    async fn should_install_entry_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let (crontab, state) = fake_crontab(dir.path());
        let entry = Entry::daily(JobTime { hour: 2, minute: 0 }, "/usr/local/bin/backup run");

        assert!(crontab.ensure_entry(&entry).await.unwrap());
        assert!(!crontab.ensure_entry(&entry).await.unwrap());

        let table = std::fs::read_to_string(state).unwrap();
        assert_eq!(table.matches("/usr/local/bin/backup run").count(), 1);
    }

    #[tokio::test]
    async fn should_keep_unrelated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let (crontab, state) = fake_crontab(dir.path());
        std::fs::write(&state, "30 4 * * * /usr/bin/updatedb\n").unwrap();
        let entry = Entry::daily(JobTime { hour: 3, minute: 0 }, "certbot renew --quiet");

        crontab.ensure_entry(&entry).await.unwrap();

        let table = std::fs::read_to_string(state).unwrap();
        assert!(table.contains("/usr/bin/updatedb"));
        assert!(table.contains("0 3 * * * certbot renew --quiet"));
    }
}

mod backup {
    use super::*;
    use stackup_core::{backup, podman::Podman};

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.backup.root = dir.join("backups");
        config.stack.paths.web_root = dir.join("www");
        config.stack.paths.certs_dir = dir.join("certs");
        config.stack.paths.letsencrypt_dir = dir.join("letsencrypt");
        config
    }

    fn fake_podman(dir: &Path) -> Podman {
        // mysqldump output on `exec`, inspect JSON on `inspect`
        let tool = fake_tool(
            dir,
            "podman",
            r#"case "$1" in
exec) echo "-- fake mysqldump output" ;;
inspect) echo "[{\"Name\": \"$2\"}]" ;;
esac
exit 0"#,
        );
        Podman::new(tool)
    }

    #[tokio::test]
    async fn should_produce_a_complete_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.stack.paths.web_root).unwrap();
        std::fs::write(config.stack.paths.web_root.join("index.html"), "hi").unwrap();
        let podman = fake_podman(dir.path());

        let record = backup::run(&podman, &config).await.unwrap();

        assert!(record.is_complete());
        let dump = std::fs::read_to_string(record.mysql_dump()).unwrap();
        assert!(dump.contains("fake mysqldump output"));
        assert!(record.www_archive().is_file());
        // no certificate directory, no certificate archive
        assert!(!record.certs_archive().exists());
        let snapshot =
            std::fs::read_to_string(record.path().join("mysql_config.json")).unwrap();
        assert!(snapshot.contains("mysql_server"));
    }

    #[tokio::test]
    async fn should_archive_certificates_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.stack.paths.web_root).unwrap();
        std::fs::create_dir_all(&config.stack.paths.certs_dir).unwrap();
        std::fs::write(config.stack.paths.certs_dir.join("fullchain.pem"), "cert").unwrap();
        let podman = fake_podman(dir.path());

        let record = backup::run(&podman, &config).await.unwrap();

        assert!(record.certs_archive().is_file());
    }

    #[tokio::test]
    async fn should_prune_expired_records_during_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.stack.paths.web_root).unwrap();
        let expired = config.backup.root.join("backup_20000101_000000");
        std::fs::create_dir_all(&expired).unwrap();
        let podman = fake_podman(dir.path());

        backup::run(&podman, &config).await.unwrap();

        assert!(!expired.exists());
    }

    #[tokio::test]
    async fn should_complete_the_record_even_when_every_step_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        // no web root, and a podman that always fails
        let tool = fake_tool(dir.path(), "podman", "echo down >&2; exit 1");
        let podman = Podman::new(tool);

        let record = backup::run(&podman, &config).await.unwrap();

        assert!(record.is_complete());
        assert!(!record.mysql_dump().exists());
        assert!(!record.www_archive().exists());
    }
}

mod restore {
    use super::*;
    use stackup_core::{
        backup::{archive, record::Record},
        podman::Podman,
        restore,
    };

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.backup.root = dir.join("backups");
        config
    }

    /// A podman fake that logs every invocation and copies `exec -i` stdin
    /// aside.
    fn logging_podman(dir: &Path) -> (Podman, PathBuf, PathBuf) {
        let log = dir.join("podman-log");
        let stdin_copy = dir.join("podman-stdin");
        let script = format!(
            r#"echo "$@" >> "{log}"
if [ "$1" = "exec" ] && [ "$2" = "-i" ]; then cat > "{stdin_copy}"; fi
exit 0"#,
            log = log.display(),
            stdin_copy = stdin_copy.display()
        );
        let tool = fake_tool(dir, "podman", &script);
        (Podman::new(tool), log, stdin_copy)
    }

    fn make_record(config: &Config, name: &str) -> Record {
        let path = config.backup.root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        let record = Record::open(&path).unwrap();
        record.mark_complete().unwrap();
        record
    }

    #[tokio::test]
    async fn should_skip_database_but_restore_web_tree_when_dump_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let record = make_record(&config, "backup_20250101_020000");

        // only a web tree archive in the record
        let www = dir.path().join("www");
        std::fs::create_dir_all(&www).unwrap();
        std::fs::write(www.join("index.html"), "restored").unwrap();
        archive::create(&record.www_archive(), &[&www]).unwrap();

        let (podman, log, _) = logging_podman(dir.path());
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        restore::restore_at(&podman, &config, &record, &scratch)
            .await
            .unwrap();

        let log = std::fs::read_to_string(log).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines.contains(&"stop mysql_server"));
        assert!(lines.contains(&"stop apache2_server"));
        // without a dump the database container is never started for a load
        assert!(!lines.contains(&"start mysql_server"));
        assert!(lines.contains(&"restart mysql_server"));
        assert!(lines.contains(&"restart apache2_server"));

        let restored = scratch
            .join(www.strip_prefix("/").unwrap())
            .join("index.html");
        assert_eq!(std::fs::read_to_string(restored).unwrap(), "restored");
    }

    #[tokio::test]
    async fn should_load_the_dump_through_the_database_container() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let record = make_record(&config, "backup_20250101_020000");
        std::fs::write(record.mysql_dump(), "CREATE DATABASE restored;\n").unwrap();

        let (podman, log, stdin_copy) = logging_podman(dir.path());
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        restore::restore_at(&podman, &config, &record, &scratch)
            .await
            .unwrap();

        let log = std::fs::read_to_string(log).unwrap();
        assert!(log.lines().any(|line| line == "start mysql_server"));
        assert_eq!(
            std::fs::read_to_string(stdin_copy).unwrap(),
            "CREATE DATABASE restored;\n"
        );
    }

    #[tokio::test]
    async fn should_select_latest_record_when_no_path_is_given() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        make_record(&config, "backup_20250101_020000");
        let newest = make_record(&config, "backup_20250301_020000");

        let selected = restore::select_record(&config, None).unwrap();

        assert_eq!(selected.path(), newest.path());
    }

    #[tokio::test]
    async fn should_fail_selection_without_any_backups() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.backup.root).unwrap();

        let result = restore::select_record(&config, None);

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_fail_selection_for_a_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let result =
            restore::select_record(&config, Some(Path::new("/does/not/exist/backup_x")));

        assert!(result.is_err());
    }
}
