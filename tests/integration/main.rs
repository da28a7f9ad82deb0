//! Integration tests for ledgerops

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Temp home, workspace and config isolated from the host
    struct Sandbox {
        temp: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            std::fs::create_dir_all(temp.path().join("home")).unwrap();
            std::fs::create_dir_all(temp.path().join("workspace")).unwrap();
            Self { temp }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }

        fn workspace(&self) -> PathBuf {
            self.path("workspace")
        }

        fn cache_root(&self) -> PathBuf {
            self.path("cache")
        }

        fn write_config(&self, max_size_gb: u64) -> PathBuf {
            let config = self.path("config.toml");
            std::fs::write(
                &config,
                format!(
                    "[general]\nevent_log = false\n\n[cache]\nroot = {:?}\nmax_size_gb = {}\n",
                    self.cache_root().display().to_string(),
                    max_size_gb
                ),
            )
            .unwrap();
            config
        }

        fn cmd(&self) -> Command {
            let home = self.path("home");
            let mut cmd = cargo_bin_cmd!("ledgerops");
            cmd.env("HOME", &home)
                .env("XDG_CONFIG_HOME", home.join(".config"))
                .env("XDG_STATE_HOME", home.join(".local/state"))
                .env("LEDGEROPS_PLAIN", "1")
                .env_remove("LEDGEROPS_CONFIG")
                .env_remove("BUILDKITE_LABEL")
                .current_dir(self.workspace());
            cmd
        }
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        found.sort();
        found
    }

    #[test]
    fn help_displays() {
        Sandbox::new()
            .cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache-hook"))
            .stdout(predicate::str::contains("install"));
    }

    #[test]
    fn version_displays() {
        Sandbox::new()
            .cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ledgerops"));
    }

    #[test]
    fn install_without_destination_fails() {
        Sandbox::new()
            .cmd()
            .arg("install")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Install directory not specified"));
    }

    #[test]
    fn install_with_empty_destination_creates_nothing() {
        let sandbox = Sandbox::new();
        let before = entries(&sandbox.workspace());

        sandbox
            .cmd()
            .args(["install", ""])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Install directory not specified"));

        assert_eq!(entries(&sandbox.workspace()), before);
    }

    #[cfg(unix)]
    #[test]
    fn install_reports_total_and_elapsed() {
        let sandbox = Sandbox::new();
        let dest = sandbox.path("out");

        // `true` accepts any arguments, so every cargo step succeeds
        sandbox
            .cmd()
            .env("CARGO", "true")
            .args(["--no-local", "install"])
            .arg(&dest)
            .assert()
            .success()
            .stdout(predicate::str::contains("Total: "))
            .stdout(predicate::str::is_match(r"Done after \d+ seconds").unwrap());

        assert!(dest.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn install_fails_without_working_cargo() {
        let sandbox = Sandbox::new();

        // `false --version` fails, so the toolchain is reported missing
        sandbox
            .cmd()
            .env("CARGO", "false")
            .args(["--no-local", "install"])
            .arg(sandbox.path("out"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Required CLI not found: cargo"));
    }

    #[test]
    fn config_path() {
        Sandbox::new()
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        Sandbox::new()
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("bin_crates"));
    }

    #[test]
    fn config_init_then_refuses_overwrite() {
        let sandbox = Sandbox::new();
        let config = sandbox.path("init/config.toml");

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(config.is_file());

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("--force"));
    }

    #[test]
    fn local_config_is_discovered_from_workspace() {
        let sandbox = Sandbox::new();
        write(
            &sandbox.workspace().join(".ledgerops.toml"),
            "[cache]\nmax_size_gb = 42\n",
        );

        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("max_size_gb = 42"));
    }

    #[test]
    fn completions_bash() {
        Sandbox::new()
            .cmd()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ledgerops"));
    }

    #[test]
    fn cache_hook_requires_label() {
        let sandbox = Sandbox::new();
        let config = sandbox.write_config(10);

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["--no-local", "cache-hook", "--no-secrets"])
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("Invalid job label"));

        assert!(!sandbox.cache_root().exists());
    }

    #[test]
    fn cache_hook_stdout_is_only_exports() {
        let sandbox = Sandbox::new();
        let config = sandbox.write_config(10);
        write(
            &sandbox.cache_root().join("stable/target/release/ledger"),
            "binary",
        );

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .env("BUILDKITE_LABEL", "stable")
            .args(["--no-local", "cache-hook", "--no-secrets"])
            .assert()
            .success()
            .stdout("export PS4='++'\n")
            .stderr(predicate::str::contains("Cache size: 6 B"));

        let mirrored = sandbox.workspace().join("target/release/ledger");
        assert_eq!(std::fs::read_to_string(mirrored).unwrap(), "binary");
    }

    #[test]
    fn cache_hook_evicts_oversized_cache() {
        let sandbox = Sandbox::new();
        let config = sandbox.write_config(0);
        write(&sandbox.cache_root().join("stable/target/debug/huge"), "x");
        write(&sandbox.workspace().join("target/debug/huge"), "x");

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["--no-local", "cache-hook", "--no-secrets", "--label", "stable"])
            .assert()
            .success()
            .stderr(predicate::str::contains("evicted"));

        assert!(sandbox.cache_root().join("stable/target").is_dir());
        assert!(entries(&sandbox.cache_root().join("stable/target")).is_empty());
        assert!(entries(&sandbox.workspace().join("target")).is_empty());
    }

    #[test]
    fn cache_hook_writes_env_file() {
        let sandbox = Sandbox::new();
        let config = sandbox.write_config(10);
        let env_file = sandbox.path("hook.env");

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["--no-local", "cache-hook", "--no-secrets", "--label", "stable"])
            .arg("--env-file")
            .arg(&env_file)
            .assert()
            .success();

        assert_eq!(
            std::fs::read_to_string(env_file).unwrap(),
            "export PS4='++'\n"
        );
    }

    #[test]
    fn cache_hook_skips_missing_secrets_bundle() {
        let sandbox = Sandbox::new();
        let config = sandbox.write_config(10);

        sandbox
            .cmd()
            .arg("-c")
            .arg(&config)
            .args(["--no-local", "cache-hook", "--label", "stable"])
            .assert()
            .success()
            .stdout("export PS4='++'\n")
            .stderr(predicate::str::contains("No secrets bundle"));
    }
}
