// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pulsarnet_app::BackupProtocol;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub backup: Backup,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            backup: Backup::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
    pub max_backup_size: Option<i64>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            db_path: None,
            max_backup_size: Some(pulsarnet_db::MAX_BACKUP_SIZE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub show_dashboard: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            show_dashboard: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backup {
    pub protocol: Option<String>,
    pub simulate: Option<bool>,
    pub source_dir: Option<String>,
}

impl Default for Backup {
    fn default() -> Self {
        Self {
            protocol: Some("tftp".to_owned()),
            simulate: Some(true),
            source_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PULSARNET_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PULSARNET_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(pulsarnet_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and place values under [storage], [ui], [backup], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            pulsarnet_db::validate_db_path(db_path)?;
        }

        if let Some(max_size) = self.storage.max_backup_size
            && max_size <= 0
        {
            bail!(
                "storage.max_backup_size in {} must be positive, got {}",
                path.display(),
                max_size
            );
        }

        if let Some(protocol) = &self.backup.protocol
            && BackupProtocol::parse(protocol).is_none()
        {
            bail!(
                "backup.protocol in {} must be one of tftp, scp, sftp, ftp; got {protocol:?}",
                path.display()
            );
        }

        if !self.backup_simulate() && self.backup.source_dir.is_none() {
            bail!(
                "backup.source_dir in {} must be set when backup.simulate = false",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => pulsarnet_db::default_db_path(),
        }
    }

    pub fn show_dashboard(&self) -> bool {
        self.ui.show_dashboard.unwrap_or(true)
    }

    pub fn max_backup_size(&self) -> i64 {
        self.storage
            .max_backup_size
            .unwrap_or(pulsarnet_db::MAX_BACKUP_SIZE)
    }

    pub fn backup_protocol(&self) -> BackupProtocol {
        self.backup
            .protocol
            .as_deref()
            .and_then(BackupProtocol::parse)
            .unwrap_or(BackupProtocol::Tftp)
    }

    pub fn backup_simulate(&self) -> bool {
        self.backup.simulate.unwrap_or(true)
    }

    pub fn backup_source_dir(&self) -> Option<PathBuf> {
        self.backup.source_dir.as_deref().map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(PathBuf::from)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pulsarnet config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/pulsarnet/pulsarnet.db)\n# db_path = \"/absolute/path/to/pulsarnet.db\"\nmax_backup_size = {}\n\n[ui]\nshow_dashboard = true\n\n[backup]\nprotocol = \"tftp\"\n# With simulate = false, configs are read from source_dir/<device>.cfg\nsimulate = true\n# source_dir = \"/var/lib/pulsarnet/staged\"\n\n[logging]\nlevel = \"info\"\n# file = \"/var/log/pulsarnet.log\"\n",
            path.display(),
            pulsarnet_db::MAX_BACKUP_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use pulsarnet_app::BackupProtocol;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(config.show_dashboard());
        assert!(config.backup_simulate());
        assert_eq!(config.backup_protocol(), BackupProtocol::Tftp);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[backup]\nprotocol = \"scp\"\n")?;

        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage], [ui], [backup], and [logging]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\nmax_backup_size = 1024\n[ui]\nshow_dashboard = false\n[backup]\nprotocol = \"sftp\"\n[logging]\nlevel = \"debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.max_backup_size(), 1024);
        assert!(!config.show_dashboard());
        assert_eq!(config.backup_protocol(), BackupProtocol::Sftp);
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 7\n")?;
        let error = Config::load(&path).expect_err("v7 config should fail");
        assert!(error.to_string().contains("unsupported config version 7"));
        Ok(())
    }

    #[test]
    fn invalid_protocol_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backup]\nprotocol = \"rsync\"\n")?;
        let error = Config::load(&path).expect_err("bad protocol should fail");
        assert!(error.to_string().contains("tftp, scp, sftp, ftp"));
        Ok(())
    }

    #[test]
    fn non_simulated_backup_requires_source_dir() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backup]\nsimulate = false\n")?;
        let error = Config::load(&path).expect_err("missing source_dir should fail");
        assert!(error.to_string().contains("source_dir"));

        let (_temp, path) = write_config(
            "version = 1\n[backup]\nsimulate = false\nsource_dir = \"/tmp/staged\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.backup_source_dir(), Some(PathBuf::from("/tmp/staged")));
        Ok(())
    }

    #[test]
    fn storage_limits_are_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[storage]\nmax_backup_size = 0\n")?;
        let error = Config::load(&path).expect_err("invalid storage values should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"https://evil.example/pulsarnet.db\"\n",
        )?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        let message = error.to_string();
        assert!(
            message.contains("looks like a URI") || message.contains("filesystem path"),
            "unexpected message: {message}"
        );
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PULSARNET_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PULSARNET_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("PULSARNET_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("config.toml"));
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PULSARNET_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PULSARNET_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PULSARNET_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PULSARNET_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[storage]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[backup]"));
        assert!(example.contains("[logging]"));
        Ok(())
    }
}
