use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::ValueEnum;
use serde::Deserialize;

use crate::controller::configurator::EnumLabelMode;

pub const CONFIG_FILE_NAME: &str = "seqedit.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    pub server_url: String,
    pub enum_label_mode: EnumLabelMode,
    pub validation_debounce: Duration,
    pub event_poll_interval: Duration,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            enum_label_mode: EnumLabelMode::default(),
            validation_debounce: Duration::from_millis(500),
            event_poll_interval: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    enum_label_mode: Option<EnumLabelMode>,
    validation_debounce_ms: Option<u64>,
    event_poll_interval_ms: Option<u64>,
}

/// Defaults, then the first config file found, then `SEQEDIT_*` environment overrides.
pub fn load_startup_config(explicit_path: Option<&Path>) -> anyhow::Result<StartupConfig> {
    let mut config = StartupConfig::default();

    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => candidate_paths().into_iter().find(|path| path.is_file()),
    };
    if let Some(path) = path {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut config, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "loaded configuration file");
    }

    apply_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("seqedit").join(CONFIG_FILE_NAME));
    }
    paths
}

fn apply_file(config: &mut StartupConfig, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileConfig = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        config.server_url = v;
    }
    if let Some(v) = file_cfg.enum_label_mode {
        config.enum_label_mode = v;
    }
    if let Some(v) = file_cfg.validation_debounce_ms {
        config.validation_debounce = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.event_poll_interval_ms {
        config.event_poll_interval = Duration::from_millis(v);
    }
    Ok(())
}

fn apply_env(config: &mut StartupConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SEQEDIT_SERVER_URL") {
        config.server_url = v;
    }

    if let Some(v) = var("SEQEDIT_ENUM_LABEL_MODE") {
        match EnumLabelMode::from_str(&v, true) {
            Ok(mode) => config.enum_label_mode = mode,
            Err(err) => tracing::warn!("ignoring SEQEDIT_ENUM_LABEL_MODE: {err}"),
        }
    }

    if let Some(v) = var("SEQEDIT_VALIDATION_DEBOUNCE_MS") {
        match v.parse::<u64>() {
            Ok(ms) => config.validation_debounce = Duration::from_millis(ms),
            Err(err) => tracing::warn!("ignoring SEQEDIT_VALIDATION_DEBOUNCE_MS: {err}"),
        }
    }

    if let Some(v) = var("SEQEDIT_EVENT_POLL_INTERVAL_MS") {
        match v.parse::<u64>() {
            Ok(ms) => config.event_poll_interval = Duration::from_millis(ms),
            Err(err) => tracing::warn!("ignoring SEQEDIT_EVENT_POLL_INTERVAL_MS: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut config = StartupConfig::default();
        apply_file(
            &mut config,
            r#"
                server_url = "http://ground:9000"
                enum_label_mode = "key-and-label"
                validation_debounce_ms = 250
            "#,
        )
        .expect("apply file");

        assert_eq!(config.server_url, "http://ground:9000");
        assert_eq!(config.enum_label_mode, EnumLabelMode::KeyAndLabel);
        assert_eq!(config.validation_debounce, Duration::from_millis(250));
        assert_eq!(config.event_poll_interval, Duration::from_millis(1000));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut config = StartupConfig::default();
        assert!(apply_file(&mut config, "sever_url = \"typo\"").is_err());
    }

    #[test]
    fn env_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SEQEDIT_SERVER_URL", "https://ops.example:8443"),
            ("SEQEDIT_ENUM_LABEL_MODE", "KEY-AND-LABEL"),
            ("SEQEDIT_VALIDATION_DEBOUNCE_MS", "soon"),
        ]);
        let mut config = StartupConfig::default();
        apply_env(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.server_url, "https://ops.example:8443");
        assert_eq!(config.enum_label_mode, EnumLabelMode::KeyAndLabel);
        assert_eq!(config.validation_debounce, Duration::from_millis(500));
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let temp_root = env::temp_dir().join(format!("seqedit_config_test_{suffix}"));
        fs::create_dir_all(&temp_root).expect("temp root");
        let path = temp_root.join(CONFIG_FILE_NAME);
        fs::write(&path, "event_poll_interval_ms = 2500\n").expect("write config");

        let config = load_startup_config(Some(&path)).expect("load config");
        assert_eq!(config.event_poll_interval, Duration::from_millis(2500));

        fs::remove_dir_all(temp_root).expect("cleanup");
    }

    #[test]
    fn missing_explicit_config_path_is_an_error() {
        let path = env::temp_dir().join("seqedit_config_test_missing/seqedit.toml");
        assert!(load_startup_config(Some(&path)).is_err());
    }
}
