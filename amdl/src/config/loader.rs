use std::path::{Path, PathBuf};

use tracing::info;

use super::AppConfig;
use crate::utils::fs;
use crate::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "AMDL_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let cfg = load_file(&path)?;
    load_with_env(cfg, |key| std::env::var(key).ok())
}

fn load_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)
            .map_err(|e| Error::config(format!("failed to render default config: {e}")))?;
        fs::ensure_parent_dir_sync(path)?;
        std::fs::write(path, toml)?;
        info!(path = %path.display(), "Created default config");
        return Ok(default_cfg);
    }

    let data = std::fs::read_to_string(path)?;
    toml::from_str(&data)
        .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply overrides from `lookup` and validate.
///
/// Supported keys:
/// - `API_BIND_ADDRESS`, `API_PORT`
/// - `AUTHORIZATION_TOKEN`, `MEDIA_USER_TOKEN`
/// - `AMDL_WORKERS`, `AMDL_LOG_DIR`
pub fn load_with_env(
    mut cfg: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(bind_address) = non_empty("API_BIND_ADDRESS") {
        cfg.server.bind_address = bind_address;
    }
    if let Some(port) = non_empty("API_PORT") {
        cfg.server.port = port
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("API_PORT is not a valid port: {port}")))?;
    }
    if let Some(token) = non_empty("AUTHORIZATION_TOKEN") {
        cfg.catalog.authorization_token = token;
    }
    if let Some(token) = non_empty("MEDIA_USER_TOKEN") {
        cfg.catalog.media_user_token = token;
    }
    if let Some(workers) = non_empty("AMDL_WORKERS") {
        cfg.engine.workers = workers
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("AMDL_WORKERS is not a number: {workers}")))?;
    }
    if let Some(log_dir) = non_empty("AMDL_LOG_DIR") {
        cfg.logging.log_dir = PathBuf::from(log_dir);
    }

    cfg.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = load_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.engine.workers, 2);

        let reloaded = load_file(&path).unwrap();
        assert_eq!(reloaded.engine.queue_capacity, cfg.engine.queue_capacity);
    }

    #[test]
    fn test_load_file_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "engine = [").unwrap();
        assert!(matches!(load_file(&path), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = load_with_env(
            AppConfig::default(),
            env(&[
                ("API_PORT", "9000"),
                ("AUTHORIZATION_TOKEN", "tok"),
                ("AMDL_WORKERS", "3"),
                ("API_BIND_ADDRESS", "  "),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.catalog.authorization_token, "tok");
        assert_eq!(cfg.engine.workers, 3);
    }

    #[test]
    fn test_env_invalid_port() {
        let err = load_with_env(AppConfig::default(), env(&[("API_PORT", "http")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
