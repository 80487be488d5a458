use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::MeetbridgeConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "meetbridge.toml",
    "meetbridge.yaml",
    "meetbridge.yml",
    "meetbridge.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<MeetbridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./meetbridge.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/meetbridge/meetbridge.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `MeetbridgeConfig::default()` if no file is found or the
/// file fails to parse.
pub fn discover_and_load() -> MeetbridgeConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    MeetbridgeConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            MeetbridgeConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/meetbridge/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "meetbridge").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meetbridge.toml")
}

/// Serialize `config` to TOML and write it to `path`.
pub fn save_config(config: &MeetbridgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| Error::external("serialize config", e))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Apply `MEETBRIDGE_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut MeetbridgeConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply `MEETBRIDGE_*` overrides using a custom lookup.
pub fn apply_env_overrides_with(
    config: &mut MeetbridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("MEETBRIDGE_ENABLE_PREVIEW").and_then(|v| parse_bool(&v)) {
        config.api.enable_preview = v;
    }
    if let Some(v) = lookup("MEETBRIDGE_DEBUG").and_then(|v| parse_bool(&v)) {
        config.debug = v;
    }
    if let Some(v) = lookup("MEETBRIDGE_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = v;
    }
    if let Some(v) = lookup("MEETBRIDGE_CALLBACK_PORT").and_then(|v| v.parse().ok()) {
        config.auth.callback_port = v;
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<MeetbridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("meetbridge.toml");
        std::fs::write(&toml_path, "debug = true\n[metrics]\nmax_events = 50\n").unwrap();
        let cfg = load_config(&toml_path).unwrap();
        assert!(cfg.debug);
        assert_eq!(cfg.metrics.max_events, 50);

        let yaml_path = dir.path().join("meetbridge.yaml");
        std::fs::write(&yaml_path, "server:\n  port: 9999\n").unwrap();
        let cfg = load_config(&yaml_path).unwrap();
        assert_eq!(cfg.server.port, 9999);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meetbridge.ini");
        std::fs::write(&path, "x").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = MeetbridgeConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "MEETBRIDGE_ENABLE_PREVIEW" => Some("yes".into()),
            "MEETBRIDGE_HTTP_PORT" => Some("8080".into()),
            "MEETBRIDGE_DEBUG" => Some("maybe".into()),
            _ => None,
        });
        assert!(cfg.api.enable_preview);
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.debug);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("meetbridge.toml");
        let mut cfg = MeetbridgeConfig::default();
        cfg.health.probe_timeout_secs = 9;
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.health.probe_timeout_secs, 9);
    }
}
