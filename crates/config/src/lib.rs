//! Configuration loading, env substitution, credential-source resolution and
//! semantic validation.
//!
//! Config files: `meetbridge.toml`, `meetbridge.yaml`, or `meetbridge.json`
//! Searched in `./` then `~/.config/meetbridge/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all string values.

pub mod credentials;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    credentials::{CredentialSource, resolve_credential_source, resolve_credential_source_with},
    error::{Error, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, discover_and_load,
        find_or_default_config_path, load_config, save_config,
    },
    schema::{
        ApiConfig, AuthConfig, HealthConfig, MeetbridgeConfig, MetricsConfig, QuotaConfig,
        ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
