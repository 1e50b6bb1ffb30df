//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, WarblerConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/warbler/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("warbler/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("warbler.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file as a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base` key by key; nested tables merge recursively,
/// every other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Deserialize a merged table; sections and keys it lacks take their defaults.
pub fn config_from_table(table: toml::Table, origin: &Path) -> Result<WarblerConfig, ConfigError> {
    let mut config: WarblerConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    let paths = &mut config.paths;
    for path in [
        &mut paths.dataset_dir,
        &mut paths.encoded_dir,
        &mut paths.corpus_file,
        &mut paths.mapping_file,
        &mut paths.model_file,
        &mut paths.output_file,
    ] {
        let expanded = expand_path(&path.to_string_lossy());
        *path = expanded;
    }

    Ok(config)
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut WarblerConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |name| env::var(name).ok())
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_from<F>(
    config: &mut WarblerConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("WARBLER_DATASET_DIR") {
        config.paths.dataset_dir = expand_path(&v);
        sources.env_overrides.push("WARBLER_DATASET_DIR".to_string());
    }
    if let Some(v) = lookup("WARBLER_OUTPUT_FILE") {
        config.paths.output_file = expand_path(&v);
        sources.env_overrides.push("WARBLER_OUTPUT_FILE".to_string());
    }

    if let Some(v) = lookup("WARBLER_SEQUENCE_LENGTH") {
        config.encoding.sequence_length = parse_env("WARBLER_SEQUENCE_LENGTH", &v)?;
        sources.env_overrides.push("WARBLER_SEQUENCE_LENGTH".to_string());
    }

    if let Some(v) = lookup("WARBLER_TEMPERATURE") {
        config.sampling.temperature = parse_env("WARBLER_TEMPERATURE", &v)?;
        sources.env_overrides.push("WARBLER_TEMPERATURE".to_string());
    }
    if let Some(v) = lookup("WARBLER_NUM_STEPS") {
        config.sampling.num_steps = parse_env("WARBLER_NUM_STEPS", &v)?;
        sources.env_overrides.push("WARBLER_NUM_STEPS".to_string());
    }

    if let Some(v) = lookup("WARBLER_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("WARBLER_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        field: name.to_string(),
        message: format!("cannot parse '{}'", value),
    })
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        let (var_name, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
        if let Ok(var_value) = env::var(var_name) {
            let base = PathBuf::from(var_value);
            return if rest.is_empty() { base } else { base.join(rest) };
        }
    }

    PathBuf::from(path)
}
