//! Configuration management for `splitticket`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`ST_*`)
//! 3. Project config (.splitticket/config.yaml)
//! 4. User config (~/.config/splitticket/config.yaml)
//! 5. Defaults
//!
//! Keys that decide how the database is opened (`db`, `actor`, `json`,
//! `lock-timeout`) are startup keys; everything else is a runtime key read
//! by individual commands.

use crate::error::{Result, SplitError};
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the workspace directory created by `st init`.
pub const WORKSPACE_DIR_NAME: &str = ".splitticket";
/// Database filename inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "tickets.db";
/// Config filename inside the workspace directory.
pub const CONFIG_FILENAME: &str = "config.yaml";
/// Busy timeout used when none is configured.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Environment variable naming the workspace directory explicitly.
const WORKSPACE_ENV: &str = "SPLITTICKET_DIR";
/// Prefix of environment variables mapped onto config keys.
const ENV_PREFIX: &str = "ST_";

/// Resolved paths for this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// `None` when the database was given explicitly and no workspace exists.
    pub workspace_dir: Option<PathBuf>,
    pub db_path: PathBuf,
}

impl ConfigPaths {
    /// Resolve the database path: a configured `db` wins, otherwise the
    /// database inside the workspace.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if there is neither a `db` setting nor a
    /// workspace.
    pub fn resolve(workspace_dir: Option<&Path>, layer: &ConfigLayer) -> Result<Self> {
        let db_path = match (db_override_from_layer(layer), workspace_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join(DEFAULT_DB_FILENAME),
            (None, None) => return Err(SplitError::NotInitialized),
        };

        Ok(Self {
            workspace_dir: workspace_dir.map(Path::to_path_buf),
            db_path,
        })
    }
}

/// Discover the active `.splitticket` directory.
///
/// Honors `SPLITTICKET_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no workspace is found, or an I/O error if
/// the CWD cannot be read.
pub fn discover_workspace_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_override = env::var(WORKSPACE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_workspace_dir_with_env(start, env_override.as_deref())
}

fn discover_workspace_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(WORKSPACE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(SplitError::NotInitialized)
}

/// Open storage for the current workspace with every config layer applied.
///
/// An explicit `db` (CLI, env or user config) works without a workspace.
///
/// # Errors
///
/// Returns `NotInitialized` when no database can be located, a config
/// error if a config file cannot be parsed, or `StoreUnavailable` if the
/// database cannot be opened.
pub fn open_storage(cli: &CliOverrides) -> Result<(SqliteStorage, ConfigLayer, ConfigPaths)> {
    let workspace_dir = match discover_workspace_dir(None) {
        Ok(dir) => Some(dir),
        Err(SplitError::NotInitialized) => None,
        Err(err) => return Err(err),
    };

    let layer = load_config(workspace_dir.as_deref(), cli)?;
    let paths = ConfigPaths::resolve(workspace_dir.as_deref(), &layer)?;
    let storage =
        SqliteStorage::open_with_timeout(&paths.db_path, Some(lock_timeout_from_layer(&layer)))?;
    Ok((storage, layer, paths))
}

/// A configuration layer split into startup and runtime keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub startup: HashMap<String, String>,
    pub runtime: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.startup {
            self.startup.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.runtime {
            self.runtime.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|e| {
            SplitError::Config(format!("{}: {e}", path.display()))
        })?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `ST_*` variables: `ST_LOCK_TIMEOUT` sets
    /// `lock-timeout`, `ST_DEFAULT_MILESTONE` sets `default_milestone`.
    #[must_use]
    pub fn from_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();

        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let normalized = stripped.to_lowercase();
                if normalized.is_empty() {
                    continue;
                }
                insert_key_value(&mut layer, &normalized, value);
            }
        }

        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: Option<bool>,
    pub lock_timeout: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            insert_key_value(&mut layer, "db", path.to_string_lossy().to_string());
        }
        if let Some(actor) = &self.actor {
            insert_key_value(&mut layer, "actor", actor.clone());
        }
        if let Some(json) = self.json {
            insert_key_value(&mut layer, "json", json.to_string());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            insert_key_value(&mut layer, "lock-timeout", lock_timeout.to_string());
        }

        layer
    }
}

/// Load project config (.splitticket/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(workspace_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&workspace_dir.join(CONFIG_FILENAME))
}

/// Load user config (~/.config/splitticket/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("splitticket")
        .join(CONFIG_FILENAME);
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    insert_key_value(
        &mut layer,
        "lock-timeout",
        DEFAULT_LOCK_TIMEOUT_MS.to_string(),
    );
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(workspace_dir: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = match workspace_dir {
        Some(dir) => load_project_config(dir)?,
        None => ConfigLayer::default(),
    };
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Resolve actor from a merged config layer.
#[must_use]
pub fn actor_from_layer(layer: &ConfigLayer) -> Option<String> {
    get_startup_value(layer, &["actor"])
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolve actor with fallback to USER and a safe default.
#[must_use]
pub fn resolve_actor(layer: &ConfigLayer) -> String {
    actor_from_layer(layer)
        .or_else(|| {
            std::env::var("USER")
                .ok()
                .map(|value| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Milestone given to split drafts that do not name one.
#[must_use]
pub fn default_milestone_from_layer(layer: &ConfigLayer) -> Option<String> {
    non_empty(get_value(layer, &["default_milestone", "default-milestone"]))
}

/// Component given to split drafts that do not name one.
#[must_use]
pub fn default_component_from_layer(layer: &ConfigLayer) -> Option<String> {
    non_empty(get_value(layer, &["default_component", "default-component"]))
}

/// Busy timeout in milliseconds; unparsable values fall back to the default.
#[must_use]
pub fn lock_timeout_from_layer(layer: &ConfigLayer) -> u64 {
    get_startup_value(layer, &["lock-timeout"])
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS)
}

/// Determine if a key is a startup key.
#[must_use]
pub fn is_startup_key(key: &str) -> bool {
    matches!(
        normalize_key(key).as_str(),
        "db" | "database" | "actor" | "json" | "lock-timeout"
    )
}

/// Template written to `config.yaml` by `st init`.
#[must_use]
pub fn config_template() -> &'static str {
    "# splitticket configuration\n\
     #\n\
     # actor: alice\n\
     # lock-timeout: 30000\n\
     # default_milestone: \"1.0\"\n\
     # default_component: core\n"
}

fn insert_key_value(layer: &mut ConfigLayer, key: &str, value: String) {
    if is_startup_key(key) {
        layer.startup.insert(normalize_key(key), value);
    } else {
        layer.runtime.insert(key.to_string(), value);
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn get_startup_value<'a>(layer: &'a ConfigLayer, keys: &[&str]) -> Option<&'a String> {
    keys.iter()
        .find_map(|key| layer.startup.get(&normalize_key(key)))
}

fn get_value<'a>(layer: &'a ConfigLayer, keys: &[&str]) -> Option<&'a String> {
    keys.iter().find_map(|key| layer.runtime.get(*key))
}

fn db_override_from_layer(layer: &ConfigLayer) -> Option<PathBuf> {
    get_startup_value(layer, &["db", "database"]).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    })
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        insert_key_value(&mut layer, &key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
