//! Configuration
//!
//! Layered settings, mirroring the groups an editor sends in
//! `workspace/didChangeConfiguration`:
//! - Default values
//! - TOML file (`.luasense/settings.toml`, searched upwards from the cwd)
//! - Environment variable overrides
//! - An editor payload (JSON), merged over the defaults
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `LUASENSE_` and use double
//! underscores to separate nested levels. Single underscores inside a level
//! are ignored, so either spelling works:
//! - `LUASENSE_STATIC_CHECK__ON_SAVE=false` sets `staticCheck.onSave`
//! - `LUASENSE_PARSEROPTIONS__LANGUAGEVERSION=5.3` sets
//!   `parserOptions.languageVersion`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parsing::ParserOptions;

const CONFIG_DIR: &str = ".luasense";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "LUASENSE_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error("Editor settings payload must be a JSON object")]
    NotAnObject,

    #[error("Failed to save settings to '{path}': {reason}")]
    Save { path: PathBuf, reason: String },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub static_check: StaticCheckConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub parser_options: ParserConfig,

    #[serde(default)]
    pub symbol_display: SymbolDisplayConfig,

    /// Accepted for compatibility; no formatter is provided.
    #[serde(default)]
    pub formatting: FormattingConfig,

    #[serde(default)]
    pub doc_gen: DocGenConfig,

    /// Accepted for compatibility; no metrics are computed.
    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External static checker (luacheck) settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaticCheckConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default = "default_true")]
    pub on_save: bool,

    #[serde(default = "default_true")]
    pub on_typing: bool,

    /// Checker executable; `luacheck` from `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_path: Option<String>,

    #[serde(default = "default_std")]
    pub std: Vec<String>,

    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default = "default_jobs")]
    pub jobs: u32,

    /// Documents larger than this many KB are not checked.
    #[serde(default = "default_file_size_limit")]
    pub file_size_limit: u64,

    #[serde(default = "default_max_problems")]
    pub max_problems: usize,

    #[serde(default)]
    pub config_file_path: String,

    /// Keep diagnostics after a document is closed.
    #[serde(default = "default_true")]
    pub keep_after_closed: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Glob filters: plain patterns exclude, `!pattern` whitelists.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Extra module roots, searched along with the workspace root.
    #[serde(default)]
    pub external_paths: Vec<PathBuf>,

    #[serde(default)]
    pub follow_links: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    #[serde(default = "default_language_version")]
    pub language_version: String,

    /// Assignments to undeclared names inside functions define them.
    #[serde(default)]
    pub allow_defined: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDisplayConfig {
    #[serde(default = "default_true")]
    pub show_function_global_only: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormattingConfig {
    #[serde(default = "default_line_width")]
    pub line_width: u32,

    #[serde(default = "default_indent_count")]
    pub indent_count: u32,

    #[serde(default)]
    pub quote_style: QuoteStyle,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocGenConfig {
    #[serde(default = "default_true")]
    pub author_in_function_level: bool,

    #[serde(default)]
    pub author_name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enable: bool,

    #[serde(default = "default_logical_line_max")]
    pub logical_line_max: u32,

    #[serde(default = "default_physical_line_max")]
    pub physical_line_max: u32,

    #[serde(default = "default_cyclomatic_max")]
    pub cyclomatic_max: u32,

    #[serde(default = "default_maintainability_min")]
    pub maintainability_min: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `luasense::checker = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}
fn default_std() -> Vec<String> {
    vec!["lua51".to_string(), "busted".to_string()]
}
fn default_jobs() -> u32 {
    1
}
fn default_file_size_limit() -> u64 {
    100
}
fn default_max_problems() -> usize {
    250
}
fn default_language_version() -> String {
    "5.1".to_string()
}
fn default_line_width() -> u32 {
    120
}
fn default_indent_count() -> u32 {
    4
}
fn default_logical_line_max() -> u32 {
    50
}
fn default_physical_line_max() -> u32 {
    80
}
fn default_cyclomatic_max() -> u32 {
    10
}
fn default_maintainability_min() -> f64 {
    60.0
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for StaticCheckConfig {
    fn default() -> Self {
        Self {
            enable: true,
            on_save: true,
            on_typing: true,
            exec_path: None,
            std: default_std(),
            ignore: Vec::new(),
            jobs: default_jobs(),
            file_size_limit: default_file_size_limit(),
            max_problems: default_max_problems(),
            config_file_path: String::new(),
            keep_after_closed: true,
        }
    }
}

impl StaticCheckConfig {
    pub fn executable(&self) -> &str {
        self.exec_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .unwrap_or("luacheck")
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            language_version: default_language_version(),
            allow_defined: false,
        }
    }
}

impl Default for SymbolDisplayConfig {
    fn default() -> Self {
        Self {
            show_function_global_only: true,
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            line_width: default_line_width(),
            indent_count: default_indent_count(),
            quote_style: QuoteStyle::Single,
        }
    }
}

impl Default for DocGenConfig {
    fn default() -> Self {
        Self {
            author_in_function_level: true,
            author_name: String::new(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            logical_line_max: default_logical_line_max(),
            physical_line_max: default_physical_line_max(),
            cyclomatic_max: default_cyclomatic_max(),
            maintainability_min: default_maintainability_min(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

/// Field names as they appear in the camelCase schema, used to map
/// case-folded environment keys back onto them.
const FIELD_NAMES: &[&str] = &[
    "staticCheck",
    "onSave",
    "onTyping",
    "execPath",
    "configFilePath",
    "keepAfterClosed",
    "fileSizeLimit",
    "maxProblems",
    "externalPaths",
    "followLinks",
    "parserOptions",
    "languageVersion",
    "allowDefined",
    "symbolDisplay",
    "showFunctionGlobalOnly",
    "lineWidth",
    "indentCount",
    "quoteStyle",
    "docGen",
    "authorInFunctionLevel",
    "authorName",
    "logicalLineMax",
    "physicalLineMax",
    "cyclomaticMax",
    "maintainabilityMin",
];

/// `static_check.on_save` -> `staticCheck.onSave`
fn env_key_path(key: &str) -> String {
    key.to_lowercase()
        .split("__")
        .map(|segment| {
            let folded: String = segment.chars().filter(|c| *c != '_').collect();
            FIELD_NAMES
                .iter()
                .find(|name| name.to_lowercase() == folded)
                .map(|name| name.to_string())
                .unwrap_or_else(|| segment.to_string())
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Drop `null` entries so they fall back to defaults instead of clearing them.
fn strip_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| env_key_path(key.as_str()).into()))
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Settings from an editor `didChangeConfiguration` payload. The payload
    /// may be the settings object itself or wrap it under `luasense`.
    pub fn from_editor_payload(payload: serde_json::Value) -> Result<Self, ConfigError> {
        let payload = match payload {
            serde_json::Value::Object(mut map) => match map.remove("luasense") {
                Some(inner @ serde_json::Value::Object(_)) => inner,
                Some(_) => return Err(ConfigError::NotAnObject),
                None => serde_json::Value::Object(map),
            },
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            _ => return Err(ConfigError::NotAnObject),
        };

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Serialized::defaults(strip_nulls(payload)))
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Find `.luasense/settings.toml` searching from the current directory up
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// The directory containing `.luasense`, if any
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let save_error = |reason: String| ConfigError::Save {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_error(e.to_string()))?;
        }
        let toml_string = toml::to_string_pretty(self).map_err(|e| save_error(e.to_string()))?;
        std::fs::write(path, toml_string).map_err(|e| save_error(e.to_string()))
    }

    /// Options for the parser and scope builder
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions::from_settings(
            &self.parser_options.language_version,
            self.parser_options.allow_defined,
        )
    }

    /// Module search roots: external paths first, then the workspace root
    pub fn search_roots(&self, workspace_root: Option<&Path>) -> Vec<PathBuf> {
        let mut roots = self.search.external_paths.clone();
        if let Some(root) = workspace_root {
            roots.push(root.to_path_buf());
        }
        roots
    }
}
