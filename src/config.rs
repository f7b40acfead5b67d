//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ytree/ytree.toml`
//! 3. Local config: a file passed explicitly by the caller
//! 4. Environment variables: `YTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::DEFAULT_MAX_INCLUDE_DEPTH;
use crate::application::ApplicationError;
use crate::domain::{ExpandOptions, Syntax, DEFAULT_INCLUDE_TAG, DEFAULT_MARKER_KEY, MAX_LOOP_COUNT};

/// Placeholder expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpandConfig {
    /// Upper bound on expansion passes
    pub max_passes: usize,
    /// Leave `\$name` untouched
    pub skip_escaped: bool,
    /// Replacement for unset environment variables
    pub default: Option<String>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            max_passes: MAX_LOOP_COUNT,
            skip_escaped: false,
            default: None,
        }
    }
}

/// Settings used when writing files back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Block style when true, flow style otherwise
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawExpandConfig {
    pub max_passes: Option<usize>,
    pub skip_escaped: Option<bool>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStoreConfig {
    pub pretty: Option<bool>,
}

/// Raw settings for intermediate parsing; `None` means "inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub include_tag: Option<String>,
    pub marker_key: Option<String>,
    pub max_include_depth: Option<usize>,
    pub expand: RawExpandConfig,
    pub store: RawStoreConfig,
}

/// Unified configuration for ytree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Tag marking an include directive
    pub include_tag: String,
    /// Reserved key holding include provenance
    pub marker_key: String,
    /// Maximum include nesting
    pub max_include_depth: usize,
    pub expand: ExpandConfig,
    pub store: StoreConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_tag: DEFAULT_INCLUDE_TAG.to_string(),
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            expand: ExpandConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the XDG config directory for ytree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ytree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ytree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Reserved spellings for the include machinery.
    pub fn syntax(&self) -> Syntax {
        Syntax {
            include_tag: self.include_tag.clone(),
            marker_key: self.marker_key.clone(),
        }
    }

    pub fn expand_options(&self) -> ExpandOptions {
        ExpandOptions {
            default: self.expand.default.clone(),
            skip_escaped: self.expand.skip_escaped,
            max_passes: self.expand.max_passes,
        }
    }

    /// Overlay values that are set in `raw`.
    fn merge_with(&self, raw: &RawSettings) -> Self {
        Self {
            include_tag: raw
                .include_tag
                .clone()
                .unwrap_or_else(|| self.include_tag.clone()),
            marker_key: raw
                .marker_key
                .clone()
                .unwrap_or_else(|| self.marker_key.clone()),
            max_include_depth: raw.max_include_depth.unwrap_or(self.max_include_depth),
            expand: ExpandConfig {
                max_passes: raw.expand.max_passes.unwrap_or(self.expand.max_passes),
                skip_escaped: raw.expand.skip_escaped.unwrap_or(self.expand.skip_escaped),
                default: raw
                    .expand
                    .default
                    .clone()
                    .or_else(|| self.expand.default.clone()),
            },
            store: StoreConfig {
                pretty: raw.store.pretty.unwrap_or(self.store.pretty),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/ytree/ytree.toml`
    /// 3. Local config: `local`, must exist when given
    /// 4. Environment variables: `YTREE_*` prefix, `__` separates sections
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(local_path) = local {
            let raw = load_raw_settings(local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply YTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("YTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;
        Self::apply_config(settings, &config)
    }

    fn apply_config(mut settings: Self, config: &Config) -> Result<Self, ApplicationError> {
        if let Ok(val) = config.get_string("include_tag") {
            settings.include_tag = val;
        }
        if let Ok(val) = config.get_string("marker_key") {
            settings.marker_key = val;
        }
        if let Ok(val) = config.get_int("max_include_depth") {
            settings.max_include_depth = to_usize("max_include_depth", val)?;
        }
        if let Ok(val) = config.get_int("expand.max_passes") {
            settings.expand.max_passes = to_usize("expand.max_passes", val)?;
        }
        if let Ok(val) = config.get_bool("expand.skip_escaped") {
            settings.expand.skip_escaped = val;
        }
        if let Ok(val) = config.get_string("expand.default") {
            settings.expand.default = Some(val);
        }
        if let Ok(val) = config.get_bool("store.pretty") {
            settings.store.pretty = val;
        }
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if !self.include_tag.starts_with('!') || self.include_tag.len() < 2 {
            return Err(ApplicationError::Config {
                message: format!("include_tag must look like '!name', got '{}'", self.include_tag),
            });
        }
        if self.max_include_depth == 0 {
            return Err(ApplicationError::Config {
                message: "max_include_depth must be at least 1".to_string(),
            });
        }
        if self.expand.max_passes == 0 {
            return Err(ApplicationError::Config {
                message: "expand.max_passes must be at least 1".to_string(),
            });
        }
        if self.marker_key.is_empty() || self.marker_key.contains('.') {
            return Err(ApplicationError::Config {
                message: format!(
                    "marker_key must be non-empty and contain no '.', got '{}'",
                    self.marker_key
                ),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ytree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ytree/ytree.toml
#   Local:  file passed with --config
#   Env:    YTREE_* environment variables, e.g. YTREE_EXPAND__MAX_PASSES=10

# Tag that marks an include directive
# include_tag = "!include"

# Reserved mapping key recording where an included subtree came from
# marker_key = "__include__"

# Maximum include nesting
# max_include_depth = 64

[expand]
# Give up when placeholders still change after this many passes
# max_passes = 30

# Leave \$NAME untouched
# skip_escaped = false

# Replacement for unset environment variables (unset: keep the placeholder)
# default = ""

[store]
# Block style (true) or flow style (false) when writing files
# pretty = true
"#
        .to_string()
    }
}

fn to_usize(key: &str, val: i64) -> Result<usize, ApplicationError> {
    usize::try_from(val).map_err(|_| ApplicationError::Config {
        message: format!("{key} must be a non-negative integer, got {val}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn given_defaults_when_building_syntax_then_uses_reserved_spellings() {
        let syntax = Settings::default().syntax();
        assert_eq!(syntax.include_tag, "!include");
        assert_eq!(syntax.marker_key, "__include__");
    }

    #[test]
    fn given_partial_raw_settings_when_merging_then_unset_fields_inherit() {
        let raw: RawSettings = toml::from_str("[expand]\nmax_passes = 5\n").unwrap();
        let merged = Settings::default().merge_with(&raw);
        assert_eq!(merged.expand.max_passes, 5);
        assert!(merged.store.pretty);
        assert_eq!(merged.include_tag, "!include");
    }

    #[test]
    fn given_config_source_when_applying_then_overrides_nested_values() {
        let config = Config::builder()
            .set_override("expand.skip_escaped", true)
            .unwrap()
            .set_override("store.pretty", false)
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::apply_config(Settings::default(), &config).unwrap();
        assert!(settings.expand.skip_escaped);
        assert!(!settings.store.pretty);
    }

    #[test]
    fn given_negative_depth_when_applying_then_config_error() {
        let config = Config::builder()
            .set_override("max_include_depth", -1i64)
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            Settings::apply_config(Settings::default(), &config),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_marker_key_with_dot_when_validating_then_config_error() {
        let settings = Settings {
            marker_key: "a.b".into(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[rstest]
    #[case::no_passes(30, 0)]
    #[case::no_depth(0, 30)]
    fn given_zero_limit_when_validating_then_config_error(
        #[case] depth: usize,
        #[case] passes: usize,
    ) {
        let mut settings = Settings {
            max_include_depth: depth,
            ..Settings::default()
        };
        settings.expand.max_passes = passes;
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_settings_when_rendering_toml_then_contains_sections() {
        let text = Settings::default().to_toml().unwrap();
        assert!(text.contains("[expand]"));
        assert!(text.contains("[store]"));
    }
}
