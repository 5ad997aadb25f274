//! Configuration file support for docbook2md CLI
//!
//! Loads settings from `_docbook2md.toml` configuration file.

use anyhow::{Context, Result};
use docbook2md_core::ConverterOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_docbook2md.toml";

/// Schema file referenced by the `#:schema` directive of generated configs
pub const SCHEMA_FILE_NAME: &str = "docbook2md.schema.json";

/// Output file extension used when nothing else is configured
pub const DEFAULT_EXTENSION: &str = "md";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Output configuration
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
    /// Generated heading and label texts
    #[serde(skip_serializing_if = "LabelsConfig::is_empty")]
    pub labels: LabelsConfig,
    /// Code block configuration
    #[serde(skip_serializing_if = "CodeConfig::is_empty")]
    pub code: CodeConfig,
}

/// Output configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Extension of generated files (default: "md")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Append the unknown tag table to each document (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_tag_table: Option<bool>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.extension.is_none() && self.unknown_tag_table.is_none()
    }
}

/// Generated heading and label texts
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct LabelsConfig {
    /// Function synopsis heading, followed by the capitalized role (default: "Syntax")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    /// Heading of examples without a title (default: "Example")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// Key of package lines (default: "Package")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl LabelsConfig {
    fn is_empty(&self) -> bool {
        self.synopsis.is_none() && self.example.is_none() && self.package.is_none()
    }
}

/// Code block configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct CodeConfig {
    /// Fence language of program listings without a role (default: "text")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

impl CodeConfig {
    fn is_empty(&self) -> bool {
        self.default_language.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_docbook2md.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema ./{}\n\n{}", SCHEMA_FILE_NAME, toml_content))
    }

    /// Create a sample configuration with every default spelled out, for `init`
    pub fn sample() -> Self {
        let defaults = ConverterOptions::default();
        Config {
            output: OutputConfig {
                extension: Some(DEFAULT_EXTENSION.to_string()),
                unknown_tag_table: Some(defaults.unknown_tag_table),
            },
            labels: LabelsConfig {
                synopsis: Some(defaults.synopsis_label),
                example: Some(defaults.example_caption),
                package: Some(defaults.package_label),
            },
            code: CodeConfig {
                default_language: Some(defaults.default_code_language),
            },
        }
    }

    /// Output file extension, without a leading dot
    pub fn extension(&self) -> &str {
        self.output
            .extension
            .as_deref()
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Converter options with unset values taken from the library defaults
    pub fn converter_options(&self) -> ConverterOptions {
        let defaults = ConverterOptions::default();
        ConverterOptions {
            synopsis_label: self.labels.synopsis.clone().unwrap_or(defaults.synopsis_label),
            example_caption: self.labels.example.clone().unwrap_or(defaults.example_caption),
            package_label: self.labels.package.clone().unwrap_or(defaults.package_label),
            default_code_language: self
                .code
                .default_language
                .clone()
                .unwrap_or(defaults.default_code_language),
            unknown_tag_table: self
                .output
                .unknown_tag_table
                .unwrap_or(defaults.unknown_tag_table),
        }
    }
}
