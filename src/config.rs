use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::{ColorClass, GraphOptions};

/// Output formats the renderers can produce.
pub const OUTPUT_FORMATS: &[&str] = &["dot", "json", "pdf", "svg", "png"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Where the TEI records come from
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// A TEI file, or a directory searched recursively for `.xml` files.
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

/// Diagram output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// One of `OUTPUT_FORMATS`.
    #[serde(default = "default_output_format")]
    pub format: String,
    /// Graphviz executable used for pdf/svg/png.
    #[serde(default = "default_graphviz_bin")]
    pub graphviz_bin: String,
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: default_output_format(),
            graphviz_bin: default_graphviz_bin(),
            file_suffix: default_file_suffix(),
        }
    }
}

/// Graph construction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_include_partners")]
    pub include_partners: bool,
    /// Anchors to draw; empty means every person.
    #[serde(default)]
    pub anchors: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            include_partners: default_include_partners(),
            anchors: Vec::new(),
        }
    }
}

/// Node fill colours (Graphviz colour names or `#rrggbb`)
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_anchor_color")]
    pub anchor: String,
    #[serde(default = "default_male_color")]
    pub male: String,
    #[serde(default = "default_female_color")]
    pub female: String,
    #[serde(default = "default_non_binary_color")]
    pub non_binary: String,
    #[serde(default = "default_unknown_color")]
    pub unknown: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor_color(),
            male: default_male_color(),
            female: default_female_color(),
            non_binary: default_non_binary_color(),
            unknown: default_unknown_color(),
        }
    }
}

impl PaletteConfig {
    pub fn color(&self, class: ColorClass) -> &str {
        match class {
            ColorClass::Anchor => &self.anchor,
            ColorClass::Male => &self.male,
            ColorClass::Female => &self.female,
            ColorClass::NonBinary => &self.non_binary,
            ColorClass::Unknown => &self.unknown,
            ColorClass::Union => "black",
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("family_trees")
}

fn default_output_format() -> String {
    "dot".to_string()
}

fn default_graphviz_bin() -> String {
    "dot".to_string()
}

fn default_file_suffix() -> String {
    "_family_tree".to_string()
}

fn default_include_partners() -> bool {
    true
}

fn default_anchor_color() -> String {
    "gold".to_string()
}

fn default_male_color() -> String {
    "lightblue2".to_string()
}

fn default_female_color() -> String {
    "pink".to_string()
}

fn default_non_binary_color() -> String {
    "palegreen".to_string()
}

fn default_unknown_color() -> String {
    "lightgrey".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FAMTREE_CONFIG environment variable
    /// 2. ./famtree.toml in current directory
    ///
    /// Without either, built-in defaults are used.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = match std::env::var("FAMTREE_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let local = PathBuf::from("famtree.toml");
                if !local.exists() {
                    let config = Config::default();
                    config.validate()?;
                    return Ok(config);
                }
                local
            }
        };

        Self::from_file(&config_path)
    }

    /// Load and validate a specific config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            anyhow::bail!(
                "output.format must be one of {}, got '{}'",
                OUTPUT_FORMATS.join(", "),
                self.output.format
            );
        }

        if self.output.directory.as_os_str().is_empty() {
            anyhow::bail!("output.directory must not be empty");
        }

        if self.output.graphviz_bin.trim().is_empty() {
            anyhow::bail!("output.graphviz_bin must not be empty");
        }

        let palette = &self.palette;
        for (name, color) in [
            ("anchor", &palette.anchor),
            ("male", &palette.male),
            ("female", &palette.female),
            ("non_binary", &palette.non_binary),
            ("unknown", &palette.unknown),
        ] {
            if color.trim().is_empty() {
                anyhow::bail!("palette.{} must not be empty", name);
            }
        }

        Ok(())
    }

    /// Get dataset path
    pub fn dataset_path(&self) -> &Path {
        &self.dataset.path
    }

    /// Get output directory
    pub fn output_dir(&self) -> &Path {
        &self.output.directory
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            include_partners: self.graph.include_partners,
        }
    }
}
