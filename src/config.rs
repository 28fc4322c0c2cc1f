use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Converter configuration, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub export: ExportOptions,
    pub import: ImportOptions,
    /// Extra type-name aliases handed to the node-type registry
    pub aliases: HashMap<String, String>,
}

/// What to export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    #[default]
    All,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub scope: ExportScope,
    /// Write stored values of unconnected input ports
    pub include_port_values: bool,
    /// Write embedded script text
    pub include_scripts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Host type used for nodes whose type cannot be resolved
    pub placeholder_type: String,
    /// Request a recompute once the import finishes
    pub refresh: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scope: ExportScope::All,
            include_port_values: true,
            include_scripts: true,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            placeholder_type: "Panel".to_string(),
            refresh: true,
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let aliases = [("Extrusion", "Extrude"), ("Text Panel", "Panel")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self {
            export: ExportOptions::default(),
            import: ImportOptions::default(),
            aliases,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create config: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("Failed to write config")?;
        Ok(())
    }
}
