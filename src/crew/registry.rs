//! Bundled crew registry: crew TOMLs compiled into the binary.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

use super::definition::{CrewDefinition, OutputFormat};

/// Bundled crews: (name, TOML source)
const BUNDLED: &[(&str, &str)] = &[
    ("newsletter", include_str!("../../config/crews/newsletter.toml")),
    ("neural-data", include_str!("../../config/crews/neural-data.toml")),
    ("brain-knowledge", include_str!("../../config/crews/brain-knowledge.toml")),
];

/// Registry of available crew definitions.
pub struct CrewRegistry;

impl CrewRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Names of the bundled crews, in listing order.
    pub fn names(&self) -> Vec<&'static str> {
        BUNDLED.iter().map(|(name, _)| *name).collect()
    }

    /// Raw TOML of a bundled crew.
    pub fn get_bundled_source(&self, name: &str) -> Option<&'static str> {
        BUNDLED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, source)| *source)
    }

    /// Parse a bundled crew by name.
    pub fn get(&self, name: &str) -> Result<CrewDefinition> {
        let source = self.get_bundled_source(name).ok_or_else(|| Error::CrewNotFound {
            name: name.to_string(),
        })?;
        CrewDefinition::from_toml_named(name, source)
    }

    /// Load a user-supplied crew file.
    pub fn load_file(&self, path: &Path) -> Result<CrewDefinition> {
        debug!(path = %path.display(), "Loading crew file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        CrewDefinition::from_toml_named(&path.display().to_string(), &content)
    }

    /// Summaries of all bundled crews, with default inputs applied.
    pub fn list_available(&self) -> Result<Vec<CrewListing>> {
        BUNDLED
            .iter()
            .map(|(name, _)| {
                let crew = self.get(name)?.validate()?;
                Ok(CrewListing {
                    name: *name,
                    title: crew.title,
                    personas: crew.roster.len(),
                    tasks: crew.tasks.len(),
                    format: crew.output.format,
                    file: crew.output.file,
                })
            })
            .collect()
    }
}

impl Default for CrewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of an available crew.
#[derive(Debug, Clone)]
pub struct CrewListing {
    pub name: &'static str,
    pub title: String,
    pub personas: usize,
    pub tasks: usize,
    pub format: OutputFormat,
    pub file: String,
}
