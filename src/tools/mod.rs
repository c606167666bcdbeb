//! Tools personas can call during a pipeline step
//!
//! A tool is offered to the model as a function definition; when the model
//! calls it, the runner executes it and feeds the text result back.

mod search;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CrewlineConfig;
use crate::error::{Error, Result};
use crate::types::ToolDefinition;

pub use search::{SerperConfig, SerperSearchTool, MAX_SEARCH_RESULTS};

// ─────────────────────────────────────────────────────────────────
// Tool Kind
// ─────────────────────────────────────────────────────────────────

/// Tools a crew definition can grant to a persona or task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    /// Web search through the Serper API
    Search,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Search => "search",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ToolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "search" | "web-search" | "serper" => Ok(ToolKind::Search),
            _ => Err(Error::ToolUnknown {
                tool: s.to_string(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which kind this tool implements
    fn kind(&self) -> ToolKind;

    /// Function definition offered to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied JSON arguments
    async fn execute(&self, args: serde_json::Value) -> Result<String>;
}

pub type SharedTool = Arc<dyn Tool>;

// ─────────────────────────────────────────────────────────────────
// Tool Set
// ─────────────────────────────────────────────────────────────────

/// The tool instances available to a run, keyed by kind
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<ToolKind, SharedTool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build instances for every kind in `kinds`
    ///
    /// Credentials for each tool are checked here, so a crew that needs
    /// search fails before its first LLM call when the key is missing.
    pub fn for_kinds<'a>(
        kinds: impl IntoIterator<Item = &'a ToolKind>,
        config: &CrewlineConfig,
    ) -> Result<Self> {
        let mut set = Self::new();
        for kind in kinds {
            if set.tools.contains_key(kind) {
                continue;
            }
            let tool: SharedTool = match kind {
                ToolKind::Search => {
                    let api_key = config.require_search_key()?;
                    Arc::new(SerperSearchTool::new(SerperConfig::from_settings(
                        &config.search,
                        api_key,
                    ))?)
                }
            };
            set.tools.insert(*kind, tool);
        }
        Ok(set)
    }

    /// Register a tool instance, replacing any of the same kind
    pub fn insert(&mut self, tool: SharedTool) {
        self.tools.insert(tool.kind(), tool);
    }

    /// Definitions for the given kinds, skipping kinds not in the set
    pub fn definitions(&self, kinds: &[ToolKind]) -> Vec<ToolDefinition> {
        kinds
            .iter()
            .filter_map(|k| self.tools.get(k))
            .map(|t| t.definition())
            .collect()
    }

    /// Find the tool whose function name is `name`, restricted to `allowed`
    pub fn by_function_name(&self, name: &str, allowed: &[ToolKind]) -> Option<&SharedTool> {
        allowed
            .iter()
            .filter_map(|k| self.tools.get(k))
            .find(|t| t.definition().name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}
