//! Crew definitions as written in TOML, and their validated form.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::persona::{Persona, Roster};
use crate::tools::ToolKind;

use super::template::interpolate;

// ─────────────────────────────────────────────────────────────────
// Output Spec
// ─────────────────────────────────────────────────────────────────

/// Format of the file a crew run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Final result written verbatim
    #[default]
    Markdown,
    /// One row per task
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Where and how a crew's result is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    #[serde(default)]
    pub format: OutputFormat,

    /// File name, relative to the output directory
    pub file: String,
}

// ─────────────────────────────────────────────────────────────────
// Raw definition (TOML)
// ─────────────────────────────────────────────────────────────────

/// A task as declared in a crew's `[[task]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkItem {
    pub description: String,
    pub expected_output: String,

    /// Name of the persona performing this task
    pub persona: String,

    /// Replaces the persona's tools for this task when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolKind>>,

    /// Aggregation step; left out of CSV rows
    #[serde(default)]
    pub export_step: bool,
}

/// A crew as written in TOML, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrewDefinition {
    pub name: String,

    /// Heading printed before the run
    pub title: String,

    /// Paragraph printed under the title
    #[serde(default)]
    pub intro: String,

    /// Values for `{key}` placeholders
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    #[serde(default, rename = "persona")]
    pub personas: Vec<Persona>,

    #[serde(default, rename = "task")]
    pub tasks: Vec<WorkItem>,

    pub output: OutputSpec,
}

impl CrewDefinition {
    /// Parse a crew definition from TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::from_toml_named("<inline>", content)
    }

    /// Parse, naming `source` in any error
    pub fn from_toml_named(source: &str, content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::CrewParse {
            name: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Merge extra inputs over the declared ones
    pub fn with_inputs(mut self, overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        self.inputs.extend(overrides);
        self
    }

    /// Check the definition and resolve it into a runnable `Crew`.
    ///
    /// The roster is built in full before any task is resolved, so a task
    /// may name any persona in the file.
    pub fn validate(&self) -> Result<Crew> {
        if self.tasks.is_empty() {
            return Err(Error::CrewEmpty {
                name: self.name.clone(),
            });
        }

        let mut personas = Vec::with_capacity(self.personas.len());
        for p in &self.personas {
            if p.allow_delegation {
                return Err(Error::DelegationUnsupported {
                    persona: p.name.clone(),
                });
            }
            let at = |field: &str| format!("persona '{}' {}", p.name, field);
            personas.push(Persona {
                role: interpolate(&p.role, &self.inputs, &at("role"))?,
                goal: interpolate(&p.goal, &self.inputs, &at("goal"))?,
                backstory: interpolate(&p.backstory, &self.inputs, &at("backstory"))?,
                ..p.clone()
            });
        }
        let roster = Roster::new(personas)?;

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for (i, item) in self.tasks.iter().enumerate() {
            let number = i + 1;
            let persona_index =
                roster
                    .position(&item.persona)
                    .ok_or_else(|| Error::PersonaNotFound {
                        task_index: number,
                        persona: item.persona.clone(),
                    })?;
            let tools = match &item.tools {
                Some(tools) => tools.clone(),
                None => roster
                    .at(persona_index)
                    .map(|p| p.tools.clone())
                    .unwrap_or_default(),
            };
            let at = |field: &str| format!("task {} {}", number, field);

            tasks.push(CrewTask {
                number,
                description: interpolate(&item.description, &self.inputs, &at("description"))?,
                expected_output: interpolate(
                    &item.expected_output,
                    &self.inputs,
                    &at("expected_output"),
                )?,
                persona_index,
                tools,
                export_step: item.export_step,
            });
        }

        let output = OutputSpec {
            format: self.output.format,
            file: interpolate(&self.output.file, &self.inputs, "output file")?,
        };
        if output.file.trim().is_empty() {
            return Err(Error::CrewParse {
                name: self.name.clone(),
                message: "output.file must not be empty".to_string(),
            });
        }

        debug!(
            crew = %self.name,
            personas = roster.len(),
            tasks = tasks.len(),
            "Crew validated"
        );

        Ok(Crew {
            name: self.name.clone(),
            title: interpolate(&self.title, &self.inputs, "title")?,
            intro: interpolate(&self.intro, &self.inputs, "intro")?,
            roster,
            tasks,
            output,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Validated crew
// ─────────────────────────────────────────────────────────────────

/// A task with placeholders resolved and its persona bound
#[derive(Debug, Clone, PartialEq)]
pub struct CrewTask {
    /// 1-based position in the crew
    pub number: usize,
    pub description: String,
    pub expected_output: String,
    persona_index: usize,

    /// Effective tools (task override or persona default)
    pub tools: Vec<ToolKind>,
    pub export_step: bool,
}

/// An immutable, validated crew ready to run
#[derive(Debug, Clone)]
pub struct Crew {
    pub name: String,
    pub title: String,
    pub intro: String,
    pub roster: Roster,
    pub tasks: Vec<CrewTask>,
    pub output: OutputSpec,
}

impl Crew {
    /// The persona assigned to `task`
    pub fn persona(&self, task: &CrewTask) -> Result<&Persona> {
        self.roster.at(task.persona_index).ok_or_else(|| {
            Error::Internal(format!("task {} has no bound persona", task.number))
        })
    }

    /// Every tool kind any task needs
    pub fn required_tools(&self) -> BTreeSet<ToolKind> {
        self.tasks
            .iter()
            .flat_map(|t| t.tools.iter().copied())
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
