//! Core persona type.
//!
//! A persona is one LLM "agent" in a crew: a role, a goal and a backstory
//! that together become the system prompt for every task it is assigned.

use serde::{Deserialize, Serialize};

use crate::tools::ToolKind;

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// A named role definition, deserialized from a crew's `[[persona]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Persona {
    /// Unique key tasks use to reference this persona.
    pub name: String,

    /// Role title presented to the model (e.g. "Neuroscientist").
    pub role: String,

    /// What this persona is trying to achieve.
    pub goal: String,

    /// Background that shapes how the persona answers.
    pub backstory: String,

    /// Tools granted to every task this persona performs.
    #[serde(default)]
    pub tools: Vec<ToolKind>,

    /// Hand-off of work to other personas. Must stay `false`.
    #[serde(default)]
    pub allow_delegation: bool,

    /// Log each task output at info level.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

fn default_verbose() -> bool {
    true
}

impl Persona {
    /// System prompt sent before every task this persona performs.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {role}. {backstory}\nYour personal goal is: {goal}",
            role = self.role,
            backstory = self.backstory.trim(),
            goal = self.goal.trim(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const NEUROSCIENTIST: &str = r#"
name = "neuroscientist"
role = "Neuroscientist"
goal = "Analyze neural data to understand the mechanisms of consciousness."
backstory = "You are a leading neuroscientist."
tools = ["search"]
"#;

    #[test]
    fn test_parse_with_defaults() {
        let persona: Persona = toml::from_str(NEUROSCIENTIST).unwrap();
        assert_eq!(persona.name, "neuroscientist");
        assert_eq!(persona.tools, vec![ToolKind::Search]);
        assert!(!persona.allow_delegation);
        assert!(persona.verbose);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = format!("{}\nmemory = true\n", NEUROSCIENTIST);
        assert!(toml::from_str::<Persona>(&text).is_err());
    }

    #[test]
    fn test_system_prompt() {
        let persona: Persona = toml::from_str(NEUROSCIENTIST).unwrap();
        let prompt = persona.system_prompt();
        assert!(prompt.starts_with("You are Neuroscientist. You are a leading neuroscientist."));
        assert!(prompt.ends_with(
            "Your personal goal is: Analyze neural data to understand the mechanisms of consciousness."
        ));
    }
}
