//! Run state and results
//!
//! What one pipeline run produces: a record per task and the overall result.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::TokenUsage;

// ─────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Created, nothing sent yet
    #[default]
    NotStarted,
    /// Tasks are executing
    Running,
    /// Every task finished
    Done,
    /// A task failed; the run was aborted
    Failed,
}

impl RunState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::NotStarted, RunState::Running)
                | (RunState::Running, RunState::Done)
                | (RunState::Running, RunState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "not-started"),
            RunState::Running => write!(f, "running"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Output
// ─────────────────────────────────────────────────────────────────

/// The outcome of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    /// 1-based position in the crew
    pub number: usize,

    /// Persona name and role
    pub persona: String,
    pub role: String,

    pub description: String,
    pub expected_output: String,

    /// Final answer text
    pub raw: String,

    pub elapsed_ms: u64,

    /// Tool calls executed while producing the answer
    pub tool_calls: usize,

    pub export_step: bool,
}

// ─────────────────────────────────────────────────────────────────
// Pipeline Result
// ─────────────────────────────────────────────────────────────────

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub crew: String,

    /// Output of the last task
    pub final_text: String,

    /// Task outputs in execution order
    pub outputs: Vec<TaskOutput>,

    /// Token totals across every backend call
    pub usage: TokenUsage,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    /// Wall-clock duration of the run
    pub fn elapsed_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Outputs of the non-export tasks
    pub fn data_outputs(&self) -> impl Iterator<Item = &TaskOutput> {
        self.outputs.iter().filter(|o| !o.export_step)
    }

    /// Total tool calls across all tasks
    pub fn tool_calls(&self) -> usize {
        self.outputs.iter().map(|o| o.tool_calls).sum()
    }
}
