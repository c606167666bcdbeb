//! Sequential pipeline runner
//!
//! Executes a crew's tasks one after another, each task seeing the previous
//! task's answer as context. Any error aborts the run.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::SharedBackend;
use crate::config::PipelineSettings;
use crate::crew::{Crew, CrewTask};
use crate::error::{Error, Result};
use crate::persona::Persona;
use crate::tools::ToolSet;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, TokenUsage, ToolCall};

use super::{PipelineResult, RunState, TaskOutput};

/// Sent when the tool-round budget is spent
const FINAL_ANSWER_NUDGE: &str =
    "You have used all the tool calls available for this task. \
     Using the information you already have, give your complete final answer now.";

// ─────────────────────────────────────────────────────────────────
// Pipeline Runner Trait
// ─────────────────────────────────────────────────────────────────

/// Runs a validated crew to completion
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn kickoff(&self, crew: &Crew) -> Result<PipelineResult>;
}

// ─────────────────────────────────────────────────────────────────
// Runner Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the sequential runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Tool-call rounds allowed per task before a final answer is forced
    pub max_tool_rounds: u32,

    /// Log every task output at info level regardless of persona setting
    pub verbose: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            verbose: false,
        }
    }
}

impl From<&PipelineSettings> for RunnerConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            max_tool_rounds: settings.max_tool_rounds,
            verbose: settings.verbose,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Sequential Runner
// ─────────────────────────────────────────────────────────────────

/// Production runner over a `ChatBackend`
pub struct SequentialRunner {
    config: RunnerConfig,
    backend: SharedBackend,
    tools: ToolSet,
}

/// Answer plus bookkeeping for one task
struct TaskAnswer {
    text: String,
    tool_calls: usize,
    usage: TokenUsage,
}

impl SequentialRunner {
    pub fn new(config: RunnerConfig, backend: SharedBackend, tools: ToolSet) -> Self {
        Self {
            config,
            backend,
            tools,
        }
    }

    fn transition(&self, crew: &str, state: &mut RunState, next: RunState) {
        if !state.can_transition_to(next) {
            warn!(crew = %crew, from = %state, to = %next, "Unexpected run state transition");
        }
        debug!(crew = %crew, from = %state, to = %next, "Run state changed");
        *state = next;
    }

    /// Execute one task and collect its answer
    async fn run_task(
        &self,
        crew: &Crew,
        task: &CrewTask,
        persona: &Persona,
        context: Option<&str>,
    ) -> Result<TaskAnswer> {
        let mut messages = vec![
            ChatMessage::system(persona.system_prompt()),
            ChatMessage::user(task_prompt(task, context)),
        ];
        let definitions = self.tools.definitions(&task.tools);
        let mut usage = TokenUsage::default();
        let mut tool_calls = 0;

        if !definitions.is_empty() {
            for round in 1..=self.config.max_tool_rounds {
                let request = ChatRequest::new(messages.clone()).with_tools(definitions.clone());
                let response = self.backend.chat(request).await?;
                usage.add(response.usage);

                if !response.wants_tools() {
                    return Ok(TaskAnswer {
                        text: answer_text(task, response)?,
                        tool_calls,
                        usage,
                    });
                }

                debug!(
                    crew = %crew.name,
                    task_index = task.number,
                    round,
                    calls = response.tool_calls.len(),
                    "Model requested tools"
                );
                messages.push(ChatMessage::assistant_tool_calls(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));
                for call in &response.tool_calls {
                    let result = self.call_tool(task, call).await?;
                    messages.push(ChatMessage::tool_result(&call.id, result));
                    tool_calls += 1;
                }
            }
            messages.push(ChatMessage::user(FINAL_ANSWER_NUDGE));
        }

        let response = self.backend.chat(ChatRequest::new(messages)).await?;
        usage.add(response.usage);
        Ok(TaskAnswer {
            text: answer_text(task, response)?,
            tool_calls,
            usage,
        })
    }

    async fn call_tool(&self, task: &CrewTask, call: &ToolCall) -> Result<String> {
        let tool = self
            .tools
            .by_function_name(&call.name, &task.tools)
            .ok_or_else(|| Error::ToolUnknown {
                tool: call.name.clone(),
            })?;

        let args: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| {
                Error::tool_failed(&call.name, format!("invalid arguments: {}", e))
            })?
        };

        let start = Instant::now();
        let output = tool.execute(args).await?;
        debug!(
            tool = %call.name,
            task_index = task.number,
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = output.len(),
            "Tool call finished"
        );
        Ok(output)
    }
}

#[async_trait]
impl PipelineRunner for SequentialRunner {
    async fn kickoff(&self, crew: &Crew) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = RunState::NotStarted;

        info!(
            crew = %crew.name,
            %run_id,
            tasks = crew.tasks.len(),
            backend = self.backend.name(),
            model = %self.backend.model(),
            "Starting crew"
        );
        self.transition(&crew.name, &mut state, RunState::Running);

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(crew.tasks.len());
        let mut usage = TokenUsage::default();

        for task in &crew.tasks {
            let persona = crew.persona(task)?;
            let context = outputs.last().map(|o| o.raw.as_str());
            info!(
                crew = %crew.name,
                task_index = task.number,
                persona = %persona.name,
                "Working on task"
            );

            let start = Instant::now();
            let answer = match self.run_task(crew, task, persona, context).await {
                Ok(answer) => answer,
                Err(e) => {
                    error!(
                        crew = %crew.name,
                        task_index = task.number,
                        persona = %persona.name,
                        error = %e,
                        "Task failed"
                    );
                    self.transition(&crew.name, &mut state, RunState::Failed);
                    return Err(e);
                }
            };
            let elapsed_ms = start.elapsed().as_millis() as u64;
            usage.add(answer.usage);

            if persona.verbose || self.config.verbose {
                info!(
                    crew = %crew.name,
                    task_index = task.number,
                    persona = %persona.name,
                    elapsed_ms,
                    tool_calls = answer.tool_calls,
                    "Task output:\n{}",
                    answer.text
                );
            } else {
                debug!(
                    crew = %crew.name,
                    task_index = task.number,
                    persona = %persona.name,
                    elapsed_ms,
                    "Task complete"
                );
            }

            outputs.push(TaskOutput {
                number: task.number,
                persona: persona.name.clone(),
                role: persona.role.clone(),
                description: task.description.clone(),
                expected_output: task.expected_output.clone(),
                raw: answer.text,
                elapsed_ms,
                tool_calls: answer.tool_calls,
                export_step: task.export_step,
            });
        }

        let final_text = match outputs.last() {
            Some(last) => last.raw.clone(),
            None => {
                self.transition(&crew.name, &mut state, RunState::Failed);
                return Err(Error::CrewEmpty {
                    name: crew.name.clone(),
                });
            }
        };
        self.transition(&crew.name, &mut state, RunState::Done);

        let result = PipelineResult {
            run_id,
            crew: crew.name.clone(),
            final_text,
            outputs,
            usage,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            crew = %crew.name,
            %run_id,
            elapsed_ms = result.elapsed_ms(),
            total_tokens = result.usage.total_tokens,
            tool_calls = result.tool_calls(),
            "Crew finished"
        );
        Ok(result)
    }
}

// ─────────────────────────────────────────────────────────────────
// Prompt helpers
// ─────────────────────────────────────────────────────────────────

/// User message for a task, with the previous answer as context
fn task_prompt(task: &CrewTask, context: Option<&str>) -> String {
    let mut prompt = format!(
        "{}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.description.trim(),
        task.expected_output.trim()
    );
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}

fn answer_text(task: &CrewTask, response: ChatResponse) -> Result<String> {
    match response.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::api_malformed(format!(
            "model returned no answer for task {}",
            task.number
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::backend::MockBackend;
    use crate::crew::CrewDefinition;
    use crate::tools::{SharedTool, Tool, ToolKind};
    use crate::types::{ChatRole, ToolDefinition};

    const THREE_STEP: &str = r#"
name = "three-step"
title = "Three Step"

[[persona]]
name = "collector"
role = "News_Collector_Agent"
goal = "Collect."
backstory = "You collect."

[[persona]]
name = "writer"
role = "Writer"
goal = "Write."
backstory = "You write."
verbose = false

[[task]]
description = "Collect the news."
expected_output = "A list."
persona = "collector"

[[task]]
description = "Summarize the news."
expected_output = "A summary."
persona = "writer"

[[task]]
description = "Compile the newsletter."
expected_output = "A newsletter."
persona = "writer"

[output]
file = "out.md"
"#;

    const SEARCHING: &str = r#"
name = "searching"
title = "Searching"

[[persona]]
name = "scientist"
role = "Neuroscientist"
goal = "Analyze."
backstory = "You research."
tools = ["search"]

[[task]]
description = "Analyze consciousness."
expected_output = "An analysis."
persona = "scientist"

[output]
format = "csv"
file = "out.csv"
"#;

    fn crew(source: &str) -> Crew {
        CrewDefinition::from_toml(source).unwrap().validate().unwrap()
    }

    /// Search stand-in that records the queries it receives
    struct FakeSearch {
        queries: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl Tool for FakeSearch {
        fn kind(&self) -> ToolKind {
            ToolKind::Search
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "web_search".into(),
                description: "search".into(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, args: serde_json::Value) -> Result<String> {
            self.queries.lock().push(args);
            Ok("RESULT: 86 billion neurons".to_string())
        }
    }

    fn search_set() -> (Arc<FakeSearch>, ToolSet) {
        let fake = Arc::new(FakeSearch {
            queries: Mutex::new(Vec::new()),
        });
        let mut set = ToolSet::new();
        set.insert(fake.clone() as SharedTool);
        (fake, set)
    }

    fn tool_call_response(id: &str) -> ChatResponse {
        ChatResponse {
            tool_calls: vec![ToolCall {
                id: id.into(),
                name: "web_search".into(),
                arguments: r#"{"query":"neurons"}"#.into(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tasks_run_in_declaration_order() {
        let backend = Arc::new(MockBackend::new());
        let runner = SequentialRunner::new(RunnerConfig::default(), backend.clone(), ToolSet::new());

        let result = runner.kickoff(&crew(THREE_STEP)).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        for (request, expected) in requests
            .iter()
            .zip(["Collect the news.", "Summarize the news.", "Compile the newsletter."])
        {
            assert!(request.last_user_content().unwrap().starts_with(expected));
            assert!(request.tools.is_empty());
        }
        assert_eq!(
            requests[0].messages[0].content.as_deref().map(|s| s.starts_with("You are News_Collector_Agent.")),
            Some(true)
        );

        assert_eq!(result.outputs.len(), 3);
        assert_eq!(result.outputs[2].role, "Writer");
        assert_eq!(result.final_text, result.outputs[2].raw);
        assert_eq!(result.crew, "three-step");
    }

    #[tokio::test]
    async fn test_previous_output_is_context() {
        let backend = Arc::new(MockBackend::new());
        let runner = SequentialRunner::new(RunnerConfig::default(), backend.clone(), ToolSet::new());
        let result = runner.kickoff(&crew(THREE_STEP)).await.unwrap();

        let requests = backend.requests();
        let first = requests[0].last_user_content().unwrap();
        assert!(!first.contains("This is the context"));

        let second = requests[1].last_user_content().unwrap();
        assert!(second.contains("This is the context you're working with:"));
        assert!(second.ends_with(&result.outputs[0].raw));
    }

    #[tokio::test]
    async fn test_fixed_response_is_final_text() {
        let backend = Arc::new(MockBackend::fixed_response("## Weekly AI Newsletter\n..."));
        let runner = SequentialRunner::new(RunnerConfig::default(), backend, ToolSet::new());
        let result = runner.kickoff(&crew(THREE_STEP)).await.unwrap();
        assert_eq!(result.final_text, "## Weekly AI Newsletter\n...");
        assert!(result.finished_at >= result.started_at);
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_run() {
        let backend = Arc::new(MockBackend::failing());
        let runner = SequentialRunner::new(RunnerConfig::default(), backend.clone(), ToolSet::new());

        let err = runner.kickoff(&crew(THREE_STEP)).await.unwrap_err();
        assert!(matches!(err, Error::ApiStatus { .. }));
        assert_eq!(backend.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let backend = Arc::new(MockBackend::fixed_response("   "));
        let runner = SequentialRunner::new(RunnerConfig::default(), backend, ToolSet::new());
        let err = runner.kickoff(&crew(THREE_STEP)).await.unwrap_err();
        assert!(matches!(err, Error::ApiMalformed { .. }));
    }

    #[tokio::test]
    async fn test_tool_result_fed_back() {
        let backend = Arc::new(MockBackend::fixed_response("Final analysis"));
        backend.push_response(tool_call_response("call_1"));
        let (fake, tools) = search_set();
        let runner = SequentialRunner::new(RunnerConfig::default(), backend.clone(), tools);

        let result = runner.kickoff(&crew(SEARCHING)).await.unwrap();

        assert_eq!(result.final_text, "Final analysis");
        assert_eq!(result.outputs[0].tool_calls, 1);
        assert_eq!(fake.queries.lock()[0]["query"], "neurons");

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let follow_up = requests[1].messages.last().unwrap();
        assert_eq!(follow_up.role, ChatRole::Tool);
        assert_eq!(follow_up.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(follow_up.content.as_deref(), Some("RESULT: 86 billion neurons"));
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let backend = Arc::new(MockBackend::fixed_response("Forced answer"));
        for i in 0..2 {
            backend.push_response(tool_call_response(&format!("call_{}", i)));
        }
        let (_, tools) = search_set();
        let config = RunnerConfig {
            max_tool_rounds: 2,
            verbose: false,
        };
        let runner = SequentialRunner::new(config, backend.clone(), tools);

        let result = runner.kickoff(&crew(SEARCHING)).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].tools.is_empty());
        assert_eq!(requests[2].last_user_content(), Some(FINAL_ANSWER_NUDGE));
        assert_eq!(result.outputs[0].tool_calls, 2);
        assert_eq!(result.final_text, "Forced answer");
    }

    #[tokio::test]
    async fn test_unknown_tool_requested() {
        let backend = Arc::new(MockBackend::fixed_response("x"));
        backend.push_response(ChatResponse {
            tool_calls: vec![ToolCall {
                id: "c".into(),
                name: "browser".into(),
                arguments: "{}".into(),
            }],
            ..Default::default()
        });
        let (_, tools) = search_set();
        let runner = SequentialRunner::new(RunnerConfig::default(), backend, tools);

        let err = runner.kickoff(&crew(SEARCHING)).await.unwrap_err();
        assert!(matches!(err, Error::ToolUnknown { ref tool } if tool == "browser"));
    }

    #[test]
    fn test_task_prompt() {
        let crew = crew(THREE_STEP);
        let prompt = task_prompt(&crew.tasks[0], None);
        assert!(prompt.starts_with("Collect the news.\n\nThis is the expected criteria for your final answer: A list."));

        let prompt = task_prompt(&crew.tasks[1], Some("  "));
        assert!(!prompt.contains("context"));
    }
}
