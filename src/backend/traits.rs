//! Backend trait definitions
//!
//! Defines the `ChatBackend` trait every LLM backend implements.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

// ─────────────────────────────────────────────────────────────────
// ChatBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for chat completion backends
///
/// The pipeline runner talks to the LLM only through this trait. It is
/// object-safe so backends can be chosen at runtime.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name (e.g., "openai", "mock")
    fn name(&self) -> &'static str;

    /// Model identifier requests are sent to
    fn model(&self) -> String;

    /// Execute one chat completion
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Type alias for a shared backend reference
pub type SharedBackend = Arc<dyn ChatBackend>;
