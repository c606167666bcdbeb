//! Chat backends
//!
//! The `ChatBackend` abstraction plus the OpenAI-compatible and mock
//! implementations.

mod traits;
mod registry;
mod mock;
mod openai;

pub use traits::*;
pub use registry::*;
pub use mock::MockBackend;
pub use openai::{OpenAiBackend, OpenAiConfig};
