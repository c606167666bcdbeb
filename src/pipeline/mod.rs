//! Pipeline module
//!
//! Runs a validated crew:
//! - One backend conversation per task, in declaration order
//! - Optional tool-call rounds per task
//! - Previous answer passed forward as context

mod runner;
mod state;

pub use runner::*;
pub use state::*;
