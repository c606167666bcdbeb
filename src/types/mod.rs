//! Shared types
//!
//! Message and response shapes used between the pipeline and backends.

mod chat;

pub use chat::*;
