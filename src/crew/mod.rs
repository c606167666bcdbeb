//! Crews: personas plus an ordered task list.
//!
//! Definitions are parsed from TOML (bundled or user-supplied), then
//! validated once into an immutable `Crew` the pipeline runs.

pub mod definition;
pub mod registry;
pub mod template;

pub use definition::{Crew, CrewDefinition, CrewTask, OutputFormat, OutputSpec};
pub use registry::CrewRegistry;
