//! Persona system: the role definitions a crew is built from.
//!
//! Personas are loaded from crew TOML and never change after load.

pub mod roster;
pub mod types;

pub use roster::Roster;
pub use types::Persona;
