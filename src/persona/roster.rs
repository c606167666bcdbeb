//! Ordered, name-indexed persona set.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::types::Persona;

/// The personas of one crew, in declaration order.
///
/// Names are unique; construction fails on the first duplicate.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    personas: Vec<Persona>,
    index: HashMap<String, usize>,
}

impl Roster {
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        let mut index = HashMap::with_capacity(personas.len());
        for (i, persona) in personas.iter().enumerate() {
            if index.insert(persona.name.clone(), i).is_some() {
                return Err(Error::PersonaDuplicate {
                    name: persona.name.clone(),
                });
            }
        }
        Ok(Self { personas, index })
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.position(name).map(|i| &self.personas[i])
    }

    /// Declaration index of `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Persona at a declaration index
    pub fn at(&self, index: usize) -> Option<&Persona> {
        self.personas.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
