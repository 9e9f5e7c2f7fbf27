//! Lazy builder registry.
//!
//! Builders are registered explicitly at startup under a stable id;
//! elements refer to them by id. Looking up an id nobody registered is a
//! wiring mistake and fails the render.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::element::Element;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("no lazy builder registered for id `{id}`")]
    Unknown { id: String },
}

/// A deferred element factory.
pub trait LazyBuilder: Send + Sync {
    fn build(&self, args: &[String]) -> Element;
}

impl<F> LazyBuilder for F
where
    F: Fn(&[String]) -> Element + Send + Sync,
{
    fn build(&self, args: &[String]) -> Element {
        self(args)
    }
}

impl std::fmt::Debug for dyn LazyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LazyBuilder")
    }
}

/// Explicit startup registry of lazy builders.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<String, Arc<dyn LazyBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, builder: Arc<dyn LazyBuilder>) {
        self.builders.insert(id.into(), builder);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.builders.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn LazyBuilder>, BuilderError> {
        self.builders
            .get(id)
            .cloned()
            .ok_or_else(|| BuilderError::Unknown { id: id.to_string() })
    }
}
