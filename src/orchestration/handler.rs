//! # Unit Handlers
//!
//! A handler is the code behind a [`TaskStep`](crate::orchestration::step::TaskStep).
//! It declares which context fields it reads and which kind of value it returns so the
//! graph can be checked before a run, then receives only the fields the task selected.

use crate::error::Result;
use crate::orchestration::context::{ContextField, ContextValue, UnitInput, ValueKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait UnitHandler: Send + Sync {
    /// Fields a task must select for this handler
    fn required_inputs(&self) -> &'static [ContextField];

    /// Kind of the value [`invoke`](UnitHandler::invoke) returns
    fn output_kind(&self) -> ValueKind;

    async fn invoke(&self, input: &UnitInput) -> Result<ContextValue>;
}

/// Handlers by name
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn UnitHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn UnitHandler>) {
        let name = name.into();
        debug!(handler = %name, output_kind = %handler.output_kind(), "Registered unit handler");
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UnitHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
