use std::collections::HashMap;

use tracing::trace;

use crate::error::{PipeError, Result};

/// Callback invoked with the unescaped content of each matching message.
pub type Handler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Maps message identifiers to exactly one handler each.
///
/// Handlers run synchronously on whichever thread calls [`dispatch`], in the
/// order messages are dispatched.
///
/// [`dispatch`]: HandlerRegistry::dispatch
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `identifier`.
    ///
    /// An identifier can only be registered once; a second registration is
    /// rejected and the first handler stays in place.
    pub fn register<F>(&mut self, identifier: impl Into<String>, handler: F) -> Result<()>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let identifier = identifier.into();
        if self.handlers.contains_key(&identifier) {
            return Err(PipeError::DuplicateHandler(identifier));
        }
        self.handlers.insert(identifier, Box::new(handler));
        Ok(())
    }

    /// Route one message to its handler.
    ///
    /// Returns `false` when nothing is registered for `identifier`; the
    /// message is dropped without error.
    pub fn dispatch(&mut self, identifier: &str, content: &[u8]) -> bool {
        match self.handlers.get_mut(identifier) {
            Some(handler) => {
                handler(content);
                true
            }
            None => {
                trace!(identifier, size = content.len(), "no handler, message dropped");
                false
            }
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.handlers.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
