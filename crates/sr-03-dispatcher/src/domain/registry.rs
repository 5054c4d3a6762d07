//! Handler registry.
//!
//! Maps namespaces to handlers. Built once before the dispatcher starts and
//! immutable afterwards.
//!
//! A message type is routed to the handler whose namespace is the longest
//! dot-separated prefix of it: `million.ss.test` handles
//! `million.ss.test.LoginReq`, `Echo` handles `Echo`. The empty namespace is
//! a catch-all.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use shared_types::message::NAMESPACE_SEPARATOR;
use thiserror::Error;

use crate::ports::MessageHandler;

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a handler is already registered for namespace '{0}'")]
    DuplicateNamespace(String),

    #[error("invalid namespace '{0}': empty segment")]
    InvalidNamespace(String),
}

/// Namespace → handler table.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Rc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every message type under `namespace`.
    pub fn register_handler<H>(
        &mut self,
        namespace: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: MessageHandler + 'static,
    {
        self.register_shared(namespace, Rc::new(handler))
    }

    /// Register a handler that is shared with other namespaces.
    pub fn register_shared(
        &mut self,
        namespace: impl Into<String>,
        handler: Rc<dyn MessageHandler>,
    ) -> Result<(), RegistryError> {
        let namespace = namespace.into();

        if !namespace.is_empty() && namespace.split(NAMESPACE_SEPARATOR).any(str::is_empty) {
            return Err(RegistryError::InvalidNamespace(namespace));
        }
        if self.handlers.contains_key(&namespace) {
            return Err(RegistryError::DuplicateNamespace(namespace));
        }

        self.handlers.insert(namespace, handler);
        Ok(())
    }

    /// Builder form of [`register_handler`](Self::register_handler).
    pub fn with_handler<H>(
        mut self,
        namespace: impl Into<String>,
        handler: H,
    ) -> Result<Self, RegistryError>
    where
        H: MessageHandler + 'static,
    {
        self.register_handler(namespace, handler)?;
        Ok(self)
    }

    /// Find the handler for `msg_type`, returning the matched namespace.
    pub fn resolve(&self, msg_type: &str) -> Option<(&str, &Rc<dyn MessageHandler>)> {
        let mut candidate = msg_type;
        loop {
            if let Some((namespace, handler)) = self.handlers.get_key_value(candidate) {
                return Some((namespace.as_str(), handler));
            }
            match candidate.rfind(NAMESPACE_SEPARATOR) {
                Some(pos) => candidate = &candidate[..pos],
                None => break,
            }
        }

        self.handlers
            .get_key_value("")
            .map(|(namespace, handler)| (namespace.as_str(), handler))
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        namespaces.sort_unstable();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
