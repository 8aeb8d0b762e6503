//! Explicit handler registry.
//!
//! The original handler is configured as a path string in the environment, but
//! there is no reflection to turn that string into a callable at runtime.
//! Instead, the application registers its handlers under their path names at
//! startup and the registry resolves the configured path to a typed callable,
//! failing with a descriptive error before any invocation is attempted.

use crate::config::{ConfigError, HandlerPath};
use futures_util::future::BoxFuture;
use lambda_runtime::{Error, LambdaEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A registered handler: a shareable async callable over one event type.
pub type RegisteredHandler<T, R> =
    Arc<dyn Fn(LambdaEvent<T>) -> BoxFuture<'static, Result<R, Error>> + Send + Sync>;

/// Registry mapping handler path strings to typed callables.
///
/// Paths are normalized the same way the environment value is (`/` maps to
/// `.`), so `register("app/main.handler", ...)` matches `_HANDLER=app.main.handler`.
pub struct HandlerRegistry<T, R> {
    handlers: HashMap<String, RegisteredHandler<T, R>>,
}

impl<T, R> Default for HandlerRegistry<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> HandlerRegistry<T, R> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a path string.
    ///
    /// A malformed path is rejected here, at startup, rather than at resolve time.
    pub fn register<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self, ConfigError>
    where
        F: Fn(LambdaEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
    {
        let parsed = HandlerPath::parse(path)?;
        self.handlers.insert(
            parsed.qualified(),
            Arc::new(move |event| Box::pin(handler(event))),
        );
        Ok(self)
    }

    /// Resolve a parsed handler path to its registered callable.
    pub fn resolve(&self, path: &HandlerPath) -> Result<RegisteredHandler<T, R>, ConfigError> {
        self.handlers
            .get(&path.qualified())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownHandler(path.qualified()))
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}
