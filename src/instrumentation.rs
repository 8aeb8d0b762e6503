//! Optional instrumentation loading.
//!
//! Applications can register named instrumentations (an HTTP client
//! integration, a database layer, anything that hooks itself into the tracer
//! at startup) and have the wrapper enable them at cold start. Which ones run
//! is controlled by two comma-separated environment lists:
//!
//! - `OTEL_LAMBDA_ENABLED_INSTRUMENTATIONS`: names to enable (default: all registered)
//! - `OTEL_LAMBDA_DISABLED_INSTRUMENTATIONS`: names to remove from that set
//!
//! A failing instrumentation is logged and skipped; it never prevents the
//! handler from running.

use crate::config::env_list;
use crate::constants::env_vars;
use crate::logger::Logger;
use lambda_runtime::Error;
use std::collections::HashSet;

static LOGGER: Logger = Logger::new("instrumentation");

/// A named instrumentation that hooks itself up when enabled.
pub trait Instrumentation {
    /// Stable name used in the enable/disable environment lists.
    fn name(&self) -> &str;

    /// Activate the instrumentation. Called at most once, at cold start.
    fn enable(&self) -> Result<(), Error>;
}

/// Registry of instrumentations to load at cold start.
#[derive(Default)]
pub struct InstrumentationRegistry {
    entries: Vec<Box<dyn Instrumentation + Send + Sync>>,
}

impl InstrumentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrumentation.
    pub fn register<I>(&mut self, instrumentation: I) -> &mut Self
    where
        I: Instrumentation + Send + Sync + 'static,
    {
        self.entries.push(Box::new(instrumentation));
        self
    }

    /// Names selected by the environment lists, out of the registered set.
    fn active_names(&self) -> HashSet<String> {
        let mut active: HashSet<String> = match env_list(env_vars::ENABLED_INSTRUMENTATIONS) {
            Some(enabled) => enabled.into_iter().collect(),
            None => self
                .entries
                .iter()
                .map(|entry| entry.name().to_string())
                .collect(),
        };
        if let Some(disabled) = env_list(env_vars::DISABLED_INSTRUMENTATIONS) {
            for name in disabled {
                active.remove(&name);
            }
        }
        active
    }

    /// Enable every active instrumentation, skipping individual failures.
    ///
    /// Returns the number successfully enabled.
    pub fn load_enabled(&self) -> usize {
        let active = self.active_names();
        let mut loaded = 0;
        for entry in &self.entries {
            if !active.contains(entry.name()) {
                LOGGER.debug(format!("instrumentation `{}` not active", entry.name()));
                continue;
            }
            match entry.enable() {
                Ok(()) => {
                    LOGGER.debug(format!("instrumentation `{}` enabled", entry.name()));
                    loaded += 1;
                }
                Err(err) => {
                    LOGGER.warn(format!(
                        "instrumentation `{}` failed to load, skipping: {}",
                        entry.name(),
                        err
                    ));
                }
            }
        }
        loaded
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
