//! Injected logging capability
//!
//! Components receive a [`Logger`] at construction instead of reaching for a
//! process-wide console. The default [`TracingLogger`] forwards to `tracing`
//! tagged with the component name; [`MemoryLogger`] captures records so tests
//! can assert on what a component reported.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Shared handle to a logger
pub type SharedLogger = Arc<dyn Logger>;

/// Severity of a captured record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Error,
}

/// Logging capability passed explicitly into each component
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn error(&self, message: &str);

    /// Run `f`, logging its wall-clock duration at debug level
    fn timed<T>(&self, description: &str, f: impl FnOnce() -> T) -> T
    where
        Self: Sized,
    {
        timed(self, description, f)
    }
}

/// Object-safe form of [`Logger::timed`]
pub fn timed<T>(logger: &dyn Logger, description: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    logger.debug(&format!("Starting: {}...", description));
    let out = f();
    logger.debug(&format!(
        "Finished: {} in {:.2}s",
        description,
        start.elapsed().as_secs_f64()
    ));
    out
}

/// Forwards records to `tracing`
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn shared(component: &'static str) -> SharedLogger {
        Arc::new(Self::new(component))
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("gitdive")
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = self.component, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(component = self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = self.component, "{}", message);
    }
}

/// Captures records in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Messages logged at `level`
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}
