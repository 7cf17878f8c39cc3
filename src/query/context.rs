//! Query and compile contexts
//!
//! `QueryContext` travels through evaluation and carries the cancellation
//! signal; `CompileContext` collects optimizer diagnostics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};

/// Shared cancellation signal
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every evaluation using this handle
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear a previous cancellation request
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Evaluation context
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    interrupt: Interrupt,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context observing an existing interrupt handle
    pub fn with_interrupt(interrupt: Interrupt) -> Self {
        QueryContext { interrupt }
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Fail with `Interrupted` if cancellation was requested
    #[inline]
    pub fn check_stop(&self) -> QueryResult<()> {
        if self.interrupt.is_cancelled() {
            Err(QueryError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Optimizer diagnostics
#[derive(Debug, Default)]
pub struct CompileContext {
    infos: Vec<String>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rewrite
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        self.infos.push(message);
    }

    /// Recorded rewrites, in the order they were applied
    pub fn infos(&self) -> &[String] {
        &self.infos
    }
}
