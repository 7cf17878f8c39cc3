//! ResourceArc Wrappers
//!
//! Persistent database state shared with the BEAM.

use std::sync::{Mutex, PoisonError};

use rustler::ResourceArc;

use crate::database::Database;
use crate::query::{Interrupt, QueryContext};

/// Wrapper for a Database that can be stored in a ResourceArc
pub struct DatabaseResource {
    pub db: Database,
    /// Interrupt observed by the queries started since the last cancel
    interrupt: Mutex<Interrupt>,
}

impl DatabaseResource {
    pub fn new(db: Database) -> Self {
        DatabaseResource {
            db,
            interrupt: Mutex::new(Interrupt::new()),
        }
    }

    /// Context for a new query
    pub fn query_context(&self) -> QueryContext {
        let interrupt = self.interrupt.lock().unwrap_or_else(PoisonError::into_inner);
        QueryContext::with_interrupt(interrupt.clone())
    }

    /// Cancel every running query; later queries start with a fresh handle
    pub fn cancel(&self) {
        let mut interrupt = self.interrupt.lock().unwrap_or_else(PoisonError::into_inner);
        interrupt.cancel();
        *interrupt = Interrupt::new();
    }
}

#[rustler::resource_impl]
impl rustler::Resource for DatabaseResource {}

/// Type alias for database ResourceArc
pub type DatabaseRef = ResourceArc<DatabaseResource>;
