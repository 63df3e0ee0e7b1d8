//! Lifecycle hooks.
//!
//! Each event has exactly one optional slot. `Queue::set_*` replaces the
//! previous hook and `Queue::clear_*` empties the slot.

use std::sync::Arc;

/// Hook for events without a payload (`saturated`, `empty`, `drain`).
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Hook receiving the error that latched the queue.
pub type ErrorHook<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub(crate) struct Hooks<E> {
    pub(crate) on_error: Option<ErrorHook<E>>,
    pub(crate) saturated: Option<Hook>,
    pub(crate) empty: Option<Hook>,
    pub(crate) drain: Option<Hook>,
}

impl<E> Default for Hooks<E> {
    fn default() -> Self {
        Self {
            on_error: None,
            saturated: None,
            empty: None,
            drain: None,
        }
    }
}
