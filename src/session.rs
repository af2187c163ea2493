//! Per-session storage of the most recent [`Run`].
//!
//! Each session id owns its own slot guarded by its own mutex. [`SessionMemory::transact`]
//! holds that mutex for the whole closure, so a load-run-store sequence on one
//! session cannot interleave with another on the same id. Different ids only
//! share the brief lookup of their slot.

use crate::run::Run;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot<S> = Arc<Mutex<Option<Run<S>>>>;

pub struct SessionMemory<S> {
    sessions: Mutex<HashMap<String, Slot<S>>>,
}

impl<S> Default for SessionMemory<S> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Slot writes are single assignments, so a poisoned lock still holds a whole value.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Clone> SessionMemory<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a session exists. Calling it again is a no-op.
    pub fn create_session(&self, id: &str) {
        self.slot(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.sessions).contains_key(id)
    }

    /// Store `run` as the latest run of `id`, replacing any earlier one.
    pub fn add(&self, run: Run<S>, id: &str) {
        let slot = self.slot(id);
        *lock(&slot) = Some(run);
    }

    /// The latest run stored for `id`.
    pub fn get_last(&self, id: &str) -> Option<Run<S>> {
        let slot = lock(&self.sessions).get(id).cloned()?;
        lock(&slot).clone()
    }

    /// Forget a session, returning its latest run.
    pub fn remove(&self, id: &str) -> Option<Run<S>> {
        let slot = lock(&self.sessions).remove(id)?;
        lock(&slot).take()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.sessions).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` with exclusive access to the session's latest run, creating the
    /// session if needed.
    pub fn transact<T>(&self, id: &str, f: impl FnOnce(&mut Option<Run<S>>) -> T) -> T {
        let slot = self.slot(id);
        let mut guard = lock(&slot);
        f(&mut guard)
    }

    fn slot(&self, id: &str) -> Slot<S> {
        let mut sessions = lock(&self.sessions);
        Arc::clone(sessions.entry(id.to_string()).or_default())
    }
}
