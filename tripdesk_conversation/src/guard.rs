//! Run-once protection for session resolution.
//!
//! The host may fire resolution several times for one logical mount. The
//! guard keeps a single slot recording which external id was last resolved
//! and how far that resolution got. A repeat call for the same id while it
//! is in flight or already done is refused; a different id starts over.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    NotStarted,
    InFlight,
    /// Resolved; holds the attached session id.
    Done(String),
}

#[derive(Debug, Default)]
struct Slot {
    key: Option<String>,
    state: InitState,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct InitGuard {
    slot: Mutex<Slot>,
}

impl InitGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the right to resolve `key`. Returns `None` when a resolution
    /// for the same key is in flight or has completed.
    pub fn try_begin(&self, key: Option<&str>) -> Option<InitTicket<'_>> {
        let mut slot = self.slot();
        if slot.key.as_deref() == key && slot.state != InitState::NotStarted {
            debug!("Resolution for {key:?} already {:?}", slot.state);
            return None;
        }

        slot.key = key.map(str::to_string);
        slot.state = InitState::InFlight;
        slot.generation += 1;

        Some(InitTicket {
            guard: self,
            generation: slot.generation,
            completed: false,
        })
    }

    /// State recorded for `key`; `NotStarted` if the slot holds another key.
    #[must_use]
    pub fn state_for(&self, key: Option<&str>) -> InitState {
        let slot = self.slot();
        if slot.key.as_deref() == key {
            slot.state.clone()
        } else {
            InitState::NotStarted
        }
    }
}

/// Proof of an in-flight resolution.
///
/// Dropping a ticket without calling [`InitTicket::complete`] returns the
/// slot to `NotStarted`, so a failed resolution can be retried.
#[derive(Debug)]
pub struct InitTicket<'a> {
    guard: &'a InitGuard,
    generation: u64,
    completed: bool,
}

impl InitTicket<'_> {
    /// False once a resolution for a different key has started.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.guard.slot().generation == self.generation
    }

    /// Record success. Returns false if the ticket was superseded, in which
    /// case the slot is left untouched.
    pub fn complete(mut self, session_id: &str) -> bool {
        self.completed = true;
        let mut slot = self.guard.slot();
        if slot.generation != self.generation {
            return false;
        }
        slot.state = InitState::Done(session_id.to_string());
        true
    }
}

impl Drop for InitTicket<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut slot = self.guard.slot();
        if slot.generation == self.generation && slot.state == InitState::InFlight {
            slot.state = InitState::NotStarted;
        }
    }
}
