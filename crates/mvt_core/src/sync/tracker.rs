//! Creation tracker: command execution, liveness routing and teardown.
//!
//! # Responsibility
//! - Turn one construction command into a future of its primary handle that
//!   resolves only once the store reports that handle alive.
//! - Track every non-permanent handle and tear all of them down on `reset`.
//!
//! # Invariants
//! - A rejected command registers nothing, except `DuplicateInterest` where
//!   the objects already exist and are recorded for the next teardown.
//! - Continuations are fired after the interior borrow is released.
//! - After `reset`, no handle, unmatched notification or parked continuation
//!   from before the reset survives.

use crate::model::handle::Handle;
use crate::registry::transient::TransientRegistry;
use crate::store::ObjectStore;
use crate::sync::creation::{CreateOptions, Creation, CreationError};
use crate::sync::liveness::{Claim, Continuation, LivenessRouter};
use futures::channel::oneshot;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct TrackerState {
    router: LivenessRouter,
    transient: TransientRegistry,
    generation: u64,
}

/// Shared handle to one scene's synchronization state.
#[derive(Clone)]
pub struct CreationTracker {
    store: Rc<dyn ObjectStore>,
    state: Rc<RefCell<TrackerState>>,
}

impl CreationTracker {
    /// Creates a tracker without registering it with the store.
    ///
    /// Liveness must then be forwarded through `on_alive`.
    pub fn new(store: Rc<dyn ObjectStore>) -> Self {
        Self {
            store,
            state: Rc::new(RefCell::new(TrackerState::default())),
        }
    }

    /// Creates a tracker and registers it as the store's alive listener.
    pub fn attach(store: Rc<dyn ObjectStore>) -> Self {
        let tracker = Self::new(Rc::clone(&store));
        let weak = Rc::downgrade(&tracker.state);
        store.register_alive_listener(Rc::new(move |handle: &Handle| {
            if let Some(state) = weak.upgrade() {
                route_alive(&state, handle);
            }
        }));
        tracker
    }

    /// Store-facing entry point for "object became alive".
    pub fn on_alive(&self, handle: &Handle) {
        route_alive(&self.state, handle);
    }

    /// Submits `command` and returns a future of its primary handle.
    ///
    /// The command is evaluated synchronously. Continuations of handles that
    /// were already reported alive run before this call returns.
    pub fn create(&self, command: &str, options: CreateOptions) -> Creation {
        if command.contains(['\n', '\r']) {
            warn!(
                "event=create module=sync status=error error_code=illegal_multi_command command_len={}",
                command.len()
            );
            return Creation::failed(CreationError::IllegalMultiCommand(command.to_string()));
        }

        let Some(raw) = self.store.submit_creation_command(command) else {
            error!(
                "event=create module=sync status=error error_code=evaluation_failed command={command}"
            );
            return Creation::failed(CreationError::EvaluationFailed(command.to_string()));
        };

        let handles = Handle::parse_list(&raw);
        let Some((primary, secondaries)) = handles.split_first() else {
            error!(
                "event=create module=sync status=error error_code=no_objects_created command={command}"
            );
            return Creation::failed(CreationError::NoObjectsCreated(command.to_string()));
        };

        let (alive, ready) = {
            let mut state = self.state.borrow_mut();
            if !options.permanent {
                for handle in &handles {
                    state.transient.record(handle.clone());
                }
            }

            let interested = std::iter::once(primary).chain(
                secondaries
                    .iter()
                    .filter(|_| options.on_secondary_alive.is_some()),
            );
            for handle in interested {
                if state.router.has_interest(handle) {
                    warn!(
                        "event=create module=sync status=error error_code=duplicate_interest handle={handle}"
                    );
                    return Creation::failed(CreationError::DuplicateInterest(handle.clone()));
                }
            }

            let mut ready = Vec::new();
            if let Some(callback) = &options.on_secondary_alive {
                for handle in secondaries {
                    let continuation = Continuation::Secondary(Rc::clone(callback));
                    if let Claim::Alive(continuation) = state.router.claim(handle, continuation) {
                        ready.push((handle.clone(), continuation));
                    }
                }
            }

            let (sender, alive) = oneshot::channel();
            if let Claim::Alive(continuation) =
                state.router.claim(primary, Continuation::Primary(sender))
            {
                ready.push((primary.clone(), continuation));
            }
            (alive, ready)
        };

        debug!(
            "event=create module=sync status=ok primary={primary} secondary_count={} permanent={} already_alive={}",
            secondaries.len(),
            options.permanent,
            ready.len()
        );
        for (handle, continuation) in ready {
            continuation.fire(&handle);
        }
        Creation::waiting(primary.clone(), alive)
    }

    /// Deletes every transient handle, newest first, then forgets all
    /// liveness bookkeeping.
    ///
    /// Pending `Creation` futures from before the reset resolve to
    /// `CreationError::Abandoned`.
    pub fn reset(&self) {
        let doomed = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.router.clear();
            state.transient.drain_newest_first()
        };

        for handle in &doomed {
            self.store.delete_handle(handle);
        }

        let generation = {
            let mut state = self.state.borrow_mut();
            state.router.clear();
            state.generation
        };
        info!(
            "event=reset module=sync status=ok deleted={} generation={generation}",
            doomed.len()
        );
    }

    /// Number of resets performed so far.
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Transient handles in creation order.
    pub fn transient_handles(&self) -> Vec<Handle> {
        self.state.borrow().transient.handles().to_vec()
    }

    pub fn is_transient(&self, handle: &Handle) -> bool {
        self.state.borrow().transient.contains(handle)
    }

    pub fn pending_interest_count(&self) -> usize {
        self.state.borrow().router.pending_interest_count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.state.borrow().router.unmatched_count()
    }

    pub fn store(&self) -> &Rc<dyn ObjectStore> {
        &self.store
    }
}

fn route_alive(state: &RefCell<TrackerState>, handle: &Handle) {
    let continuation = state.borrow_mut().router.notify_alive(handle);
    if let Some(continuation) = continuation {
        continuation.fire(handle);
    }
}
