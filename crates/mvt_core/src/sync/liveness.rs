//! Liveness routing between creation acknowledgements and alive notifications.
//!
//! # Responsibility
//! - Pair each "object became alive" notification with the continuation a
//!   creation registered for that handle, in whichever order they arrive.
//!
//! # Invariants
//! - At most one handshake entry exists per handle.
//! - A resolved handshake is removed; its continuation runs exactly once.
//! - The router never invokes continuations itself. It hands them back to
//!   the caller, which fires them once its own borrows are released.

use crate::model::handle::Handle;
use futures::channel::oneshot;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Callback run when a secondary handle of a creation becomes alive.
pub type SecondaryContinuation = Rc<dyn Fn(&Handle)>;

/// Work to run once a handle is alive.
pub enum Continuation {
    /// Resolves the `Creation` future of the command's primary handle.
    Primary(oneshot::Sender<Handle>),
    Secondary(SecondaryContinuation),
}

impl Continuation {
    pub fn fire(self, handle: &Handle) {
        match self {
            // A dropped receiver means nobody awaits the creation anymore.
            Self::Primary(sender) => {
                let _ = sender.send(handle.clone());
            }
            Self::Secondary(callback) => callback(handle),
        }
    }
}

impl Debug for Continuation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary(_) => f.write_str("Continuation::Primary"),
            Self::Secondary(_) => f.write_str("Continuation::Secondary"),
        }
    }
}

/// Two-phase handshake state of one handle.
#[derive(Debug)]
enum Handshake {
    /// Alive was reported, but no creation has claimed the handle yet.
    AwaitingCreationAck,
    /// A creation claimed the handle; liveness has not been reported yet.
    AwaitingLiveness(Continuation),
}

/// Result of claiming a handle for a continuation.
#[derive(Debug)]
pub enum Claim {
    /// Liveness already arrived; the caller must fire the continuation now.
    Alive(Continuation),
    /// Parked until the store reports the handle alive.
    Parked,
}

/// Per-handle handshake table.
#[derive(Debug, Default)]
pub struct LivenessRouter {
    handshakes: BTreeMap<Handle, Handshake>,
}

impl LivenessRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `handle` became alive.
    ///
    /// Returns the continuation to fire when a creation was waiting for it;
    /// otherwise the handle stays unclaimed until a creation claims it.
    pub fn notify_alive(&mut self, handle: &Handle) -> Option<Continuation> {
        match self.handshakes.remove(handle) {
            Some(Handshake::AwaitingLiveness(continuation)) => Some(continuation),
            Some(Handshake::AwaitingCreationAck) | None => {
                self.handshakes
                    .insert(handle.clone(), Handshake::AwaitingCreationAck);
                None
            }
        }
    }

    /// Whether a continuation is already parked for `handle`.
    pub fn has_interest(&self, handle: &Handle) -> bool {
        matches!(
            self.handshakes.get(handle),
            Some(Handshake::AwaitingLiveness(_))
        )
    }

    /// Attaches `continuation` to `handle`.
    ///
    /// Callers must check `has_interest` first; claiming a handle that
    /// already has a parked continuation replaces it.
    pub fn claim(&mut self, handle: &Handle, continuation: Continuation) -> Claim {
        match self.handshakes.remove(handle) {
            Some(Handshake::AwaitingCreationAck) => Claim::Alive(continuation),
            Some(Handshake::AwaitingLiveness(_)) | None => {
                self.handshakes
                    .insert(handle.clone(), Handshake::AwaitingLiveness(continuation));
                Claim::Parked
            }
        }
    }

    pub fn pending_interest_count(&self) -> usize {
        self.handshakes
            .values()
            .filter(|state| matches!(state, Handshake::AwaitingLiveness(_)))
            .count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.handshakes
            .values()
            .filter(|state| matches!(state, Handshake::AwaitingCreationAck))
            .count()
    }

    /// Drops every handshake. Parked primary continuations are dropped with
    /// their senders, which abandons the matching `Creation` futures.
    pub fn clear(&mut self) {
        self.handshakes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Claim, Continuation, LivenessRouter};
    use crate::model::handle::Handle;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording() -> (Rc<RefCell<Vec<Handle>>>, Continuation) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let continuation = Continuation::Secondary(Rc::new(move |handle: &Handle| {
            sink.borrow_mut().push(handle.clone());
        }));
        (seen, continuation)
    }

    #[test]
    fn claim_before_alive_parks_then_resolves() {
        let mut router = LivenessRouter::new();
        let handle = Handle::from("a");
        let (seen, continuation) = recording();

        assert!(matches!(router.claim(&handle, continuation), Claim::Parked));
        assert_eq!(router.pending_interest_count(), 1);

        let ready = router
            .notify_alive(&handle)
            .expect("parked continuation should be returned");
        ready.fire(&handle);
        assert_eq!(*seen.borrow(), vec![handle]);
        assert_eq!(router.pending_interest_count(), 0);
        assert_eq!(router.unmatched_count(), 0);
    }

    #[test]
    fn alive_before_claim_is_returned_on_claim() {
        let mut router = LivenessRouter::new();
        let handle = Handle::from("a");
        assert!(router.notify_alive(&handle).is_none());
        assert_eq!(router.unmatched_count(), 1);

        let (_, continuation) = recording();
        assert!(matches!(router.claim(&handle, continuation), Claim::Alive(_)));
        assert_eq!(router.unmatched_count(), 0);
    }

    #[test]
    fn repeated_unclaimed_notifications_collapse() {
        let mut router = LivenessRouter::new();
        let handle = Handle::from("a");
        router.notify_alive(&handle);
        router.notify_alive(&handle);
        assert_eq!(router.unmatched_count(), 1);
    }

    #[test]
    fn has_interest_only_for_parked_continuations() {
        let mut router = LivenessRouter::new();
        let parked = Handle::from("parked");
        let unmatched = Handle::from("unmatched");
        let (_, continuation) = recording();
        router.claim(&parked, continuation);
        router.notify_alive(&unmatched);

        assert!(router.has_interest(&parked));
        assert!(!router.has_interest(&unmatched));
    }

    #[test]
    fn clear_drops_everything() {
        let mut router = LivenessRouter::new();
        let (_, continuation) = recording();
        router.claim(&Handle::from("a"), continuation);
        router.notify_alive(&Handle::from("b"));

        router.clear();
        assert_eq!(router.pending_interest_count(), 0);
        assert_eq!(router.unmatched_count(), 0);
    }
}
