//! Transient object registry.
//!
//! # Invariants
//! - Handles are kept in creation order, each at most once.
//! - Every recorded handle came from a non-permanent creation.
//! - Draining yields newest first, so dependents are deleted before the
//!   objects they reference.

use crate::model::handle::Handle;

#[derive(Debug, Default)]
pub struct TransientRegistry {
    handles: Vec<Handle>,
}

impl TransientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handle` unless it is already tracked. Returns whether it was
    /// added.
    pub fn record(&mut self, handle: Handle) -> bool {
        if self.handles.contains(&handle) {
            return false;
        }
        self.handles.push(handle);
        true
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.handles.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in creation order.
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    /// Empties the registry, returning its handles newest first.
    pub fn drain_newest_first(&mut self) -> Vec<Handle> {
        let mut drained = std::mem::take(&mut self.handles);
        drained.reverse();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::TransientRegistry;
    use crate::model::handle::Handle;

    #[test]
    fn drains_in_reverse_creation_order() {
        let mut registry = TransientRegistry::new();
        for label in ["h1", "h2", "h3"] {
            registry.record(Handle::from(label));
        }

        let drained = registry.drain_newest_first();
        assert_eq!(
            drained,
            vec![Handle::from("h3"), Handle::from("h2"), Handle::from("h1")]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn draining_empty_registry_is_a_no_op() {
        let mut registry = TransientRegistry::new();
        assert!(registry.drain_newest_first().is_empty());
        assert!(registry.drain_newest_first().is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn recording_the_same_handle_twice_keeps_one_entry() {
        let mut registry = TransientRegistry::new();
        assert!(registry.record(Handle::from("P")));
        assert!(!registry.record(Handle::from("P")));
        assert_eq!(registry.handles(), &[Handle::from("P")]);
    }
}
