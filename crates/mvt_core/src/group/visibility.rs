//! Visibility groups.
//!
//! # Responsibility
//! - Color and layer every registered handle by its group.
//! - Apply each group's toggle value to all of its members.
//!
//! # Invariants
//! - A handle belongs to at most one group at a time.
//! - Temporary members are forgotten by `clear_temporary`, never deleted.
//! - Permanent members stay for the lifetime of the groups.
//! - Store calls happen after the interior borrow is released.

use crate::config::GroupSpec;
use crate::model::handle::Handle;
use crate::store::ObjectStore;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};

/// Toggle values at or above this count as "visible".
const TOGGLE_VISIBLE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    UnknownGroup(String),
    AlreadyGrouped { handle: Handle, group: String },
    ToggleAlreadyBound(String),
}

impl Display for GroupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownGroup(key) => write!(f, "unknown group: {key}"),
            Self::AlreadyGrouped { handle, group } => {
                write!(f, "handle `{handle}` already belongs to group {group}")
            }
            Self::ToggleAlreadyBound(key) => write!(f, "group {key} already has a toggle"),
        }
    }
}

impl Error for GroupError {}

#[derive(Debug)]
struct Group {
    spec: GroupSpec,
    toggle: Option<Handle>,
    temporary: Vec<Handle>,
    permanent: Vec<Handle>,
}

#[derive(Debug, Default)]
struct GroupTable {
    groups: Vec<Group>,
    membership: BTreeMap<Handle, usize>,
}

impl GroupTable {
    fn index_of(&self, key: &str) -> Result<usize, GroupError> {
        self.groups
            .iter()
            .position(|group| group.spec.key == key)
            .ok_or_else(|| GroupError::UnknownGroup(key.to_string()))
    }
}

/// Shared handle to the scene's display groups.
#[derive(Clone)]
pub struct VisibilityGroups {
    store: Rc<dyn ObjectStore>,
    table: Rc<RefCell<GroupTable>>,
}

impl VisibilityGroups {
    /// Creates one empty group per spec, keeping spec order.
    pub fn new(store: Rc<dyn ObjectStore>, specs: &[GroupSpec]) -> Self {
        let groups = specs
            .iter()
            .map(|spec| Group {
                spec: spec.clone(),
                toggle: None,
                temporary: Vec::new(),
                permanent: Vec::new(),
            })
            .collect();
        Self {
            store,
            table: Rc::new(RefCell::new(GroupTable {
                groups,
                membership: BTreeMap::new(),
            })),
        }
    }

    /// Adds `handle` to `group` and applies the group's color and layer.
    pub fn register(
        &self,
        handle: &Handle,
        group: &str,
        permanent: bool,
    ) -> Result<(), GroupError> {
        let (color, layer) = {
            let mut table = self.table.borrow_mut();
            let index = table.index_of(group)?;
            if let Some(existing) = table.membership.get(handle) {
                return Err(GroupError::AlreadyGrouped {
                    handle: handle.clone(),
                    group: table.groups[*existing].spec.key.clone(),
                });
            }

            table.membership.insert(handle.clone(), index);
            let entry = &mut table.groups[index];
            if permanent {
                entry.permanent.push(handle.clone());
            } else {
                entry.temporary.push(handle.clone());
            }
            (entry.spec.color, entry.spec.layer)
        };

        self.store.set_color(handle, color);
        self.store.set_layer(handle, layer);
        Ok(())
    }

    /// Forgets every temporary member of every group.
    pub fn clear_temporary(&self) {
        let mut table = self.table.borrow_mut();
        let GroupTable { groups, membership } = &mut *table;
        for group in groups.iter_mut() {
            for handle in group.temporary.drain(..) {
                membership.remove(&handle);
            }
        }
    }

    /// Binds `toggle` to `group` and applies the group whenever the toggle
    /// value changes in the store.
    pub fn bind_toggle(&self, group: &str, toggle: Handle) -> Result<(), GroupError> {
        let index = {
            let mut table = self.table.borrow_mut();
            let index = table.index_of(group)?;
            let entry = &mut table.groups[index];
            if entry.toggle.is_some() {
                return Err(GroupError::ToggleAlreadyBound(group.to_string()));
            }
            entry.toggle = Some(toggle.clone());
            index
        };

        let store = Rc::clone(&self.store);
        let table: Weak<RefCell<GroupTable>> = Rc::downgrade(&self.table);
        self.store.register_update_listener(
            &toggle,
            Rc::new(move |_: &Handle| {
                if let Some(table) = table.upgrade() {
                    apply_group(store.as_ref(), &table, index);
                }
            }),
        );
        Ok(())
    }

    /// Applies one group's toggle to its members.
    pub fn apply(&self, group: &str) -> Result<(), GroupError> {
        let index = self.table.borrow().index_of(group)?;
        apply_group(self.store.as_ref(), &self.table, index);
        Ok(())
    }

    /// Re-applies every bound toggle.
    pub fn apply_all(&self) {
        let count = self.table.borrow().groups.len();
        for index in 0..count {
            apply_group(self.store.as_ref(), &self.table, index);
        }
    }

    /// Group specs in declaration order.
    pub fn specs(&self) -> Vec<GroupSpec> {
        self.table
            .borrow()
            .groups
            .iter()
            .map(|group| group.spec.clone())
            .collect()
    }

    pub fn toggle_of(&self, group: &str) -> Option<Handle> {
        let table = self.table.borrow();
        let index = table.index_of(group).ok()?;
        table.groups[index].toggle.clone()
    }

    pub fn temporary_members(&self, group: &str) -> Result<Vec<Handle>, GroupError> {
        let table = self.table.borrow();
        let index = table.index_of(group)?;
        Ok(table.groups[index].temporary.clone())
    }

    pub fn permanent_members(&self, group: &str) -> Result<Vec<Handle>, GroupError> {
        let table = self.table.borrow();
        let index = table.index_of(group)?;
        Ok(table.groups[index].permanent.clone())
    }

    /// Key of the group `handle` belongs to, if any.
    pub fn group_of(&self, handle: &Handle) -> Option<String> {
        let table = self.table.borrow();
        let index = *table.membership.get(handle)?;
        Some(table.groups[index].spec.key.clone())
    }
}

fn apply_group(store: &dyn ObjectStore, table: &RefCell<GroupTable>, index: usize) {
    let (toggle, members) = {
        let table = table.borrow();
        let Some(group) = table.groups.get(index) else {
            return;
        };
        let members: Vec<Handle> = group
            .temporary
            .iter()
            .chain(group.permanent.iter())
            .cloned()
            .collect();
        (group.toggle.clone(), members)
    };
    let Some(toggle) = toggle else {
        return;
    };

    let visible = store.get_value(&toggle) >= TOGGLE_VISIBLE_THRESHOLD;
    for member in &members {
        store.set_visible(member, visible);
    }
    debug!(
        "event=group_apply module=group status=ok toggle={toggle} visible={visible} members={}",
        members.len()
    );
}
