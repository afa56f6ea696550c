//! External object store contract.
//!
//! # Responsibility
//! - Describe the host API the core drives: construction commands, deletion,
//!   liveness/update notifications and cosmetic setters.
//! - Keep host specifics out of the synchronization core.
//!
//! # Invariants
//! - All calls are synchronous and single-threaded.
//! - Creation acknowledgement (`submit_creation_command`) and liveness
//!   (`register_alive_listener`) are independent channels with no ordering
//!   guarantee between them.
//! - Implementations must not hold internal borrows while invoking listeners;
//!   listeners are allowed to re-enter the store.

use crate::model::color::Color;
use crate::model::handle::Handle;
use std::rc::Rc;

pub mod memory;

/// Global callback fired once per handle whenever its object becomes usable.
pub type AliveListener = Rc<dyn Fn(&Handle)>;

/// Callback fired whenever the watched object's value changes.
pub type UpdateListener = Rc<dyn Fn(&Handle)>;

/// Host object store API.
pub trait ObjectStore {
    /// Evaluates one construction command.
    ///
    /// Returns the comma-separated labels of created objects, or `None` when
    /// the store failed to evaluate the command.
    fn submit_creation_command(&self, command: &str) -> Option<String>;

    /// Evaluates a non-creational command (`SetCoords(..)` and similar).
    fn eval_command(&self, command: &str) -> bool;

    fn delete_handle(&self, handle: &Handle);

    fn register_alive_listener(&self, listener: AliveListener);

    fn register_update_listener(&self, handle: &Handle, listener: UpdateListener);

    fn get_value(&self, handle: &Handle) -> f64;

    fn set_value(&self, handle: &Handle, value: f64);

    fn is_defined(&self, handle: &Handle) -> bool;

    fn set_visible(&self, handle: &Handle, visible: bool);

    fn set_label_visible(&self, handle: &Handle, visible: bool);

    fn set_color(&self, handle: &Handle, color: Color);

    fn set_layer(&self, handle: &Handle, layer: u8);

    /// Fill opacity in `[0, 1]`.
    fn set_filling(&self, handle: &Handle, opacity: f64);

    fn set_fixed(&self, handle: &Handle, fixed: bool, selection_allowed: bool);

    fn set_caption(&self, handle: &Handle, caption: &str);

    fn set_line_thickness(&self, handle: &Handle, thickness: u32);

    /// Serialized object definition, if the object exists.
    fn xml(&self, handle: &Handle) -> Option<String>;

    fn eval_xml(&self, xml: &str);
}
