//! In-memory object store used by tests and the CLI driver.
//!
//! # Responsibility
//! - Emulate the host store closely enough to exercise the liveness
//!   handshake in both delivery orders.
//! - Record every side-effecting call for later inspection.
//!
//! # Invariants
//! - Listeners are cloned out and invoked after the interior borrow is
//!   released, so they may call back into the store.
//! - Scripted results always take precedence over command evaluation.
//! - Queued liveness of a deleted object is dropped with the object.

use crate::model::color::Color;
use crate::model::handle::Handle;
use crate::store::{AliveListener, ObjectStore, UpdateListener};
use futures::executor::LocalPool;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

static ASSIGNMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^\s=(,]+)\s*(?:\([^)]*\))?\s*=\s*").expect("valid assignment regex")
});
static COMMAND_HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z]+)").expect("valid command head regex"));
static XML_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"label="([^"]*)""#).expect("valid xml label regex"));
static XML_OPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<lineStyle\b[^>]*\bopacity="(\d+)""#).expect("valid xml opacity regex")
});

const DEFAULT_LINE_OPACITY: u8 = 178;

/// When liveness notifications reach the registered alive listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliveDelivery {
    /// Queued until `flush_alive` (acknowledgement first, liveness later).
    #[default]
    Deferred,
    /// Fired inside `submit_creation_command` (liveness before acknowledgement).
    Immediate,
}

/// One recorded store interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create {
        command: String,
        result: Option<String>,
    },
    Eval(String),
    Delete(Handle),
    SetValue(Handle, f64),
    SetVisible(Handle, bool),
    SetLabelVisible(Handle, bool),
    SetColor(Handle, Color),
    SetLayer(Handle, u8),
    SetFilling(Handle, f64),
    SetFixed(Handle, bool, bool),
    SetCaption(Handle, String),
    SetLineThickness(Handle, u32),
    EvalXml(String),
}

/// Snapshot of one object held by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub definition: String,
    pub value: f64,
    pub defined: bool,
    pub visible: bool,
    pub label_visible: bool,
    pub color: Option<Color>,
    pub layer: u8,
    pub line_opacity: u8,
}

impl StoredObject {
    fn new(definition: &str, value: f64) -> Self {
        Self {
            definition: definition.to_string(),
            value,
            defined: true,
            visible: true,
            label_visible: true,
            color: None,
            layer: 0,
            line_opacity: DEFAULT_LINE_OPACITY,
        }
    }
}

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<Handle, StoredObject>,
    scripted: VecDeque<Option<String>>,
    pending_alive: VecDeque<Handle>,
    alive_listeners: Vec<AliveListener>,
    update_listeners: BTreeMap<Handle, Vec<UpdateListener>>,
    calls: Vec<StoreCall>,
    generated_labels: u32,
}

impl StoreState {
    fn next_generated(&mut self, prefix: &str) -> Handle {
        self.generated_labels += 1;
        Handle::new(format!("{prefix}_{{{}}}", self.generated_labels))
    }

    /// Evaluates a command the way the host would name its results.
    fn evaluate(&mut self, command: &str) -> String {
        let (primary, rhs) = match ASSIGNMENT_RE.captures(command) {
            Some(captures) => {
                let whole = captures.get(0).map_or(0, |m| m.end());
                let label = captures.get(1).map_or("", |m| m.as_str());
                (Handle::new(label), command[whole..].trim())
            }
            None => {
                let head = COMMAND_HEAD_RE
                    .captures(command)
                    .and_then(|captures| captures.get(1))
                    .map_or("object", |m| m.as_str())
                    .to_ascii_lowercase();
                (self.next_generated(&head), command.trim())
            }
        };

        let mut created = vec![primary.clone()];
        if let Some(vertices) = call_arguments(rhs, "Polygon") {
            for _ in 0..vertices.len() {
                created.push(self.next_generated("seg"));
            }
        }

        let value = initial_value(rhs);
        self.objects
            .insert(primary, StoredObject::new(command, value));
        for side in created.iter().skip(1) {
            self.objects
                .insert(side.clone(), StoredObject::new(command, 0.0));
        }

        created
            .iter()
            .map(Handle::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn object_mut(&mut self, handle: &Handle) -> Option<&mut StoredObject> {
        self.objects.get_mut(handle)
    }
}

fn call_arguments<'a>(rhs: &'a str, function: &str) -> Option<Vec<&'a str>> {
    let inner = rhs
        .strip_prefix(function)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some(
        inner
            .split(',')
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .collect(),
    )
}

fn initial_value(rhs: &str) -> f64 {
    if let Ok(value) = rhs.parse::<f64>() {
        return value;
    }
    call_arguments(rhs, "Slider")
        .and_then(|args| args.first().and_then(|min| min.parse::<f64>().ok()))
        .unwrap_or(0.0)
}

/// Scriptable single-threaded object store.
#[derive(Default)]
pub struct InMemoryStore {
    delivery: AliveDelivery,
    state: RefCell<StoreState>,
}

impl InMemoryStore {
    pub fn new(delivery: AliveDelivery) -> Self {
        Self {
            delivery,
            state: RefCell::new(StoreState::default()),
        }
    }

    /// Overrides the result of the next unscripted evaluation.
    ///
    /// `None` stands for the host's non-string failure sentinel.
    pub fn script_result(&self, result: Option<&str>) {
        self.state
            .borrow_mut()
            .scripted
            .push_back(result.map(str::to_string));
    }

    /// Fires every queued liveness notification, including ones queued
    /// while flushing. Returns how many were delivered.
    pub fn flush_alive(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                state
                    .pending_alive
                    .pop_front()
                    .map(|handle| (handle, state.alive_listeners.clone()))
            };
            let Some((handle, listeners)) = next else {
                break;
            };
            for listener in listeners {
                listener(&handle);
            }
            delivered += 1;
        }
        delivered
    }

    /// Fires a liveness notification for `handle` right now.
    pub fn deliver_alive(&self, handle: &Handle) {
        let listeners = self.state.borrow().alive_listeners.clone();
        for listener in listeners {
            listener(handle);
        }
    }

    /// Runs the executor and flushes liveness until neither makes progress.
    pub fn run_until_idle(&self, pool: &mut LocalPool) -> usize {
        let mut delivered = 0;
        loop {
            pool.run_until_stalled();
            let flushed = self.flush_alive();
            if flushed == 0 {
                return delivered;
            }
            delivered += flushed;
        }
    }

    /// Simulates the user editing an object's definition.
    pub fn redefine(&self, handle: &Handle, definition: &str, defined: bool) {
        {
            let mut state = self.state.borrow_mut();
            let object = state
                .objects
                .entry(handle.clone())
                .or_insert_with(|| StoredObject::new(definition, 0.0));
            object.definition = definition.to_string();
            object.defined = defined;
        }
        self.notify_update(handle);
    }

    /// Fires update listeners without changing any value (e.g. a drag).
    pub fn touch(&self, handle: &Handle) {
        self.notify_update(handle);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Commands submitted through `submit_creation_command`, in order.
    pub fn created_commands(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Create { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<Handle> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Delete(handle) => Some(handle.clone()),
                _ => None,
            })
            .collect()
    }

    /// Visibility values applied to `handle`, oldest first.
    pub fn visibility_calls_for(&self, handle: &Handle) -> Vec<bool> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::SetVisible(target, visible) if target == handle => Some(*visible),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.state.borrow().objects.contains_key(handle)
    }

    pub fn object(&self, handle: &Handle) -> Option<StoredObject> {
        self.state.borrow().objects.get(handle).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn pending_alive_count(&self) -> usize {
        self.state.borrow().pending_alive.len()
    }

    fn record(&self, call: StoreCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn update_object(
        &self,
        handle: &Handle,
        call: StoreCall,
        apply: impl FnOnce(&mut StoredObject),
    ) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.object_mut(handle) {
            apply(object);
        }
        state.calls.push(call);
    }

    fn notify_update(&self, handle: &Handle) {
        let listeners = self
            .state
            .borrow()
            .update_listeners
            .get(handle)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(handle);
        }
    }
}

impl ObjectStore for InMemoryStore {
    fn submit_creation_command(&self, command: &str) -> Option<String> {
        let (result, immediate) = {
            let mut state = self.state.borrow_mut();
            let result = match state.scripted.pop_front() {
                Some(scripted) => {
                    if let Some(raw) = &scripted {
                        for handle in Handle::parse_list(raw) {
                            state
                                .objects
                                .entry(handle)
                                .or_insert_with(|| StoredObject::new(command, 0.0));
                        }
                    }
                    scripted
                }
                None => Some(state.evaluate(command)),
            };

            if let Some(raw) = &result {
                state.pending_alive.extend(Handle::parse_list(raw));
            }
            state.calls.push(StoreCall::Create {
                command: command.to_string(),
                result: result.clone(),
            });
            (result, self.delivery == AliveDelivery::Immediate)
        };

        if immediate {
            self.flush_alive();
        }
        debug!(
            "event=store_eval module=store status={} command_len={}",
            if result.is_some() { "ok" } else { "error" },
            command.len()
        );
        result
    }

    fn eval_command(&self, command: &str) -> bool {
        self.record(StoreCall::Eval(command.to_string()));
        true
    }

    fn delete_handle(&self, handle: &Handle) {
        let mut state = self.state.borrow_mut();
        state.objects.remove(handle);
        // Deleted objects never report alive.
        state.pending_alive.retain(|pending| pending != handle);
        state.calls.push(StoreCall::Delete(handle.clone()));
    }

    fn register_alive_listener(&self, listener: AliveListener) {
        self.state.borrow_mut().alive_listeners.push(listener);
    }

    fn register_update_listener(&self, handle: &Handle, listener: UpdateListener) {
        self.state
            .borrow_mut()
            .update_listeners
            .entry(handle.clone())
            .or_default()
            .push(listener);
    }

    fn get_value(&self, handle: &Handle) -> f64 {
        self.state
            .borrow()
            .objects
            .get(handle)
            .map_or(0.0, |object| object.value)
    }

    fn set_value(&self, handle: &Handle, value: f64) {
        self.update_object(handle, StoreCall::SetValue(handle.clone(), value), |object| {
            object.value = value;
        });
        self.notify_update(handle);
    }

    fn is_defined(&self, handle: &Handle) -> bool {
        self.state
            .borrow()
            .objects
            .get(handle)
            .is_some_and(|object| object.defined)
    }

    fn set_visible(&self, handle: &Handle, visible: bool) {
        self.update_object(handle, StoreCall::SetVisible(handle.clone(), visible), |object| {
            object.visible = visible;
        });
    }

    fn set_label_visible(&self, handle: &Handle, visible: bool) {
        self.update_object(
            handle,
            StoreCall::SetLabelVisible(handle.clone(), visible),
            |object| object.label_visible = visible,
        );
    }

    fn set_color(&self, handle: &Handle, color: Color) {
        self.update_object(handle, StoreCall::SetColor(handle.clone(), color), |object| {
            object.color = Some(color);
        });
    }

    fn set_layer(&self, handle: &Handle, layer: u8) {
        self.update_object(handle, StoreCall::SetLayer(handle.clone(), layer), |object| {
            object.layer = layer;
        });
    }

    fn set_filling(&self, handle: &Handle, opacity: f64) {
        self.record(StoreCall::SetFilling(handle.clone(), opacity));
    }

    fn set_fixed(&self, handle: &Handle, fixed: bool, selection_allowed: bool) {
        self.record(StoreCall::SetFixed(handle.clone(), fixed, selection_allowed));
    }

    fn set_caption(&self, handle: &Handle, caption: &str) {
        self.record(StoreCall::SetCaption(handle.clone(), caption.to_string()));
    }

    fn set_line_thickness(&self, handle: &Handle, thickness: u32) {
        self.record(StoreCall::SetLineThickness(handle.clone(), thickness));
    }

    fn xml(&self, handle: &Handle) -> Option<String> {
        let state = self.state.borrow();
        let object = state.objects.get(handle)?;
        Some(format!(
            r#"<element type="object" label="{handle}"><lineStyle thickness="5" type="0" typeHidden="1" opacity="{}"/></element>"#,
            object.line_opacity
        ))
    }

    fn eval_xml(&self, xml: &str) {
        let label = XML_LABEL_RE
            .captures(xml)
            .and_then(|captures| captures.get(1))
            .map(|m| Handle::new(m.as_str()));
        let opacity = XML_OPACITY_RE
            .captures(xml)
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok());

        let mut state = self.state.borrow_mut();
        if let (Some(label), Some(opacity)) = (label, opacity) {
            if let Some(object) = state.object_mut(&label) {
                object.line_opacity = opacity;
            }
        }
        state.calls.push(StoreCall::EvalXml(xml.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::{AliveDelivery, InMemoryStore};
    use crate::model::handle::Handle;
    use crate::store::ObjectStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn labels_follow_assignment_left_hand_side() {
        let store = InMemoryStore::default();
        assert_eq!(
            store.submit_creation_command("t_{D1}(x) = 2 * x").as_deref(),
            Some("t_{D1}")
        );
        assert_eq!(
            store.submit_creation_command("Q_{f'} = Point({1, 2})").as_deref(),
            Some("Q_{f'}")
        );
        assert_eq!(
            store.submit_creation_command("InputBox(f)").as_deref(),
            Some("inputbox_{1}")
        );
    }

    #[test]
    fn polygon_yields_side_labels_as_secondary_handles() {
        let store = InMemoryStore::default();
        let raw = store
            .submit_creation_command("P = Polygon(A, B, C)")
            .expect("polygon should evaluate");
        let handles = Handle::parse_list(&raw);
        assert_eq!(handles.len(), 4);
        assert_eq!(handles[0], Handle::from("P"));
    }

    #[test]
    fn numeric_and_slider_definitions_seed_values() {
        let store = InMemoryStore::default();
        store.submit_creation_command("a = -1");
        store.submit_creation_command("k = Slider(2, 6, 1)");
        assert_eq!(store.get_value(&Handle::from("a")), -1.0);
        assert_eq!(store.get_value(&Handle::from("k")), 2.0);
    }

    #[test]
    fn deferred_delivery_waits_for_flush() {
        let store = InMemoryStore::new(AliveDelivery::Deferred);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.register_alive_listener(Rc::new(move |handle: &Handle| {
            sink.borrow_mut().push(handle.clone());
        }));

        store.submit_creation_command("a = 1");
        assert!(seen.borrow().is_empty());
        assert_eq!(store.flush_alive(), 1);
        assert_eq!(*seen.borrow(), vec![Handle::from("a")]);
    }

    #[test]
    fn scripted_failure_sentinel_is_returned_once() {
        let store = InMemoryStore::default();
        store.script_result(None);
        assert!(store.submit_creation_command("a = 1").is_none());
        assert!(store.submit_creation_command("a = 1").is_some());
    }
}
