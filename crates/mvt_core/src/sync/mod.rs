//! Creation/liveness synchronization core.
//!
//! # Responsibility
//! - Make "submit a command, then wait until its object is alive" behave as
//!   one asynchronous operation regardless of notification order.
//!
//! # Invariants
//! - Single-threaded: all state is `Rc`/`RefCell` owned and never crosses
//!   threads. Suspension happens only while awaiting a `Creation`.

pub mod creation;
pub mod liveness;
pub mod tracker;
