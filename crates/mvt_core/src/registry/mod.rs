//! Bookkeeping of store objects created since the last teardown.

pub mod transient;
