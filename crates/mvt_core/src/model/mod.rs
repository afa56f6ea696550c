//! Value types shared by the synchronization core and the scene.
//!
//! # Responsibility
//! - Name objects living in the external store (`Handle`).
//! - Describe display colors independent of any host API (`Color`).

pub mod color;
pub mod handle;
