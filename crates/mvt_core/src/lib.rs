//! Core of the mean-value-theorem scene.
//! Synchronizes construction commands with an external object store and
//! rebuilds the subdivision construction on input changes.

pub mod config;
pub mod group;
pub mod logging;
pub mod model;
pub mod registry;
pub mod scene;
pub mod store;
pub mod sync;

pub use config::{
    AppConfig, ConfigError, ConfigValidationError, GroupSpec, LoggingConfig, SceneConfig,
};
pub use group::visibility::{GroupError, VisibilityGroups};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::color::{Color, ColorParseError};
pub use model::handle::Handle;
pub use registry::transient::TransientRegistry;
pub use scene::session::MvtScene;
pub use scene::{SceneAnchors, SceneContext, SceneError};
pub use store::memory::{AliveDelivery, InMemoryStore, StoreCall, StoredObject};
pub use store::ObjectStore;
pub use sync::creation::{CreateOptions, Creation, CreationError};
pub use sync::tracker::CreationTracker;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
