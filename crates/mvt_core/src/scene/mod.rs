//! Mean-value-theorem scene built on the synchronization core.
//!
//! # Responsibility
//! - Bootstrap the permanent objects and controls of the scene.
//! - Rebuild the transient subdivision construction whenever a watched input
//!   changes.
//!
//! # Invariants
//! - Every construction step awaits the previous step's `Creation`; commands
//!   only reference handles that are already alive.
//! - A rebuild always starts with a tracker reset followed by clearing the
//!   temporary group members.

use crate::config::{ConfigValidationError, SceneConfig, MAX_DIVISIONS};
use crate::group::visibility::{GroupError, VisibilityGroups};
use crate::model::handle::Handle;
use crate::store::ObjectStore;
use crate::sync::creation::{CreateOptions, CreationError};
use crate::sync::tracker::CreationTracker;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub mod controls;
pub mod divisions;
pub mod session;
pub mod style;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    Config(ConfigValidationError),
    Creation(CreationError),
    Group(GroupError),
    InvalidDivisionCount(u32),
    /// A reset happened after this construction started.
    Superseded { started: u64, current: u64 },
    Spawn(String),
}

impl SceneError {
    /// Whether the failure only means a newer rebuild superseded this one.
    pub fn is_superseded(&self) -> bool {
        matches!(
            self,
            Self::Superseded { .. } | Self::Creation(CreationError::Abandoned(_))
        )
    }
}

impl Display for SceneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid scene config: {err}"),
            Self::Creation(err) => write!(f, "{err}"),
            Self::Group(err) => write!(f, "{err}"),
            Self::InvalidDivisionCount(value) => {
                write!(f, "division count must be within 1..={MAX_DIVISIONS}, got {value}")
            }
            Self::Superseded { started, current } => write!(
                f,
                "construction of generation {started} superseded by generation {current}"
            ),
            Self::Spawn(message) => write!(f, "failed to schedule rebuild: {message}"),
        }
    }
}

impl Error for SceneError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Creation(err) => Some(err),
            Self::Group(err) => Some(err),
            Self::InvalidDivisionCount(_) | Self::Superseded { .. } | Self::Spawn(_) => None,
        }
    }
}

impl From<ConfigValidationError> for SceneError {
    fn from(value: ConfigValidationError) -> Self {
        Self::Config(value)
    }
}

impl From<CreationError> for SceneError {
    fn from(value: CreationError) -> Self {
        Self::Creation(value)
    }
}

impl From<GroupError> for SceneError {
    fn from(value: GroupError) -> Self {
        Self::Group(value)
    }
}

/// Permanent objects the transient construction refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneAnchors {
    pub function: Handle,
    pub derivative: Handle,
    pub start_point: Handle,
    pub end_point: Handle,
    /// Integral of the derivative over the interval.
    pub integral_area: Handle,
    /// `x_{AB}(i)`: abscissa where the i-th division begins.
    pub division_abscissa: Handle,
    /// Screen row below the controls where area texts are attached.
    pub text_anchor_y: u32,
}

impl Default for SceneAnchors {
    fn default() -> Self {
        Self {
            function: Handle::from("f"),
            derivative: Handle::from("f'"),
            start_point: Handle::from("A"),
            end_point: Handle::from("B"),
            integral_area: Handle::from("A_{f'}"),
            division_abscissa: Handle::from("x_{AB}"),
            text_anchor_y: 0,
        }
    }
}

/// Everything a construction step needs, cheap to clone into tasks.
#[derive(Clone)]
pub struct SceneContext {
    pub(crate) store: Rc<dyn ObjectStore>,
    pub(crate) tracker: CreationTracker,
    pub(crate) groups: VisibilityGroups,
    pub(crate) config: Rc<SceneConfig>,
    pub(crate) anchors: Rc<SceneAnchors>,
    /// Tracker generation this context builds for.
    pub(crate) generation: u64,
}

impl SceneContext {
    pub fn new(
        tracker: CreationTracker,
        groups: VisibilityGroups,
        config: SceneConfig,
        anchors: SceneAnchors,
    ) -> Self {
        Self {
            store: Rc::clone(tracker.store()),
            generation: tracker.generation(),
            tracker,
            groups,
            config: Rc::new(config),
            anchors: Rc::new(anchors),
        }
    }

    pub fn tracker(&self) -> &CreationTracker {
        &self.tracker
    }

    pub fn groups(&self) -> &VisibilityGroups {
        &self.groups
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn anchors(&self) -> &SceneAnchors {
        &self.anchors
    }

    /// Same context bound to another tracker generation.
    pub(crate) fn for_generation(&self, generation: u64) -> Self {
        Self {
            generation,
            ..self.clone()
        }
    }

    /// Fails once the tracker was reset after this context's generation.
    pub(crate) fn ensure_current(&self) -> Result<(), SceneError> {
        let current = self.tracker.generation();
        if current != self.generation {
            return Err(SceneError::Superseded {
                started: self.generation,
                current,
            });
        }
        Ok(())
    }

    /// Transient creation without secondary callback.
    pub(crate) async fn create(&self, command: &str) -> Result<Handle, SceneError> {
        self.create_with(command, CreateOptions::new()).await
    }

    pub(crate) async fn create_with(
        &self,
        command: &str,
        options: CreateOptions,
    ) -> Result<Handle, SceneError> {
        self.ensure_current()?;
        Ok(self.tracker.create(command, options).await?)
    }

    /// Registers a transient member and hides its label.
    pub(crate) fn show_in(&self, handle: &Handle, group: &str) -> Result<(), SceneError> {
        self.ensure_current()?;
        self.store.set_label_visible(handle, false);
        self.groups.register(handle, group, false)?;
        Ok(())
    }
}
