//! Creation request options, errors and the `Creation` future.

use crate::model::handle::Handle;
use crate::sync::liveness::SecondaryContinuation;
use futures::channel::oneshot;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Failure of one `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationError {
    /// The command holds more than one statement; the store was not contacted.
    IllegalMultiCommand(String),
    /// The store returned its failure sentinel.
    EvaluationFailed(String),
    /// The store evaluated the command but named no created object.
    NoObjectsCreated(String),
    /// A continuation was already parked for this handle.
    DuplicateInterest(Handle),
    /// A reset discarded the continuation before the handle became alive.
    Abandoned(Handle),
}

impl Display for CreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalMultiCommand(command) => write!(
                f,
                "illegal multi-command: more than one statement in `{command}`"
            ),
            Self::EvaluationFailed(command) => write!(f, "evaluation failed: `{command}`"),
            Self::NoObjectsCreated(command) => {
                write!(f, "no objects created by command `{command}`")
            }
            Self::DuplicateInterest(handle) => {
                write!(f, "liveness interest already registered for `{handle}`")
            }
            Self::Abandoned(handle) => {
                write!(f, "creation of `{handle}` abandoned by a reset")
            }
        }
    }
}

impl Error for CreationError {}

/// Options of one `create` call.
#[derive(Clone, Default)]
pub struct CreateOptions {
    pub(crate) permanent: bool,
    pub(crate) on_secondary_alive: Option<SecondaryContinuation>,
}

impl CreateOptions {
    /// Transient creation without secondary callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes every handle of the command from the transient registry.
    pub fn permanent() -> Self {
        Self {
            permanent: true,
            on_secondary_alive: None,
        }
    }

    /// Runs `callback` once for each secondary handle when it becomes alive.
    pub fn on_secondary_alive(mut self, callback: impl Fn(&Handle) + 'static) -> Self {
        self.on_secondary_alive = Some(Rc::new(callback));
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }
}

enum CreationState {
    Settled(Result<Handle, CreationError>),
    Waiting {
        handle: Handle,
        alive: oneshot::Receiver<Handle>,
    },
}

/// Future of one creation; resolves with the primary handle once it is alive.
#[must_use = "a creation does nothing useful unless awaited"]
pub struct Creation {
    state: CreationState,
}

impl Creation {
    pub(crate) fn failed(error: CreationError) -> Self {
        Self {
            state: CreationState::Settled(Err(error)),
        }
    }

    pub(crate) fn waiting(handle: Handle, alive: oneshot::Receiver<Handle>) -> Self {
        Self {
            state: CreationState::Waiting { handle, alive },
        }
    }

    /// Primary handle named by the store, if the command was accepted.
    pub fn handle(&self) -> Option<&Handle> {
        match &self.state {
            CreationState::Settled(Ok(handle)) => Some(handle),
            CreationState::Settled(Err(_)) => None,
            CreationState::Waiting { handle, .. } => Some(handle),
        }
    }
}

impl Future for Creation {
    type Output = Result<Handle, CreationError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let settled = match &mut this.state {
            CreationState::Settled(result) => return Poll::Ready(result.clone()),
            CreationState::Waiting { handle, alive } => match Pin::new(alive).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(alive_handle)) => Ok(alive_handle),
                Poll::Ready(Err(oneshot::Canceled)) => {
                    Err(CreationError::Abandoned(handle.clone()))
                }
            },
        };
        this.state = CreationState::Settled(settled.clone());
        Poll::Ready(settled)
    }
}
