//! Operation lifecycle for the workshop grid: access and sequencing checks,
//! context resolution, and confirmed state transitions.

use std::sync::Arc;

use tracing::warn;

pub mod access;
pub mod backend;
pub mod clock;
pub mod comments;
pub mod context;
pub mod directory;
pub mod error;
pub mod grid;
pub mod info;
pub mod sequence;
pub mod surface;
pub mod synchronizer;

pub use access::AccessValidator;
pub use backend::OperationBackend;
pub use clock::{Clock, FixedClock, SystemClock};
pub use comments::{CommentOutcome, CommentReport};
pub use context::{OperationContext, OperationContextResolver};
pub use directory::{AuditSink, GrantDirectory, NoopAudit, StaticGrants};
pub use error::LifecycleError;
pub use grid::{Grid, GridSnapshot, MemoryGrid};
pub use sequence::SequenceValidator;
pub use surface::{GridSurface, RemoteSurface, VisualSurface};
pub use synchronizer::{Action, SagaState, StateSynchronizer, TransitionReport};

/// Receives every message meant for the operator.
pub trait Notifier: Send + Sync {
    fn show_error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_error(&self, message: &str) {
        warn!(message, "operator notified");
    }
}

/// Everything an action talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub grid: Arc<dyn Grid>,
    pub grants: Arc<dyn GrantDirectory>,
    pub backend: Arc<dyn OperationBackend>,
    pub surface: Arc<dyn VisualSurface>,
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
