//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate options → Reconcile port → Install interrupt handler
//!     → Log startup → Bootstrap hook → Hand off to server runtime
//!
//! Ports (ports.rs):
//!     lsof → pids on port → SIGTERM each (failures ignored)
//!
//! Signals (signals.rs):
//!     SIGINT → flush/close log sink
//!
//! Shutdown (shutdown.rs):
//!     trigger → server runtime stops accepting → drain → exit
//! ```
//!
//! # State Machine
//! ```text
//! Created → Validated → PortReconciled → SignalInstalled
//!         → BootstrapComplete → Running (terminal)
//! any non-terminal state → Aborted
//! ```

pub mod ports;
pub mod shutdown;
pub mod signals;
pub mod startup;

use std::fmt;
use thiserror::Error;

use crate::config::ValidationError;

pub use ports::{reconcile_port, Pid, ProcessControl, SystemProcessControl, TerminateError};
pub use shutdown::Shutdown;
pub use signals::{CtrlCHandler, InterruptHandler};
pub use startup::{Application, Bootstrap, ServeOptions, ServerRuntime};

/// Error type returned by bootstrap hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Position in the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Validated,
    PortReconciled,
    SignalInstalled,
    BootstrapComplete,
    Running,
    Aborted,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Running | Self::Aborted)
    }
}

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Application options failed validation; nothing was started.
    #[error("invalid application options: {}", join_errors(.0))]
    Configuration(Vec<ValidationError>),

    /// The interrupt handler could not be registered.
    #[error("failed to install interrupt handler: {0}")]
    Signal(#[source] std::io::Error),

    /// The bootstrap hook failed; the server was not started.
    #[error("bootstrap hook failed: {0}")]
    Bootstrap(#[source] BoxError),

    /// The server runtime returned an error.
    #[error("server runtime error: {0}")]
    Server(#[source] std::io::Error),

    /// `run` was called on an application that already ran.
    #[error("application cannot start from state {0:?}")]
    InvalidState(LifecycleState),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
