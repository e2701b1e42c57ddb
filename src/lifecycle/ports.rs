//! Port reconciliation.
//!
//! # Responsibilities
//! - Find processes still bound to the service port
//! - Ask each of them to terminate (SIGTERM)
//!
//! # Design Decisions
//! - Best effort: a failed lookup means "nothing to clean up"
//! - Per-pid failures are returned as values and ignored at the call site
//! - Fire and forget: no waiting for the old process to exit

use std::io;
use std::process::Command;

use thiserror::Error;

/// OS process identifier.
pub type Pid = i32;

/// Why a termination signal could not be delivered.
#[derive(Debug, Error)]
pub enum TerminateError {
    #[error("process {0} not found")]
    NotFound(Pid),

    #[error("not permitted to signal process {0}")]
    PermissionDenied(Pid),

    #[error("failed to signal process {pid}: {message}")]
    Other { pid: Pid, message: String },
}

/// OS operations needed to reclaim a port.
pub trait ProcessControl: Send + Sync {
    /// Process ids holding a TCP socket on `port`.
    fn pids_on_port(&self, port: u16) -> io::Result<Vec<Pid>>;

    /// Send a graceful termination signal.
    fn terminate(&self, pid: Pid) -> Result<(), TerminateError>;
}

/// `lsof` for discovery, `kill(2)` for delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessControl;

impl ProcessControl for SystemProcessControl {
    fn pids_on_port(&self, port: u16) -> io::Result<Vec<Pid>> {
        let output = Command::new("lsof")
            .args(["-t", "-i", &format!("tcp:{port}")])
            .output()?;

        // lsof exits non-zero when nothing matches.
        if !output.status.success() {
            return Ok(Vec::new());
        }

        Ok(parse_pid_list(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(unix)]
    fn terminate(&self, pid: Pid) -> Result<(), TerminateError> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid as NixPid;

        signal::kill(NixPid::from_raw(pid), Signal::SIGTERM).map_err(|errno| match errno {
            Errno::ESRCH => TerminateError::NotFound(pid),
            Errno::EPERM => TerminateError::PermissionDenied(pid),
            other => TerminateError::Other {
                pid,
                message: other.desc().to_string(),
            },
        })
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: Pid) -> Result<(), TerminateError> {
        Err(TerminateError::Other {
            pid,
            message: "signals are not supported on this platform".to_string(),
        })
    }
}

/// Parse whitespace-separated pids, skipping anything that is not a pid.
fn parse_pid_list(output: &str) -> Vec<Pid> {
    let mut pids: Vec<Pid> = output
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .filter(|pid: &Pid| *pid > 0)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Terminate every other process bound to `port`.
///
/// Returns the pids a signal was delivered to. Port 0 is skipped, as is the
/// current process.
pub fn reconcile_port(control: &dyn ProcessControl, port: u16) -> Vec<Pid> {
    if port == 0 {
        return Vec::new();
    }

    let pids = match control.pids_on_port(port) {
        Ok(pids) => pids,
        Err(e) => {
            tracing::debug!(port, error = %e, "Port owner lookup failed; assuming port is free");
            return Vec::new();
        }
    };

    let own_pid = Pid::try_from(std::process::id()).unwrap_or(0);
    let mut signaled = Vec::new();

    for pid in pids.into_iter().filter(|pid| *pid != own_pid) {
        match control.terminate(pid) {
            Ok(()) => {
                tracing::info!(port, pid, "Sent SIGTERM to stale port owner");
                signaled.push(pid);
            }
            // Best effort: the process may be gone or belong to someone else.
            Err(e) => tracing::debug!(port, pid, error = %e, "Ignoring termination failure"),
        }
    }

    signaled
}
