//! OS signal handling.
//!
//! # Responsibilities
//! - Register the interrupt (SIGINT) handler during startup
//! - Flush and close the log sink when an interrupt arrives
//!
//! # Design Decisions
//! - The handler closes over an owned `Logger` handle, never a global
//! - The handler does not exit the process; shutdown belongs to the server
//!   runtime
//! - Registration happens synchronously so no interrupt is missed between
//!   install and the first poll

use std::io;

use crate::observability::Logger;

/// Installs the process-wide interrupt handler.
pub trait InterruptHandler: Send + Sync {
    fn install(&self, logger: Logger) -> io::Result<()>;
}

/// Tokio-backed SIGINT handler.
///
/// Must be installed from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtrlCHandler;

impl InterruptHandler for CtrlCHandler {
    #[cfg(unix)]
    fn install(&self, logger: Logger) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut interrupts = signal(SignalKind::interrupt())?;
        runtime.spawn(async move {
            while interrupts.recv().await.is_some() {
                tracing::info!("Interrupt received, closing log sink");
                logger.close();
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    fn install(&self, logger: Logger) -> io::Result<()> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, closing log sink");
                    logger.close();
                }
            });
        Ok(())
    }
}
