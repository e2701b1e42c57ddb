//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate application options before any side effect
//! - Reclaim the service port from stale processes
//! - Install interrupt handling for the log sink
//! - Run the optional bootstrap hook
//! - Hand control to the server runtime
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and skips the handoff
//! - Steps run strictly in order on one task; the only await before the
//!   handoff is an async bootstrap hook
//! - The runtime's own access log is always disabled; `Logger` owns
//!   request diagnostics

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::future::Future;
use std::io;

use super::ports::{reconcile_port, ProcessControl, SystemProcessControl};
use super::signals::{CtrlCHandler, InterruptHandler};
use super::{BoxError, LifecycleError, LifecycleResult, LifecycleState};
use crate::config::{validate_application_options, ApplicationOptions};
use crate::fields;
use crate::observability::Logger;

/// Optional startup routine run once before the handoff.
pub enum Bootstrap {
    /// Runs inline on the calling thread.
    Sync(Box<dyn FnOnce() -> Result<(), BoxError> + Send>),
    /// Awaited to completion before startup continues.
    Async(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>),
}

impl Bootstrap {
    pub fn sync<F>(hook: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Self::Sync(Box::new(hook))
    }

    pub fn future<F, Fut>(hook: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::Async(Box::new(move || hook().boxed()))
    }

    async fn run(self) -> Result<(), BoxError> {
        match self {
            Bootstrap::Sync(hook) => hook(),
            Bootstrap::Async(hook) => hook().await,
        }
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bootstrap::Sync(_) => f.write_str("Bootstrap::Sync"),
            Bootstrap::Async(_) => f.write_str("Bootstrap::Async"),
        }
    }
}

/// Settings passed to the server runtime at handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub reload: bool,
    pub workers: usize,
    /// Whether the runtime should emit its own request access log.
    pub access_log: bool,
}

impl ServeOptions {
    /// Socket address string (`host:port`).
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server runtime that takes over once startup completes.
///
/// The route table and middleware are attached by the implementor before
/// `serve` is called. `serve` resolves only when the server stops.
pub trait ServerRuntime {
    fn serve(self, options: ServeOptions) -> impl Future<Output = io::Result<()>> + Send;
}

/// Sequences service startup.
pub struct Application {
    options: ApplicationOptions,
    logger: Logger,
    bootstrap: Option<Bootstrap>,
    processes: Box<dyn ProcessControl>,
    interrupts: Box<dyn InterruptHandler>,
    state: LifecycleState,
}

impl Application {
    /// Create an application using the system process control and the
    /// Tokio interrupt handler.
    pub fn new(options: ApplicationOptions, logger: Logger) -> Self {
        Self {
            options,
            logger,
            bootstrap: None,
            processes: Box::new(SystemProcessControl),
            interrupts: Box::new(CtrlCHandler),
            state: LifecycleState::Created,
        }
    }

    pub fn with_process_control(mut self, processes: impl ProcessControl + 'static) -> Self {
        self.processes = Box::new(processes);
        self
    }

    pub fn with_interrupt_handler(mut self, interrupts: impl InterruptHandler + 'static) -> Self {
        self.interrupts = Box::new(interrupts);
        self
    }

    /// Register the bootstrap hook, replacing any previous one.
    pub fn setup(&mut self, hook: Bootstrap) -> &mut Self {
        self.bootstrap = Some(hook);
        self
    }

    pub fn options(&self) -> &ApplicationOptions {
        &self.options
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run the startup sequence and hand off to `runtime`.
    ///
    /// Resolves when the runtime stops. Any failure before the handoff moves
    /// the application to `Aborted` and the runtime is never called.
    pub async fn run<R: ServerRuntime>(&mut self, runtime: R) -> LifecycleResult<()> {
        if self.state != LifecycleState::Created {
            return Err(LifecycleError::InvalidState(self.state));
        }

        match self.start().await {
            Ok(serve) => {
                self.state = LifecycleState::Running;
                tracing::info!(address = %serve.bind_address(), "Handing off to server runtime");
                runtime.serve(serve).await.map_err(LifecycleError::Server)
            }
            Err(e) => {
                self.state = LifecycleState::Aborted;
                self.logger.error(format!("startup aborted: {e}"));
                tracing::error!(error = %e, "Startup aborted");
                Err(e)
            }
        }
    }

    async fn start(&mut self) -> LifecycleResult<ServeOptions> {
        validate_application_options(&self.options).map_err(LifecycleError::Configuration)?;
        self.state = LifecycleState::Validated;

        // Failures inside are ignored per pid.
        let signaled = reconcile_port(self.processes.as_ref(), self.options.port);
        if !signaled.is_empty() {
            tracing::info!(port = self.options.port, count = signaled.len(), "Port reconciled");
        }
        self.state = LifecycleState::PortReconciled;

        self.interrupts
            .install(self.logger.clone())
            .map_err(LifecycleError::Signal)?;
        self.state = LifecycleState::SignalInstalled;

        self.logger.info("application server starting");
        self.logger.info(fields! {
            "msg" => "startup options",
            "options" => self.options,
        });

        if let Some(hook) = self.bootstrap.take() {
            tracing::debug!(hook = ?hook, "Running bootstrap hook");
            hook.run().await.map_err(LifecycleError::Bootstrap)?;
        }
        self.state = LifecycleState::BootstrapComplete;

        Ok(ServeOptions {
            host: self.options.host.clone(),
            port: self.options.port,
            reload: self.options.hot_reload,
            workers: self.options.worker_count,
            access_log: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogOptions;
    use crate::lifecycle::ports::{Pid, TerminateError};
    use crate::observability::MemorySink;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct NoProcesses {
        queried: Arc<AtomicBool>,
    }

    impl ProcessControl for NoProcesses {
        fn pids_on_port(&self, _port: u16) -> io::Result<Vec<Pid>> {
            self.queried.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }

        fn terminate(&self, pid: Pid) -> Result<(), TerminateError> {
            Err(TerminateError::NotFound(pid))
        }
    }

    struct NoInterrupts;

    impl InterruptHandler for NoInterrupts {
        fn install(&self, _logger: Logger) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRuntime {
        calls: Arc<Mutex<Vec<ServeOptions>>>,
    }

    impl ServerRuntime for RecordingRuntime {
        async fn serve(self, options: ServeOptions) -> io::Result<()> {
            self.calls.lock().unwrap().push(options);
            Ok(())
        }
    }

    fn application(app_id: &str) -> (Application, NoProcesses, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LogOptions::default(), sink.clone());
        let processes = NoProcesses::default();
        let options = ApplicationOptions {
            app_id: app_id.into(),
            port: 9001,
            ..ApplicationOptions::default()
        };
        let app = Application::new(options, logger)
            .with_process_control(processes.clone())
            .with_interrupt_handler(NoInterrupts);
        (app, processes, sink)
    }

    #[tokio::test]
    async fn test_invalid_app_id_aborts_before_side_effects() {
        let (mut app, processes, _sink) = application(".relative");
        let runtime = RecordingRuntime::default();

        let err = app.run(runtime.clone()).await.unwrap_err();

        assert!(matches!(err, LifecycleError::Configuration(_)));
        assert_eq!(app.state(), LifecycleState::Aborted);
        assert!(!processes.queried.load(Ordering::SeqCst));
        assert!(runtime.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_start_hands_off() {
        let (mut app, processes, sink) = application("orders");
        let runtime = RecordingRuntime::default();

        app.run(runtime.clone()).await.unwrap();

        assert_eq!(app.state(), LifecycleState::Running);
        assert!(processes.queried.load(Ordering::SeqCst));
        let calls = runtime.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].port, 9001);
        assert!(!calls[0].access_log);

        let records = sink.records();
        assert_eq!(records[0]["msg"], "application server starting");
        assert_eq!(records[1]["options"]["app"], "orders");
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let (mut app, _processes, _sink) = application("orders");
        app.run(RecordingRuntime::default()).await.unwrap();

        let err = app.run(RecordingRuntime::default()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidState(LifecycleState::Running)));
    }

    #[tokio::test]
    async fn test_async_bootstrap_failure_aborts() {
        let (mut app, _processes, _sink) = application("orders");
        let runtime = RecordingRuntime::default();
        app.setup(Bootstrap::future(|| async { Err::<(), BoxError>("cache warmup failed".into()) }));

        let err = app.run(runtime.clone()).await.unwrap_err();

        assert!(matches!(err, LifecycleError::Bootstrap(_)));
        assert!(err.to_string().contains("cache warmup failed"));
        assert_eq!(app.state(), LifecycleState::Aborted);
        assert!(runtime.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bind_address() {
        let serve = ServeOptions {
            host: "0.0.0.0".into(),
            port: 8080,
            reload: false,
            workers: 2,
            access_log: false,
        };
        assert_eq!(serve.bind_address(), "0.0.0.0:8080");
    }
}
