//! Shared fakes for lifecycle and logging integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use svckit::config::{ApplicationOptions, LogOptions};
use svckit::lifecycle::{
    Application, InterruptHandler, Pid, ProcessControl, ServeOptions, ServerRuntime, TerminateError,
};
use svckit::observability::{LogSink, Logger};

/// Ordered record of everything observable during a run.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.all().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.all().iter().position(|e| e.starts_with(prefix))
    }
}

/// Log sink that appends `log:<line>` events.
pub struct EventSink(pub Events);

impl LogSink for EventSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.0.push(format!("log:{line}"));
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        self.0.push("sink-closed");
        Ok(())
    }
}

/// Process control returning a fixed pid set and recording every call.
pub struct FakeProcesses {
    pub events: Events,
    pub pids: Vec<Pid>,
    pub missing: Vec<Pid>,
}

impl ProcessControl for FakeProcesses {
    fn pids_on_port(&self, port: u16) -> io::Result<Vec<Pid>> {
        self.events.push(format!("query:{port}"));
        Ok(self.pids.clone())
    }

    fn terminate(&self, pid: Pid) -> Result<(), TerminateError> {
        self.events.push(format!("terminate:{pid}"));
        if self.missing.contains(&pid) {
            Err(TerminateError::NotFound(pid))
        } else {
            Ok(())
        }
    }
}

/// Interrupt handler that only records installation.
pub struct FakeInterrupts(pub Events);

impl InterruptHandler for FakeInterrupts {
    fn install(&self, _logger: Logger) -> io::Result<()> {
        self.0.push("interrupt-installed");
        Ok(())
    }
}

/// Server runtime that records the handoff and returns immediately.
#[derive(Clone)]
pub struct RecordingRuntime {
    pub events: Events,
    pub handoffs: Arc<Mutex<Vec<ServeOptions>>>,
}

impl RecordingRuntime {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            handoffs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handoffs(&self) -> Vec<ServeOptions> {
        self.handoffs.lock().unwrap().clone()
    }
}

impl ServerRuntime for RecordingRuntime {
    async fn serve(self, options: ServeOptions) -> io::Result<()> {
        self.events.push("handoff");
        self.handoffs.lock().unwrap().push(options);
        Ok(())
    }
}

pub fn event_logger(events: &Events) -> Logger {
    let options = LogOptions {
        app_id: "x".into(),
        ..LogOptions::default()
    };
    Logger::with_sink(options, Arc::new(EventSink(events.clone())))
}

/// Application wired to fakes, with the given pids bound to the port.
pub fn fake_application(options: ApplicationOptions, pids: Vec<Pid>, events: &Events) -> Application {
    Application::new(options, event_logger(events))
        .with_process_control(FakeProcesses {
            events: events.clone(),
            pids,
            missing: Vec::new(),
        })
        .with_interrupt_handler(FakeInterrupts(events.clone()))
}
