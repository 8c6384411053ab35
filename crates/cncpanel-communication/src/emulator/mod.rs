//! Machine emulator
//!
//! A simulated machine behind the [`CommandChannel`] trait. Commands are
//! accepted immediately; the machine's reaction is played back on tokio
//! tasks that deliver acknowledgments, per-line progress, pauses and
//! completion into the panel's event queue.
//!
//! The emulator needs a tokio runtime. Sending from outside one reports the
//! transport as unavailable.

pub mod program;

use crate::communication::{CommandChannel, MachineCommand};
use cncpanel_core::{Acknowledgment, ChannelError, ChannelEvent, EventSender, OperationKind};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Timing and behavior of the emulated machine
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Delay before Load, Stop and console lines are acknowledged
    pub ack_delay: Duration,
    /// Time spent on each program line
    pub line_delay: Duration,
    pub home_delay: Duration,
    pub probe_delay: Duration,
    /// Make every probe cycle fail
    pub fail_probe: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            ack_delay: Duration::from_millis(50),
            line_delay: Duration::from_millis(200),
            home_delay: Duration::from_millis(1500),
            probe_delay: Duration::from_millis(1000),
            fail_probe: false,
        }
    }
}

#[derive(Debug, Default)]
struct EmulatorState {
    program: Vec<String>,
    next_line: usize,
    run_task: Option<JoinHandle<()>>,
    unavailable: Option<String>,
}

impl EmulatorState {
    fn abort_run(&mut self) {
        if let Some(task) = self.run_task.take() {
            task.abort();
        }
    }
}

/// Command channel backed by a simulated machine
#[derive(Debug, Clone)]
pub struct EmulatorChannel {
    events: EventSender,
    config: EmulatorConfig,
    state: Arc<Mutex<EmulatorState>>,
}

impl EmulatorChannel {
    /// Create an emulator that reports into `events`
    pub fn new(events: EventSender, config: EmulatorConfig) -> Self {
        Self {
            events,
            config,
            state: Arc::new(Mutex::new(EmulatorState::default())),
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Index of the next program line the machine would execute
    pub fn next_line(&self) -> usize {
        self.state.lock().next_line
    }

    /// Whether a program is currently being streamed
    pub fn is_streaming(&self) -> bool {
        self.state
            .lock()
            .run_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Simulate a machine-side fault such as a tripped limit switch
    ///
    /// Streaming stops and a fault event is delivered. The transport stays
    /// up, so the panel can send `Reset` afterwards.
    pub fn inject_fault(&self, reason: impl Into<String>) -> Result<(), ChannelError> {
        self.state.lock().abort_run();
        self.events.deliver(ChannelEvent::Fault {
            reason: reason.into(),
        })
    }

    /// Simulate a lost connection; every send fails until [`reconnect`]
    ///
    /// [`reconnect`]: EmulatorChannel::reconnect
    pub fn disconnect(&self, reason: impl Into<String>) {
        let mut state = self.state.lock();
        state.abort_run();
        state.unavailable = Some(reason.into());
    }

    pub fn reconnect(&self) {
        self.state.lock().unavailable = None;
    }

    /// Deliver an acknowledgment after `delay`
    fn ack_later(&self, runtime: &Handle, delay: Duration, ack: Acknowledgment) {
        let events = self.events.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if events.deliver(ChannelEvent::Acknowledgment(ack)).is_err() {
                tracing::debug!("Emulator: panel queue closed, dropping acknowledgment");
            }
        });
    }

    /// Stream the stored program from `next_line` onwards
    fn run_program(&self, runtime: &Handle, kind: OperationKind) {
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        let ack_delay = self.config.ack_delay;
        let line_delay = self.config.line_delay;

        let task = runtime.spawn(async move {
            tokio::time::sleep(ack_delay).await;
            if events
                .deliver(ChannelEvent::Acknowledgment(Acknowledgment::success(kind)))
                .is_err()
            {
                return;
            }

            loop {
                let (idx, line) = {
                    let state = state.lock();
                    match state.program.get(state.next_line) {
                        Some(line) => (state.next_line, line.clone()),
                        None => break,
                    }
                };

                tokio::time::sleep(line_delay).await;
                if events.deliver(ChannelEvent::Progress { line: idx }).is_err() {
                    return;
                }
                state.lock().next_line = idx + 1;

                let reason = program::parse_words(&line)
                    .ok()
                    .and_then(|words| program::pause_reason(&words));
                if let Some(reason) = reason {
                    tracing::debug!("Emulator: holding at line {}: {}", idx + 1, reason);
                    let _ = events.deliver(ChannelEvent::Paused {
                        reason: Some(reason),
                    });
                    return;
                }
            }

            let _ = events.deliver(ChannelEvent::Completed {
                message: Some("Program finished".to_string()),
            });
        });

        let mut state = self.state.lock();
        state.abort_run();
        state.run_task = Some(task);
    }
}

impl CommandChannel for EmulatorChannel {
    fn send(&mut self, command: MachineCommand) -> Result<(), ChannelError> {
        let runtime = Handle::try_current().map_err(|_| ChannelError::Unavailable {
            reason: "emulator requires an async runtime".to_string(),
        })?;
        if let Some(reason) = self.state.lock().unavailable.clone() {
            return Err(ChannelError::Unavailable { reason });
        }

        tracing::debug!("Emulator <- {}", command);
        let delay = self.config.ack_delay;

        match command {
            MachineCommand::Load { text } => {
                let lines: Vec<String> = text.lines().map(str::to_string).collect();
                let ack = match program::check_program(&lines) {
                    Ok(()) => {
                        let mut state = self.state.lock();
                        state.program = lines;
                        state.next_line = 0;
                        Acknowledgment::success(OperationKind::Load)
                    }
                    Err(reason) => Acknowledgment::failure(OperationKind::Load, reason),
                };
                self.ack_later(&runtime, delay, ack);
            }
            MachineCommand::Start { text } => {
                let lines: Vec<String> = text.lines().map(str::to_string).collect();
                if let Err(reason) = program::check_program(&lines) {
                    self.ack_later(
                        &runtime,
                        delay,
                        Acknowledgment::failure(OperationKind::Start, reason),
                    );
                    return Ok(());
                }
                {
                    let mut state = self.state.lock();
                    state.program = lines;
                    state.next_line = 0;
                }
                self.run_program(&runtime, OperationKind::Start);
            }
            MachineCommand::Continue => {
                // A hold on the final line resumes straight into completion
                let loaded = !self.state.lock().program.is_empty();
                if loaded {
                    self.run_program(&runtime, OperationKind::Continue);
                } else {
                    self.ack_later(
                        &runtime,
                        delay,
                        Acknowledgment::failure(OperationKind::Continue, "no program to continue"),
                    );
                }
            }
            MachineCommand::Stop => {
                self.state.lock().abort_run();
                self.ack_later(&runtime, delay, Acknowledgment::success(OperationKind::Stop));
            }
            MachineCommand::HomeXyz => {
                self.ack_later(
                    &runtime,
                    self.config.home_delay,
                    Acknowledgment::success(OperationKind::HomeXyz),
                );
            }
            MachineCommand::ProbeZ => {
                let ack = if self.config.fail_probe {
                    Acknowledgment::failure(OperationKind::ProbeZ, "probe did not make contact")
                } else {
                    Acknowledgment::success(OperationKind::ProbeZ)
                };
                self.ack_later(&runtime, self.config.probe_delay, ack);
            }
            MachineCommand::SendLine { line } => {
                let ack = match program::parse_words(&line) {
                    Ok(words) if !words.is_empty() => {
                        Acknowledgment::success(OperationKind::SendLine)
                    }
                    Ok(_) => Acknowledgment::failure(OperationKind::SendLine, "nothing to execute"),
                    Err(reason) => Acknowledgment::failure(OperationKind::SendLine, reason),
                };
                self.ack_later(&runtime, delay, ack);
            }
            MachineCommand::Reset => {
                let mut state = self.state.lock();
                state.abort_run();
                state.program.clear();
                state.next_line = 0;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "emulator"
    }
}
