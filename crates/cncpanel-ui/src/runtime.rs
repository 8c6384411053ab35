//! Panel runtime
//!
//! The single consumer of the panel event queue. Operator intents and
//! machine events are handled strictly in arrival order on one task, which
//! owns the controller outright.
//!
//! With an acknowledgment timeout configured, the runtime also checks the
//! pending operation on a fixed tick and fails it once it is overdue.

use crate::controller::PanelController;
use chrono::Utc;
use cncpanel_core::{EventReceiver, PanelEvent};
use cncpanel_settings::PanelSettings;
use std::time::Duration;
use tokio::task::JoinHandle;

const MIN_WATCHDOG_TICK: Duration = Duration::from_millis(10);

pub struct PanelRuntime {
    controller: PanelController,
    events: EventReceiver,
    ack_timeout: Option<Duration>,
}

impl PanelRuntime {
    pub fn new(controller: PanelController, events: EventReceiver) -> Self {
        Self {
            controller,
            events,
            ack_timeout: None,
        }
    }

    pub fn with_settings(
        controller: PanelController,
        events: EventReceiver,
        settings: &PanelSettings,
    ) -> Self {
        Self::new(controller, events).with_ack_timeout(settings.ack_timeout())
    }

    /// Enable or disable the acknowledgment watchdog
    pub fn with_ack_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn controller(&self) -> &PanelController {
        &self.controller
    }

    /// Process events until shutdown or until every sender is gone
    ///
    /// Returns the controller so callers can inspect the final state.
    pub async fn run(mut self) -> PanelController {
        let tick = self
            .ack_timeout
            .map(|timeout| (timeout / 4).max(MIN_WATCHDOG_TICK))
            .unwrap_or(Duration::from_secs(3600));
        let mut watchdog = tokio::time::interval(tick);
        watchdog.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(ack_timeout = ?self.ack_timeout, "Panel runtime started");

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(PanelEvent::Intent(intent)) => {
                        if let Err(err) = self.controller.handle_intent(intent) {
                            tracing::debug!("Intent not carried out: {}", err);
                        }
                    }
                    Some(PanelEvent::Channel(event)) => {
                        self.controller.on_channel_event(event);
                    }
                    Some(PanelEvent::Shutdown) => {
                        tracing::info!("Shutdown requested");
                        break;
                    }
                    None => {
                        tracing::info!("All event senders dropped");
                        break;
                    }
                },
                _ = watchdog.tick(), if self.ack_timeout.is_some() => {
                    if let Some(timeout) = self.ack_timeout {
                        self.controller.expire_pending(timeout, Utc::now());
                    }
                }
            }
        }

        tracing::info!("Panel runtime stopped in {}", self.controller.session().phase());
        self.controller
    }

    /// Run on a new tokio task
    pub fn spawn(self) -> JoinHandle<PanelController> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cncpanel_communication::LoopbackChannel;
    use cncpanel_core::{event_queue, OperatorAction, OperatorIntent, SessionPhase};

    #[tokio::test]
    async fn test_runs_until_shutdown() {
        let (tx, rx) = event_queue();
        let controller = PanelController::new(Box::new(LoopbackChannel::new()));
        let handle = PanelRuntime::new(controller, rx).spawn();

        tx.submit(OperatorIntent::ButtonPressed(OperatorAction::HomeXyz))
            .unwrap();
        tx.shutdown().unwrap();

        let controller = handle.await.unwrap();
        assert_eq!(controller.session().phase(), SessionPhase::Homing);
    }

    #[tokio::test]
    async fn test_stops_when_senders_dropped() {
        let (tx, rx) = event_queue();
        let controller = PanelController::new(Box::new(LoopbackChannel::new()));
        let handle = PanelRuntime::new(controller, rx).spawn();

        drop(tx);
        let controller = handle.await.unwrap();
        assert_eq!(controller.session().phase(), SessionPhase::Idle);
    }
}
