//! Rendering surfaces
//!
//! A surface draws snapshots and shows notices. It never decides what is
//! enabled; it reflects the snapshot and forwards raw operator intents
//! through an [`EventSender`](cncpanel_core::EventSender).

use crate::snapshot::{DisplaySnapshot, Notice};
use tokio::sync::broadcast;

/// Capability contract between the panel and whatever displays it
pub trait RenderSurface: Send {
    /// Draw the current panel state
    fn render(&mut self, snapshot: &DisplaySnapshot);

    /// Show a message to the operator
    fn notify(&mut self, notice: &Notice);
}

/// Update published by [`BroadcastSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceUpdate {
    Snapshot(DisplaySnapshot),
    Notice(Notice),
}

/// Surface that republishes everything on a broadcast channel
///
/// Lets any number of async observers follow the panel. Updates are
/// dropped when nobody is subscribed, and slow subscribers may lag.
#[derive(Debug, Clone)]
pub struct BroadcastSurface {
    tx: broadcast::Sender<SurfaceUpdate>,
}

impl BroadcastSurface {
    /// Create a surface buffering up to `capacity` updates per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceUpdate> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, update: SurfaceUpdate) {
        if self.tx.send(update).is_err() {
            tracing::trace!("No surface subscribers");
        }
    }
}

impl Default for BroadcastSurface {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RenderSurface for BroadcastSurface {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        self.publish(SurfaceUpdate::Snapshot(snapshot.clone()));
    }

    fn notify(&mut self, notice: &Notice) {
        self.publish(SurfaceUpdate::Notice(notice.clone()));
    }
}
