//! Terminal rendering surface

use cncpanel_ui::{BroadcastSurface, DisplaySnapshot, Notice, RenderSurface, SurfaceUpdate};
use std::io::Write;
use tokio::sync::{broadcast, watch};

/// Numbered program listing with the executing line marked by `>`
pub fn program_listing(snapshot: &DisplaySnapshot) -> String {
    let text = &snapshot.program.text;
    if text.is_empty() {
        return "(no program)".to_string();
    }

    text.lines()
        .enumerate()
        .map(|(idx, line)| {
            let marker = if snapshot.active_line == Some(idx) { '>' } else { ' ' };
            format!("{} {:>4}  {}", marker, idx + 1, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep the most recent snapshot published on `surface`
///
/// Must be called before the surface is handed to the controller so no
/// update is missed.
pub fn track_latest(
    surface: &BroadcastSurface,
    initial: DisplaySnapshot,
) -> watch::Receiver<DisplaySnapshot> {
    let mut updates = surface.subscribe();
    let (latest, receiver) = watch::channel(initial);
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(SurfaceUpdate::Snapshot(snapshot)) => {
                    latest.send_replace(snapshot);
                }
                Ok(SurfaceUpdate::Notice(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Snapshot tracker skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    receiver
}

/// Prints panel state changes and notices as plain lines
///
/// Progress updates only move the active line, so a snapshot is printed
/// when anything besides the line counter changed.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    last: Option<String>,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn summary(snapshot: &DisplaySnapshot) -> String {
        let mut summary = snapshot.clone();
        summary.active_line = None;
        summary.to_string()
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!("Cannot write to terminal: {}", err);
        }
    }
}

impl<W: Write + Send> RenderSurface for TerminalSurface<W> {
    fn render(&mut self, snapshot: &DisplaySnapshot) {
        let summary = Self::summary(snapshot);
        if self.last.as_deref() == Some(summary.as_str()) {
            return;
        }
        self.write_line(&format!("== {}", summary));
        self.last = Some(summary);
    }

    fn notify(&mut self, notice: &Notice) {
        self.write_line(&notice.to_string());
    }
}
