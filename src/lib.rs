//! # CNC Panel
//!
//! Operator control panel for unattended CNC machines: load a program,
//! start, continue and stop it, home and probe the machine, edit the
//! program text and send single console lines.
//!
//! ## Architecture
//!
//! The panel is organized as a workspace with multiple crates:
//!
//! 1. **cncpanel-core** - Session state machine, action gate, event queue
//! 2. **cncpanel-gcodeeditor** - Instruction buffer
//! 3. **cncpanel-communication** - Command channels and the machine emulator
//! 4. **cncpanel-settings** - Configuration files
//! 5. **cncpanel-ui** - Panel controller, runtime and rendering surfaces
//! 6. **cncpanel** - Terminal binary that wires everything together

pub mod console;
pub mod terminal;

pub use cncpanel_communication::{
    CommandChannel, EmulatorChannel, EmulatorConfig, LoopbackChannel, MachineCommand,
};
pub use cncpanel_core::{
    event_queue, ChannelEvent, ControlError, EventSender, MachineSession, OperationKind,
    OperatorAction, OperatorIntent, PanelEvent, SessionPhase,
};
pub use cncpanel_gcodeeditor::{BufferError, InstructionBuffer};
pub use cncpanel_settings::{Config, EmulatorSettings, LoggingSettings, PanelSettings};
pub use cncpanel_ui::{
    BroadcastSurface, DisplaySnapshot, Notice, PanelController, PanelError, PanelRuntime,
    RenderSurface,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Emulator timing taken from the settings file
pub fn emulator_config(settings: &EmulatorSettings) -> EmulatorConfig {
    EmulatorConfig {
        ack_delay: settings.ack_delay(),
        line_delay: settings.line_delay(),
        home_delay: settings.home_delay(),
        probe_delay: settings.probe_delay(),
        fail_probe: settings.fail_probe,
    }
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - `RUST_LOG` support, falling back to the configured level
/// - pretty or JSON output on stderr, keeping stdout for the panel itself
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_ascii_lowercase()))?;

    if settings.json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_emulator_config_from_settings() {
        let settings = EmulatorSettings {
            ack_delay_ms: 1,
            line_delay_ms: 2,
            home_delay_ms: 3,
            probe_delay_ms: 4,
            fail_probe: true,
        };
        let config = emulator_config(&settings);
        assert_eq!(config.ack_delay, Duration::from_millis(1));
        assert_eq!(config.probe_delay, Duration::from_millis(4));
        assert!(config.fail_probe);
    }
}
