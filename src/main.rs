use anyhow::Context;
use cncpanel::console::{self, ConsoleCommand};
use cncpanel::terminal::{self, TerminalSurface};
use cncpanel::{
    emulator_config, event_queue, init_logging, BroadcastSurface, Config, EmulatorChannel,
    OperatorIntent, PanelController, PanelRuntime, BUILD_DATE, VERSION,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = Config::resolve_path()?;
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_logging(&config.logging)?;
    tracing::info!("CNC Panel {} (built {})", VERSION, BUILD_DATE);
    tracing::debug!("Settings from {}", config_path.display());

    let (events, receiver) = event_queue();
    let emulator = EmulatorChannel::new(events.clone(), emulator_config(&config.emulator));

    let mut controller = PanelController::from_settings(Box::new(emulator), &config.panel);
    controller.add_surface(Box::new(TerminalSurface::stdout()));
    let mirror = BroadcastSurface::default();
    let latest = terminal::track_latest(&mirror, controller.snapshot());
    controller.add_surface(Box::new(mirror));
    let runtime = PanelRuntime::with_settings(controller, receiver, &config.panel).spawn();

    println!("Type :help for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match console::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let intent = match command {
            ConsoleCommand::Intent(intent) => intent,
            ConsoleCommand::Load(path) => match console::read_program(&path) {
                Ok(intent) => intent,
                Err(err) => {
                    println!("Cannot open {}: {}", path.display(), err);
                    continue;
                }
            },
            ConsoleCommand::Show => {
                println!("{}", terminal::program_listing(&latest.borrow()));
                continue;
            }
            ConsoleCommand::Edit { line, text } => {
                let program = latest.borrow().program.text.clone();
                match console::replace_line(&program, line, &text) {
                    Ok(edited) => OperatorIntent::BufferEdited(edited),
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                }
            }
            ConsoleCommand::Help => {
                println!("{}", console::HELP);
                continue;
            }
            ConsoleCommand::Quit => break,
        };
        events.submit(intent)?;
    }

    events.shutdown()?;
    let controller = runtime.await?;
    tracing::info!("Panel closed in {}", controller.session().phase());
    Ok(())
}
