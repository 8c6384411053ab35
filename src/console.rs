//! Operator console parsing
//!
//! Lines starting with `:` are panel commands; anything else is sent to the
//! machine as a single console line.

use cncpanel_core::{OperatorAction, OperatorIntent};
use cncpanel_gcodeeditor::InstructionBuffer;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
:load <path>  open a program and transfer it
:show         list the program, marking the active line
:edit <n> <text>  replace line n of the program
:transfer     send the edited program to the machine
:start        start the loaded program
:continue     resume after a pause
:stop         stop whatever the machine is doing
:home         home X, Y and Z
:probe        probe along Z
:reset        clear a fault
:help         show this list
:quit         leave the panel
anything else is sent to the machine as one line";

/// What an operator input line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Forward an intent to the panel
    Intent(OperatorIntent),
    /// Read a program file, then open it
    Load(PathBuf),
    /// Print the current program
    Show,
    /// Replace one line (1-based) of the current program
    Edit { line: usize, text: String },
    Help,
    Quit,
}

/// Parse one input line; blank input yields `None`
pub fn parse_line(input: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = input.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix(':') else {
        return Ok(Some(ConsoleCommand::Intent(OperatorIntent::TextSubmitted(
            line.to_string(),
        ))));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let press = |action: OperatorAction| -> Result<Option<ConsoleCommand>, String> {
        Ok(Some(ConsoleCommand::Intent(OperatorIntent::ButtonPressed(
            action,
        ))))
    };
    match name {
        "load" if arg.is_empty() => Err(":load needs a file path".to_string()),
        "load" => Ok(Some(ConsoleCommand::Load(PathBuf::from(arg)))),
        "show" => Ok(Some(ConsoleCommand::Show)),
        "edit" => parse_edit(arg).map(Some),
        "transfer" => press(OperatorAction::Load),
        "start" => press(OperatorAction::Start),
        "continue" => press(OperatorAction::Continue),
        "stop" => press(OperatorAction::Stop),
        "home" => press(OperatorAction::HomeXyz),
        "probe" => press(OperatorAction::ProbeZ),
        "reset" => press(OperatorAction::Reset),
        "help" => Ok(Some(ConsoleCommand::Help)),
        "quit" | "exit" => Ok(Some(ConsoleCommand::Quit)),
        other => Err(format!("unknown command ':{}', try :help", other)),
    }
}

fn parse_edit(arg: &str) -> Result<ConsoleCommand, String> {
    let (number, text) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    match number.parse::<usize>() {
        Ok(line) if line > 0 => Ok(ConsoleCommand::Edit {
            line,
            text: text.trim().to_string(),
        }),
        _ => Err(":edit needs a line number starting at 1".to_string()),
    }
}

/// Replace line `line` (1-based) of `program`
///
/// One past the last line appends. The trailing newline, if any, is kept.
pub fn replace_line(program: &str, line: usize, text: &str) -> Result<String, String> {
    let mut lines: Vec<&str> = program.lines().collect();
    match line.checked_sub(1) {
        Some(idx) if idx < lines.len() => lines[idx] = text,
        Some(idx) if idx == lines.len() => lines.push(text),
        _ => {
            return Err(format!(
                "line {} is out of range, the program has {} lines",
                line,
                lines.len()
            ))
        }
    }

    let mut edited = lines.join("\n");
    if program.is_empty() || program.ends_with('\n') {
        edited.push('\n');
    }
    Ok(edited)
}

/// Read a program file into an open-program intent
///
/// The bytes are checked the same way the panel's buffer checks them, so a
/// bad file is reported with its line and column before anything is sent.
pub fn read_program(path: &Path) -> anyhow::Result<OperatorIntent> {
    let bytes = std::fs::read(path)?;
    let source_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let mut buffer = InstructionBuffer::new();
    buffer.load_bytes(&bytes, source_name.clone())?;
    Ok(OperatorIntent::ProgramOpened {
        text: buffer.text(),
        source_name,
    })
}
