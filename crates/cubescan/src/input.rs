//! Operator commands delivered one per loop tick.

use crate::core::FaceLabel;
use std::collections::VecDeque;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Face selector: scan the current frame and propose it for this label.
    Face(FaceLabel),
    Store,
    Finalize,
    Reject,
    Unfinalize,
    /// Toggle live classification feedback (calibration recorder only).
    Test,
    Quit,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("line {line}: unknown command `{token}`")]
pub struct ScriptError {
    pub line: usize,
    pub token: String,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if let Ok(label) = token.parse::<FaceLabel>() {
            return Ok(Command::Face(label));
        }
        match token.to_ascii_lowercase().as_str() {
            "store" | "s" => Ok(Command::Store),
            "finalize" | "enter" => Ok(Command::Finalize),
            "reject" | "x" => Ok(Command::Reject),
            "unfinalize" | "z" => Ok(Command::Unfinalize),
            "test" | "t" => Ok(Command::Test),
            "quit" | "q" => Ok(Command::Quit),
            _ => Err(token.to_string()),
        }
    }
}

/// Source of operator commands.
pub trait OperatorInput {
    /// `None` when no key was pressed this tick.
    fn next_command(&mut self) -> Option<Command>;
}

/// Replays a fixed list of ticks; runs dry as "no key".
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    ticks: VecDeque<Option<Command>>,
}

impl ScriptedInput {
    pub fn new(ticks: impl IntoIterator<Item = Option<Command>>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl OperatorInput for ScriptedInput {
    fn next_command(&mut self) -> Option<Command> {
        self.ticks.pop_front().flatten()
    }
}

/// Parse a text script, one token per line.
///
/// `-` is an idle tick; blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<ScriptedInput, ScriptError> {
    let mut ticks = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let token = raw.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        if token == "-" {
            ticks.push(None);
            continue;
        }
        let cmd = token.parse::<Command>().map_err(|token| ScriptError {
            line: i + 1,
            token,
        })?;
        ticks.push(Some(cmd));
    }
    Ok(ScriptedInput::new(ticks))
}
