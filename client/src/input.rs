//! Terminal command parsing with intent sequencing
//!
//! Each line typed by the player becomes at most one [`Command`]. Commands
//! that reach the server are wrapped in an [`IntentRecord`] with a
//! per-connection sequence number so the server can drop resends.

use shared::{ChatChannel, Intent, IntentRecord};

/// What a typed line asks the client to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Intent),
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingMessage,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "nothing to send"),
            ParseError::UnknownCommand(name) => write!(f, "unknown command /{}", name),
            ParseError::MissingMessage => write!(f, "/team needs a message"),
        }
    }
}

pub const HELP: &str = "/ready /unready /fire /stop /switch /team <msg> /quit, anything else is chat";

/// Parses one line of player input.
///
/// Plain text is chat to everyone; a leading slash names a command.
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(Intent::SendChat {
            channel: ChatChannel::All,
            text: line.to_string(),
        }));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    let intent = match name.to_ascii_lowercase().as_str() {
        "ready" => Intent::ToggleReady(true),
        "unready" => Intent::ToggleReady(false),
        "fire" => Intent::StartFire,
        "stop" => Intent::StopFire,
        "switch" => Intent::SwitchWeapon,
        "all" | "say" if !argument.is_empty() => Intent::SendChat {
            channel: ChatChannel::All,
            text: argument.to_string(),
        },
        "team" => {
            if argument.is_empty() {
                return Err(ParseError::MissingMessage);
            }
            Intent::SendChat {
                channel: ChatChannel::Team,
                text: argument.to_string(),
            }
        }
        "quit" | "exit" => return Ok(Command::Quit),
        "help" => return Ok(Command::Help),
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Command::Send(intent))
}

/// Stamps outgoing intents with increasing sequence numbers
pub struct InputManager {
    next_sequence: u32,
}

impl InputManager {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    pub fn next_record(&mut self, intent: Intent) -> IntentRecord {
        let record = IntentRecord {
            sequence: self.next_sequence,
            intent,
        };
        self.next_sequence += 1;
        record
    }

    /// Starts numbering again, used after a reconnect
    pub fn reset(&mut self) {
        self.next_sequence = 1;
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_all_chat() {
        assert_eq!(
            parse_line("  gg everyone "),
            Ok(Command::Send(Intent::SendChat {
                channel: ChatChannel::All,
                text: "gg everyone".to_string(),
            }))
        );
    }

    #[test]
    fn test_commands_map_to_intents() {
        assert_eq!(parse_line("/ready"), Ok(Command::Send(Intent::ToggleReady(true))));
        assert_eq!(parse_line("/unready"), Ok(Command::Send(Intent::ToggleReady(false))));
        assert_eq!(parse_line("/FIRE"), Ok(Command::Send(Intent::StartFire)));
        assert_eq!(parse_line("/stop"), Ok(Command::Send(Intent::StopFire)));
        assert_eq!(parse_line("/switch"), Ok(Command::Send(Intent::SwitchWeapon)));
        assert_eq!(parse_line("/quit"), Ok(Command::Quit));
        assert_eq!(parse_line("/help"), Ok(Command::Help));
    }

    #[test]
    fn test_team_chat() {
        assert_eq!(
            parse_line("/team push left"),
            Ok(Command::Send(Intent::SendChat {
                channel: ChatChannel::Team,
                text: "push left".to_string(),
            }))
        );
        assert_eq!(parse_line("/team   "), Err(ParseError::MissingMessage));
    }

    #[test]
    fn test_rejected_lines() {
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_line("/dance now"),
            Err(ParseError::UnknownCommand("dance".to_string()))
        );
    }

    #[test]
    fn test_input_manager_sequences() {
        let mut input_manager = InputManager::new();

        assert_eq!(input_manager.next_record(Intent::StartFire).sequence, 1);
        assert_eq!(input_manager.next_record(Intent::StopFire).sequence, 2);

        input_manager.reset();
        assert_eq!(input_manager.next_record(Intent::SwitchWeapon).sequence, 1);
    }
}
