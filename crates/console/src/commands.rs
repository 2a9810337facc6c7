//! Console input parsing

use mock_interview_core::ExhibitId;
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  <text>             answer the interviewer
  /record [file]     answer with a recording (WAV/MP3 file; no file = silence)
  /skip              interrupt the interviewer
  /speech on|off     toggle spoken replies
  /exhibit <id>      show an exhibit again
  /exhibits          list exhibits shown so far
  /status            show whose turn it is
  /start             retry opening the interview
  /help              show this help
  /quit              end the interview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer(String),
    Record(Option<PathBuf>),
    Skip,
    Speech(bool),
    Exhibit(ExhibitId),
    Exhibits,
    Status,
    Start,
    Help,
    Quit,
}

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Answer(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "record" => Command::Record((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "skip" => Command::Skip,
        "speech" => match arg {
            "on" => Command::Speech(true),
            "off" => Command::Speech(false),
            _ => return Err("usage: /speech on|off".to_string()),
        },
        "exhibit" => {
            let id = arg
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| "usage: /exhibit <id>".to_string())?;
            Command::Exhibit(ExhibitId(id))
        }
        "exhibits" => Command::Exhibits,
        "status" => Command::Status,
        "start" => Command::Start,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command /{} (try /help)", other)),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_an_answer() {
        assert_eq!(
            parse_line("  I'd split revenue by segment. ").unwrap(),
            Some(Command::Answer("I'd split revenue by segment.".to_string()))
        );
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_line("/skip").unwrap(), Some(Command::Skip));
        assert_eq!(parse_line("/speech off").unwrap(), Some(Command::Speech(false)));
        assert_eq!(parse_line("/exhibit #2").unwrap(), Some(Command::Exhibit(ExhibitId(2))));
        assert_eq!(parse_line("/record").unwrap(), Some(Command::Record(None)));
        assert_eq!(
            parse_line("/record answer.wav").unwrap(),
            Some(Command::Record(Some(PathBuf::from("answer.wav"))))
        );
        assert_eq!(parse_line("/start").unwrap(), Some(Command::Start));
        assert_eq!(parse_line("/exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_bad_commands() {
        assert!(parse_line("/speech maybe").is_err());
        assert!(parse_line("/exhibit x").is_err());
        assert!(parse_line("/dance").is_err());
    }
}
