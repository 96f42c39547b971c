//! Special commands parser for interactive chat mode
//!
//! Special commands manage the session rather than being sent to the model:
//! staging a file for the next prompt, reprinting the transcript, help, and
//! exiting. Commands are prefixed with `/` and are case-insensitive; the
//! `/attach` path keeps its original case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Stage a file to send with the next prompt
    Attach(PathBuf),

    /// Drop the staged file
    Detach,

    /// Reprint the transcript so far
    History,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as a prompt
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not a valid command.
/// Returns `CommandError::UnsupportedArgument` if a command receives an argument it does not take.
/// Returns `CommandError::MissingArgument` if `/attach` has no path.
///
/// # Examples
///
/// ```
/// use medchat::commands::special_commands::{parse_special_command, SpecialCommand};
/// use std::path::PathBuf;
///
/// let cmd = parse_special_command("/attach scans/Chest.png").unwrap();
/// assert_eq!(cmd, SpecialCommand::Attach(PathBuf::from("scans/Chest.png")));
///
/// let cmd = parse_special_command("What is fever?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match command.as_str() {
        "/attach" => {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/attach".to_string(),
                    usage: "/attach <path>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Attach(PathBuf::from(unquote(rest))))
            }
        }
        "/detach" => no_argument(SpecialCommand::Detach, "/detach", rest),
        "/history" => no_argument(SpecialCommand::History, "/history", rest),
        "/help" | "/?" => no_argument(SpecialCommand::Help, "/help", rest),
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(command)),
    }
}

fn no_argument(
    command: SpecialCommand,
    name: &str,
    rest: &str,
) -> Result<SpecialCommand, CommandError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: name.to_string(),
            arg: rest.to_string(),
        })
    }
}

fn unquote(path: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = path
            .strip_prefix(quote)
            .and_then(|p| p.strip_suffix(quote))
        {
            return inner;
        }
    }
    path
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

ATTACHMENTS:
  /attach <path>  - Send a file (image or document) with your next question
  /detach         - Remove the staged file

SESSION:
  /history        - Show the conversation so far
  /help           - Show this help message
  exit, quit      - End the session (CTRL-C and CTRL-D also work)

Anything else is sent to the assistant as a question.
"#
    );
}
