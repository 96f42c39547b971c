//! Incremental terminal rendering of the transcript
//!
//! The renderer consumes [`TranscriptEvent`]s and writes to any `io::Write`.
//! Streaming placeholders are printed incrementally: each update writes only
//! the part of the running text not yet on screen, with the cursor glyph
//! and pending marker left out. A placeholder stays live until
//! [`TerminalRenderer::finish`] is given the outcome of its turn.

use crate::chat::{TurnOutcome, TurnState, FAILURE_PREFIX};
use crate::config::ChatConfig;
use crate::transcript::{Message, MessageId, Part, Role, TranscriptEvent};
use colored::Colorize;
use std::collections::HashMap;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Writes transcript changes to a terminal-like sink
pub struct TerminalRenderer<W: Write> {
    out: W,
    pending_marker: String,
    cursor_glyph: String,
    /// Text already printed for placeholders that are still streaming
    live: HashMap<MessageId, String>,
}

impl<W: Write> TerminalRenderer<W> {
    /// Create a renderer writing to `out`
    pub fn new(out: W, config: &ChatConfig) -> Self {
        Self {
            out,
            pending_marker: config.pending_marker.clone(),
            cursor_glyph: config.cursor_glyph.clone(),
            live: HashMap::new(),
        }
    }

    /// Consume the renderer and return the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one transcript event
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails
    pub fn handle(&mut self, event: &TranscriptEvent) -> io::Result<()> {
        match event {
            TranscriptEvent::Appended(message) => self.appended(message)?,
            TranscriptEvent::PartsReplaced { id, parts } => self.replaced(id, parts)?,
        }
        self.out.flush()
    }

    /// Render every event currently queued on `rx` without waiting
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<TranscriptEvent>) -> io::Result<()> {
        while let Ok(event) = rx.try_recv() {
            self.handle(&event)?;
        }
        Ok(())
    }

    /// Print a complete message, as for a history listing
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails
    pub fn write_message(&mut self, message: &Message) -> io::Result<()> {
        self.write_label(message.role)?;
        let text = message.text();
        if message.role == Role::Assistant && is_failure(&text) {
            writeln!(self.out, "{}", text.red())?;
        } else {
            writeln!(self.out, "{}", text)?;
        }
        for attachment in message.attachments() {
            writeln!(self.out, "  {} {}", "📎".dimmed(), attachment.summary().dimmed())?;
        }
        Ok(())
    }

    fn appended(&mut self, message: &Message) -> io::Result<()> {
        if message.role == Role::Assistant && message.text() == self.pending_marker {
            self.write_label(message.role)?;
            self.live.insert(message.id.clone(), String::new());
            return Ok(());
        }
        self.write_message(message)
    }

    /// Close the live placeholder of a finished turn
    ///
    /// Prints whatever of the final text is not yet on screen, or the failure
    /// text in red, and ends the line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails
    pub fn finish(&mut self, outcome: &TurnOutcome) -> io::Result<()> {
        let Some(printed) = self.live.remove(&outcome.placeholder_id) else {
            return Ok(());
        };
        let text = outcome.text.as_str();

        if outcome.state == TurnState::Failed {
            if !printed.is_empty() {
                writeln!(self.out)?;
            }
            writeln!(self.out, "{}", text.red())?;
        } else if let Some(suffix) = text.strip_prefix(printed.as_str()) {
            writeln!(self.out, "{}", suffix)?;
        } else {
            writeln!(self.out)?;
            writeln!(self.out, "{}", text)?;
        }
        self.out.flush()
    }

    fn replaced(&mut self, id: &MessageId, parts: &[Part]) -> io::Result<()> {
        let Some(printed) = self.live.get_mut(id) else {
            tracing::debug!(id = %id, "Ignoring update for a message that is not streaming");
            return Ok(());
        };
        let text: String = parts.iter().filter_map(Part::as_text).collect();

        // Terminal text is printed by `finish`
        let Some(running) = text.strip_suffix(self.cursor_glyph.as_str()) else {
            return Ok(());
        };
        if let Some(suffix) = running.strip_prefix(printed.as_str()) {
            write!(self.out, "{}", suffix)?;
            *printed = running.to_string();
        }
        Ok(())
    }

    fn write_label(&mut self, role: Role) -> io::Result<()> {
        let label = format!("{}:", role);
        let label = match role {
            Role::User => label.green().bold(),
            Role::Assistant => label.cyan().bold(),
        };
        write!(self.out, "{} ", label)
    }
}

fn is_failure(text: &str) -> bool {
    text.starts_with(FAILURE_PREFIX)
}
