/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat` — Interactive chat session
- `ask`  — Send a single prompt and print the answer

Both drive turns through the same [`StreamConsumer`] and render the
transcript with a [`TerminalRenderer`].
*/

use crate::chat::{StreamConsumer, TurnOutcome};
use crate::error::Result;
use crate::render::TerminalRenderer;
use crate::transcript::{Attachment, TranscriptEvent, TranscriptStore};
use std::io::Write;
use tokio::sync::mpsc;

// Special commands parser for the interactive session
pub mod special_commands;

/// Run one turn, rendering transcript events while fragments arrive
///
/// Events queued by the turn are rendered as they are produced; anything
/// still queued when the turn ends is flushed, then the placeholder is
/// closed with the turn's outcome.
///
/// # Errors
///
/// Returns the rejection from [`StreamConsumer::submit`], or an IO error
/// from the renderer's sink.
pub async fn drive_turn<W: Write>(
    consumer: &StreamConsumer,
    store: &mut TranscriptStore,
    events: &mut mpsc::UnboundedReceiver<TranscriptEvent>,
    renderer: &mut TerminalRenderer<W>,
    prompt: &str,
    attachment: Option<Attachment>,
) -> Result<TurnOutcome> {
    let turn = consumer.submit(store, prompt, attachment);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut turn => break outcome,
            Some(event) = events.recv() => renderer.handle(&event)?,
        }
    };

    renderer.drain(events)?;
    let outcome = outcome?;
    renderer.finish(&outcome)?;
    Ok(outcome)
}

// Chat command handler
pub mod chat {
    //! Interactive chat session.
    //!
    //! Creates the provider and a transcript, seeds the welcome message, and
    //! runs a readline loop. Plain input is sent as a prompt; `/` commands
    //! manage the staged attachment and the session.

    use super::*;
    use crate::attachment;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::config::Config;
    use crate::providers::{create_provider, Provider};
    use crate::transcript::Message;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created or the terminal
    /// cannot be read from or written to. Failed turns are shown in the
    /// transcript and do not end the session.
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        let provider = create_provider(&config.provider)?;
        let consumer = StreamConsumer::new(provider, &config.chat);
        let (tx, mut events) = mpsc::unbounded_channel();
        let mut store = TranscriptStore::with_listener(tx);
        let mut renderer = TerminalRenderer::new(std::io::stdout(), &config.chat);

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(consumer.provider());
        if let Some(welcome) = &config.chat.welcome_message {
            store.append(Message::welcome(welcome.as_str()))?;
            renderer.drain(&mut events)?;
            println!();
        }

        let mut staged: Option<Attachment> = None;

        loop {
            let prompt = match &staged {
                Some(a) => format!("{} {} ", format!("[{}]", a.name).yellow(), ">".bold()),
                None => format!("{} ", ">".bold()),
            };
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() && staged.is_none() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Attach(path)) => {
                            match attachment::ingest(&path, config.chat.max_attachment_bytes).await
                            {
                                Ok(a) => {
                                    println!("Attached {}\n", a.summary());
                                    staged = Some(a);
                                }
                                Err(e) => {
                                    let msg = format!("Could not attach {}: {}", path.display(), e);
                                    eprintln!("{}\n", msg.red());
                                }
                            }
                            continue;
                        }
                        Ok(SpecialCommand::Detach) => {
                            match staged.take() {
                                Some(a) => println!("Removed {}\n", a.name),
                                None => println!("No file is attached\n"),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::History) => {
                            for message in store.messages() {
                                renderer.write_message(message)?;
                            }
                            println!();
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    }

                    if !trimmed.is_empty() {
                        rl.add_history_entry(trimmed)?;
                    }

                    let attachment = staged.take();
                    match drive_turn(
                        &consumer,
                        &mut store,
                        &mut events,
                        &mut renderer,
                        trimmed,
                        attachment,
                    )
                    .await
                    {
                        Ok(outcome) => {
                            tracing::debug!(
                                state = %outcome.state,
                                fragments = outcome.fragments,
                                "Turn finished"
                            );
                        }
                        Err(e) => eprintln!("{}", e),
                    }
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Display welcome banner at the start of the session
    fn print_welcome_banner(provider: &dyn Provider) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              MedChat Health Assistant - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "Model: {} ({})",
            provider.model().cyan(),
            provider.name()
        );
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}

// One-shot command handler
pub mod ask {
    //! One-shot prompt handler used by scripts.

    use super::*;
    use crate::attachment;
    use crate::config::Config;
    use crate::providers::create_provider;
    use crate::transcript::Message;
    use serde::Serialize;
    use std::path::PathBuf;

    /// Arguments of the `ask` command
    #[derive(Debug, Clone, Default)]
    pub struct AskArgs {
        /// Prompt text (may be empty when a file is attached)
        pub prompt: String,
        /// File to attach
        pub attach: Option<PathBuf>,
        /// Print the transcript as JSON instead of streaming text
        pub json: bool,
    }

    #[derive(Serialize)]
    struct AskReport<'a> {
        outcome: &'a TurnOutcome,
        messages: &'a [Message],
    }

    /// Send one prompt and print the answer to stdout
    ///
    /// # Errors
    ///
    /// See [`ask`].
    pub async fn run_ask(config: Config, args: AskArgs) -> Result<TurnOutcome> {
        ask(&config, args, std::io::stdout()).await
    }

    /// Send one prompt and write the answer to `out`
    ///
    /// A failed turn is not an error: its text is written like any answer
    /// and the returned outcome has state `Failed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment cannot be read, the provider cannot
    /// be created, the prompt is empty with no attachment, or writing fails.
    pub async fn ask<W: Write>(config: &Config, args: AskArgs, mut out: W) -> Result<TurnOutcome> {
        tracing::info!("Starting one-shot ask");

        let attachment = match &args.attach {
            Some(path) => {
                tracing::debug!("Attaching file: {}", path.display());
                Some(attachment::ingest(path, config.chat.max_attachment_bytes).await?)
            }
            None => None,
        };

        let provider = create_provider(&config.provider)?;
        let consumer = StreamConsumer::new(provider, &config.chat);

        if args.json {
            let mut store = TranscriptStore::new();
            let outcome = consumer.submit(&mut store, &args.prompt, attachment).await?;
            let report = AskReport {
                outcome: &outcome,
                messages: store.messages(),
            };
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
            return Ok(outcome);
        }

        let (tx, mut events) = mpsc::unbounded_channel();
        let mut store = TranscriptStore::with_listener(tx);
        let mut renderer = TerminalRenderer::new(out, &config.chat);
        drive_turn(
            &consumer,
            &mut store,
            &mut events,
            &mut renderer,
            &args.prompt,
            attachment,
        )
        .await
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;
    use crate::test_utils::{ScriptedProvider, ScriptedReply};

    #[tokio::test]
    async fn test_drive_turn_renders_streamed_answer() {
        let config = ChatConfig::default();
        let consumer = StreamConsumer::new(
            Box::new(ScriptedProvider::new(vec![ScriptedReply::Fragments(vec![
                "Rest ", "and ", "fluids.",
            ])])),
            &config,
        );
        let (tx, mut events) = mpsc::unbounded_channel();
        let mut store = TranscriptStore::with_listener(tx);
        let mut renderer = TerminalRenderer::new(Vec::new(), &config);

        let outcome = drive_turn(
            &consumer,
            &mut store,
            &mut events,
            &mut renderer,
            "How do I treat a cold?",
            None,
        )
        .await
        .unwrap();

        assert!(outcome.is_completed());
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(output.contains("How do I treat a cold?"));
        assert!(output.contains("Rest and fluids.\n"));
        assert!(events.try_recv().is_err());
    }
}
