//! MedChat - streaming health-assistant chat library
//!
//! This library provides the core of the MedChat client: an owned transcript
//! that is updated incrementally while a hosted model streams its answer,
//! the stream consumer that drives each turn, and attachment encoding.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `transcript`: Messages, parts, attachments, and the transcript store
//! - `chat`: Stream consumer and the per-turn state machine
//! - `attachment`: Reading local files into inline attachments
//! - `providers`: Model provider abstraction and the Gemini implementation
//! - `render`: Incremental terminal rendering of transcript events
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use medchat::chat::StreamConsumer;
//! use medchat::providers::create_provider;
//! use medchat::transcript::TranscriptStore;
//! use medchat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let consumer = StreamConsumer::new(create_provider(&config.provider)?, &config.chat);
//!     let mut store = TranscriptStore::new();
//!     let outcome = consumer.submit(&mut store, "What is fever?", None).await?;
//!     println!("{}", outcome.text);
//!     Ok(())
//! }
//! ```

pub mod attachment;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod render;
pub mod transcript;

// Re-export commonly used types
pub use chat::{StreamConsumer, TurnOutcome, TurnState};
pub use config::Config;
pub use error::{MedchatError, Result};
pub use transcript::{Attachment, Message, MessageId, Part, Role, TranscriptStore};

#[cfg(test)]
pub mod test_utils;
