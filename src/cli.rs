//! Command-line interface definition for MedChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing an interactive chat command and a one-shot ask command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MedChat - streaming health-assistant chat in the terminal
///
/// Sends your questions (and optionally a file) to a hosted generative
/// model and prints the answer as it streams in.
#[derive(Parser, Debug, Clone)]
#[command(name = "medchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for MedChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Send a single prompt and print the streamed answer
    Ask {
        /// Prompt text
        #[arg(short, long, default_value = "")]
        prompt: String,

        /// File to attach (image or document)
        #[arg(short, long)]
        attach: Option<PathBuf>,

        /// Print the final transcript as JSON instead of streaming text
        #[arg(long)]
        json: bool,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },
}

impl Commands {
    /// Model override given on the command line, if any
    pub fn model_override(&self) -> Option<&str> {
        match self {
            Commands::Chat { model } | Commands::Ask { model, .. } => model.as_deref(),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Chat { model: None },
        }
    }
}
