//! Ordered, single-owner transcript store
//!
//! All mutation goes through [`TranscriptStore::append`],
//! [`TranscriptStore::append_all`], and [`TranscriptStore::replace_parts`].
//! Insertion order is display order and is never changed.

use crate::error::{MedchatError, Result};
use crate::transcript::{Message, MessageId, Part};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Change notification emitted after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// A message was added to the end of the transcript
    Appended(Message),
    /// The parts of an existing message were replaced
    PartsReplaced {
        /// Id of the updated message
        id: MessageId,
        /// The new parts, in full
        parts: Vec<Part>,
    },
}

/// The transcript of one chat session
///
/// Duplicate ids are rejected: appending a message whose id is already
/// present returns [`MedchatError::DuplicateMessageId`] and leaves the
/// transcript unchanged.
///
/// # Examples
///
/// ```
/// use medchat::transcript::{Message, Part, TranscriptStore};
///
/// let mut store = TranscriptStore::new();
/// let msg = Message::assistant("...");
/// let id = msg.id.clone();
/// store.append(msg).unwrap();
///
/// assert!(store.replace_parts(&id, vec![Part::text("Hello")]));
/// assert_eq!(store.get(&id).unwrap().text(), "Hello");
/// ```
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
    listener: Option<mpsc::UnboundedSender<TranscriptEvent>>,
}

impl TranscriptStore {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty transcript that reports every change to `listener`
    pub fn with_listener(listener: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        Self {
            messages: Vec::new(),
            listener: Some(listener),
        }
    }

    /// Add a message to the end of the transcript
    ///
    /// # Errors
    ///
    /// Returns [`MedchatError::EmptyMessageId`] for an empty id and
    /// [`MedchatError::DuplicateMessageId`] if the id is already present.
    pub fn append(&mut self, message: Message) -> Result<()> {
        self.append_all(vec![message])
    }

    /// Add several messages in one step
    ///
    /// Either every message is appended, in order, or none is.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TranscriptStore::append`], also checked between
    /// the messages of the batch itself.
    pub fn append_all(&mut self, messages: Vec<Message>) -> Result<()> {
        let mut incoming: HashSet<&MessageId> = HashSet::new();
        for message in &messages {
            if message.id.is_empty() {
                return Err(MedchatError::EmptyMessageId.into());
            }
            if self.contains(&message.id) || !incoming.insert(&message.id) {
                tracing::warn!(id = %message.id, "Rejecting message with duplicate id");
                return Err(MedchatError::DuplicateMessageId(message.id.to_string()).into());
            }
        }

        for message in messages {
            tracing::trace!(id = %message.id, role = ?message.role, "Appending message");
            self.notify(TranscriptEvent::Appended(message.clone()));
            self.messages.push(message);
        }
        Ok(())
    }

    /// Replace the parts of the message with the given id
    ///
    /// Returns `false`, without changing anything, when no message matches.
    pub fn replace_parts(&mut self, id: &MessageId, parts: Vec<Part>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            tracing::debug!(%id, "replace_parts: no such message");
            return false;
        };
        message.parts = parts;
        let event = TranscriptEvent::PartsReplaced {
            id: id.clone(),
            parts: message.parts.clone(),
        };
        self.notify(event);
        true
    }

    /// Look up a message by id
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// True if a message with this id exists
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recently appended message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the transcript has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn notify(&self, event: TranscriptEvent) {
        if let Some(listener) = &self.listener {
            // Renderer may have gone away; the transcript itself stays authoritative.
            let _ = listener.send(event);
        }
    }
}
