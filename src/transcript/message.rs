//! Message, part, and attachment types
//!
//! These are the values the transcript store holds. A message's `id` is the
//! join key for every later update; its `parts` may be replaced, nothing else
//! changes after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use url::Url;

/// Fixed id of the greeting message a session may start with
pub const WELCOME_MESSAGE_ID: &str = "welcome-message";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The person typing
    #[serde(rename = "user")]
    User,
    /// The model's reply
    #[serde(rename = "model")]
    Assistant,
}

impl Role {
    /// Wire name for this role, as used by the provider
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::transcript::Role;
    ///
    /// assert_eq!(Role::User.as_str(), "user");
    /// assert_eq!(Role::Assistant.as_str(), "model");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "You"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// Opaque message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-ordered id for a message with the given role
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::transcript::{MessageId, Role};
    ///
    /// let a = MessageId::generate(Role::User);
    /// let b = MessageId::generate(Role::User);
    /// assert!(a.as_str().starts_with("user-"));
    /// assert_ne!(a, b);
    /// ```
    pub fn generate(role: Role) -> Self {
        Self(format!("{}-{}", role.as_str(), Ulid::new()))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Pixel dimensions of an image attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A user-supplied file, encoded once for transmission and display
///
/// Produced by [`crate::attachment::ingest`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name without directory
    pub name: String,
    /// Detected MIME type
    pub mime_type: String,
    /// Size of the raw file in bytes
    pub size: u64,
    /// Base64 (standard alphabet, padded) file content
    pub data: String,
    /// Local reference used to preview the file
    pub preview_url: Url,
    /// Present when the content decoded as an image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
}

impl Attachment {
    /// True for `image/*` MIME types
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// One-line description used when rendering the transcript
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::transcript::Attachment;
    /// use url::Url;
    ///
    /// let attachment = Attachment {
    ///     name: "labs.pdf".to_string(),
    ///     mime_type: "application/pdf".to_string(),
    ///     size: 2048,
    ///     data: "JVBERi0=".to_string(),
    ///     preview_url: Url::parse("file:///tmp/labs.pdf").unwrap(),
    ///     dimensions: None,
    /// };
    /// assert_eq!(attachment.summary(), "labs.pdf (application/pdf, 2.0 KB)");
    /// ```
    pub fn summary(&self) -> String {
        match self.dimensions {
            Some(d) => format!(
                "{} ({}, {}, {}x{})",
                self.name,
                self.mime_type,
                format_size(self.size),
                d.width,
                d.height
            ),
            None => format!(
                "{} ({}, {})",
                self.name,
                self.mime_type,
                format_size(self.size)
            ),
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Inline text
    Text {
        /// The text
        text: String,
    },
    /// A file attached to the message
    Attachment(Attachment),
}

impl Part {
    /// Build a text part
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Text content, if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::Attachment(_) => None,
        }
    }

    /// Attachment, if this is an attachment part
    pub fn as_attachment(&self) -> Option<&Attachment> {
        match self {
            Part::Attachment(a) => Some(a),
            Part::Text { .. } => None,
        }
    }
}

/// A transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier, unique within a transcript
    pub id: MessageId,
    /// Author
    pub role: Role,
    /// Ordered content parts
    pub parts: Vec<Part>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with a freshly generated id
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self::with_id(MessageId::generate(role), role, parts)
    }

    /// Create a message with an explicit id
    pub fn with_id(id: MessageId, role: Role, parts: Vec<Part>) -> Self {
        Self {
            id,
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// User message: one text part, plus an attachment part when given
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::transcript::{Message, Role};
    ///
    /// let msg = Message::user("What is fever?", None);
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.parts.len(), 1);
    /// assert_eq!(msg.text(), "What is fever?");
    /// ```
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        let mut parts = vec![Part::text(text)];
        if let Some(attachment) = attachment {
            parts.push(Part::Attachment(attachment));
        }
        Self::new(Role::User, parts)
    }

    /// Assistant message with a single text part
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    /// The greeting shown at the top of a new session
    pub fn welcome(text: impl Into<String>) -> Self {
        Self::with_id(
            MessageId::new(WELCOME_MESSAGE_ID),
            Role::Assistant,
            vec![Part::text(text)],
        )
    }

    /// Concatenation of all text parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// Attachments carried by this message
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.parts.iter().filter_map(Part::as_attachment)
    }
}
