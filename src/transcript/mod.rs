//! Transcript data model and store
//!
//! The transcript is the ordered list of messages shown to the user. It is
//! append-only, except that the assistant placeholder of the active turn has
//! its parts replaced wholesale as fragments arrive.

pub mod message;
pub mod store;

pub use message::{Attachment, ImageDimensions, Message, MessageId, Part, Role};
pub use store::{TranscriptEvent, TranscriptStore};
