//! Base provider trait and common request/response types
//!
//! A provider is an opaque capability: submit a prompt plus an optional
//! binary attachment, get back an ordered, lazy sequence of text fragments
//! that either runs to completion or ends with an error.

use crate::error::Result;
use crate::transcript::Attachment;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Binary attachment data sent inline with a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineData {
    /// MIME type of the decoded bytes
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl From<&Attachment> for InlineData {
    fn from(attachment: &Attachment) -> Self {
        Self {
            mime_type: attachment.mime_type.clone(),
            data: attachment.data.clone(),
        }
    }
}

/// One outbound exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// Prompt text (may be empty when an attachment is present)
    pub prompt: String,
    /// Optional inline attachment
    pub attachment: Option<InlineData>,
}

impl ProviderRequest {
    /// Build a request from prompt text and an optional attachment
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::providers::ProviderRequest;
    ///
    /// let request = ProviderRequest::new("What is fever?", None);
    /// assert_eq!(request.prompt, "What is fever?");
    /// assert!(request.attachment.is_none());
    /// ```
    pub fn new(prompt: impl Into<String>, attachment: Option<&Attachment>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: attachment.map(InlineData::from),
        }
    }
}

/// One incremental unit of response text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// The text delivered in this fragment
    pub text: String,
}

impl Fragment {
    /// Create a fragment
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Ordered stream of fragments; an `Err` item terminates the exchange
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Provider trait for hosted generative models
///
/// # Examples
///
/// ```no_run
/// use medchat::providers::{Fragment, FragmentStream, Provider, ProviderRequest};
/// use medchat::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn model(&self) -> &str {
///         "echo-1"
///     }
///
///     async fn stream_message(&self, request: ProviderRequest) -> Result<FragmentStream> {
///         let fragments = vec![Ok(Fragment::new(request.prompt))];
///         Ok(Box::pin(futures::stream::iter(fragments)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name used in logs and error messages
    fn name(&self) -> &str;

    /// Model the provider talks to
    fn model(&self) -> &str;

    /// Start one exchange and return its fragment stream
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange cannot be started: missing
    /// credential, transport failure, or a rejected request. Failures after
    /// the first fragment arrive as `Err` items on the stream.
    async fn stream_message(&self, request: ProviderRequest) -> Result<FragmentStream>;
}
