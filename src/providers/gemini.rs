//! Gemini provider implementation for MedChat
//!
//! Talks to the Generative Language API's `streamGenerateContent` endpoint
//! with server-sent events. The provider behaves like a chat session: each
//! successful exchange is added to the history sent with the next prompt.

use crate::config::GeminiConfig;
use crate::error::{MedchatError, Result};
use crate::providers::sse::SseDecoder;
use crate::providers::{Fragment, FragmentStream, InlineData, Provider, ProviderRequest};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Finish reasons that mean the model refused or was cut off by policy
const BLOCKED_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use medchat::config::GeminiConfig;
/// use medchat::providers::{GeminiProvider, Provider, ProviderRequest};
/// use futures::StreamExt;
///
/// # async fn example() -> medchat::error::Result<()> {
/// let config = GeminiConfig {
///     api_key: Some("my-key".to_string()),
///     ..Default::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let mut stream = provider
///     .stream_message(ProviderRequest::new("What is fever?", None))
///     .await?;
/// while let Some(fragment) = stream.next().await {
///     print!("{}", fragment?.text);
/// }
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

/// One turn of conversation in Gemini wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`; omitted for the system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordered parts
    pub parts: Vec<ContentPart>,
}

/// Request-side part: inline text or inline binary data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// Text part
    Text {
        /// The text
        text: String,
    },
    /// Inline binary data part
    InlineData {
        /// The data
        #[serde(rename = "inlineData")]
        inline_data: WireInlineData,
    },
}

/// Inline data in Gemini wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInlineData {
    /// MIME type
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl From<InlineData> for WireInlineData {
    fn from(value: InlineData) -> Self {
        Self {
            mime_type: value.mime_type,
            data: value.data,
        }
    }
}

/// Request body for `streamGenerateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

/// One streamed response chunk
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// Response-side part; non-text parts are ignored
#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.status, self.code) {
            (Some(status), Some(code)) => write!(f, "{} ({} {})", self.message, code, status),
            (Some(status), None) => write!(f, "{} ({})", self.message, status),
            (None, Some(code)) => write!(f, "{} ({})", self.message, code),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl GenerateContentChunk {
    /// Extract the chunk's text, or the provider-side failure it reports
    fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(MedchatError::Provider(error.to_string()).into());
        }
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(MedchatError::Provider(format!("Prompt blocked: {}", reason)).into());
        }

        let mut text = String::new();
        for candidate in self.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if part.thought == Some(true) {
                        continue;
                    }
                    if let Some(t) = part.text {
                        text.push_str(&t);
                    }
                }
            }
            if let Some(reason) = candidate.finish_reason {
                if BLOCKED_FINISH_REASONS.contains(&reason.as_str()) {
                    return Err(MedchatError::Provider(format!(
                        "Response stopped by provider: {}",
                        reason
                    ))
                    .into());
                }
            }
        }
        Ok(text)
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// A missing API key does not fail construction; it is reported when an
    /// exchange is attempted.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::config::GeminiConfig;
    /// use medchat::providers::{GeminiProvider, Provider};
    ///
    /// let provider = GeminiProvider::new(GeminiConfig::default()).unwrap();
    /// assert_eq!(provider.model(), "gemini-2.5-pro");
    /// ```
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("medchat/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| MedchatError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Number of contents (user and model turns) retained in the chat history
    pub fn history_len(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or_default()
    }

    /// Full URL of the streaming endpoint for the configured model
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::config::GeminiConfig;
    /// use medchat::providers::GeminiProvider;
    ///
    /// let provider = GeminiProvider::new(GeminiConfig::default()).unwrap();
    /// assert_eq!(
    ///     provider.stream_url(),
    ///     "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
    /// );
    /// ```
    pub fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn user_content(request: ProviderRequest) -> Content {
        let mut parts = Vec::new();
        if !request.prompt.is_empty() || request.attachment.is_none() {
            parts.push(ContentPart::Text {
                text: request.prompt,
            });
        }
        if let Some(inline) = request.attachment {
            parts.push(ContentPart::InlineData {
                inline_data: inline.into(),
            });
        }
        Content {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn build_request(&self, user_content: &Content) -> Result<GenerateContentRequest> {
        let mut contents = self
            .history
            .lock()
            .map_err(|_| MedchatError::Provider("Chat history lock poisoned".to_string()))?
            .clone();
        contents.push(user_content.clone());

        let system_instruction = if self.config.system_instruction.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![ContentPart::Text {
                    text: self.config.system_instruction.clone(),
                }],
            })
        };

        Ok(GenerateContentRequest {
            system_instruction,
            contents,
        })
    }
}

/// Map a non-success HTTP status and body to an error
fn status_error(status: StatusCode, body: &str) -> MedchatError {
    let detail = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.to_string())
        .unwrap_or_else(|_| format!("{} {}", status, body.trim()));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MedchatError::Authentication(detail),
        _ => MedchatError::Provider(detail),
    }
}

/// Drive an SSE body to completion, forwarding fragments in arrival order
///
/// Returns the full response text when the body ends cleanly, or `None` if
/// an error was forwarded or the receiver went away.
async fn pump_fragments(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    tx: &mpsc::UnboundedSender<Result<Fragment>>,
) -> Option<String> {
    let mut decoder = SseDecoder::new();
    let mut full_text = String::new();

    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Gemini stream interrupted: {}", e);
                let _ = tx.send(Err(MedchatError::Network(e.to_string()).into()));
                return None;
            }
        };
        for event in decoder.push(&chunk) {
            if !forward_event(&event.data, tx, &mut full_text) {
                return None;
            }
        }
    }

    // Body may end without a closing blank line.
    if let Some(event) = decoder.finish() {
        if !forward_event(&event.data, tx, &mut full_text) {
            return None;
        }
    }

    Some(full_text)
}

/// Decode one `data:` payload and forward its text; false stops the pump
fn forward_event(
    data: &str,
    tx: &mpsc::UnboundedSender<Result<Fragment>>,
    full_text: &mut String,
) -> bool {
    let parsed = serde_json::from_str::<GenerateContentChunk>(data)
        .map_err(|e| {
            anyhow::Error::from(MedchatError::Provider(format!(
                "Malformed response chunk: {}",
                e
            )))
        })
        .and_then(GenerateContentChunk::into_text);

    match parsed {
        Ok(text) if text.is_empty() => true,
        Ok(text) => {
            tracing::debug!(len = text.len(), "Gemini fragment");
            full_text.push_str(&text);
            tx.send(Ok(Fragment::new(text))).is_ok()
        }
        Err(e) => {
            tracing::warn!("Gemini stream error: {}", e);
            let _ = tx.send(Err(e));
            false
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream_message(&self, request: ProviderRequest) -> Result<FragmentStream> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MedchatError::MissingCredentials(self.name().to_string()))?;

        let has_attachment = request.attachment.is_some();
        let user_content = Self::user_content(request);
        let body = self.build_request(&user_content)?;
        let url = self.stream_url();

        tracing::debug!(
            history = body.contents.len() - 1,
            has_attachment,
            "Sending Gemini request to {}",
            url
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach Gemini: {}", e);
                MedchatError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(status_error(status, &error_text).into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let history = Arc::clone(&self.history);
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            if let Some(full_text) = pump_fragments(byte_stream, &tx).await {
                if let Ok(mut history) = history.lock() {
                    history.push(user_content);
                    history.push(Content {
                        role: Some("model".to_string()),
                        parts: vec![ContentPart::Text { text: full_text }],
                    });
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
