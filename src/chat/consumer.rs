//! Folding a provider's fragment stream into the transcript

use crate::chat::turn::{TurnGuard, TurnState, TurnTracker};
use crate::config::ChatConfig;
use crate::error::{classify, ErrorKind, MedchatError, Result};
use crate::providers::{Provider, ProviderRequest};
use crate::transcript::{Attachment, Message, MessageId, Part, TranscriptStore};
use futures::StreamExt;
use serde::Serialize;

/// Leading text of every failed turn's placeholder
pub const FAILURE_PREFIX: &str = "Sorry, I encountered an error.";

/// Result of one completed or failed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    /// Id of the user message appended for this turn
    pub user_id: MessageId,
    /// Id of the assistant placeholder
    pub placeholder_id: MessageId,
    /// Terminal state, `Completed` or `Failed`
    pub state: TurnState,
    /// Final text held by the placeholder
    pub text: String,
    /// Number of fragments folded in before the turn ended
    pub fragments: usize,
}

impl TurnOutcome {
    /// True when the stream ended normally
    pub fn is_completed(&self) -> bool {
        self.state == TurnState::Completed
    }
}

/// Human-readable text written into the placeholder when a turn fails
///
/// # Examples
///
/// ```
/// use medchat::chat::failure_text;
/// use medchat::error::MedchatError;
///
/// let text = failure_text(&MedchatError::Provider("Prompt blocked: SAFETY".into()).into());
/// assert_eq!(text, "Sorry, I encountered an error. Provider error: Prompt blocked: SAFETY");
/// ```
pub fn failure_text(error: &anyhow::Error) -> String {
    let hint = match error.downcast_ref::<MedchatError>() {
        Some(MedchatError::MissingCredentials(_)) => {
            Some("Set MEDCHAT_API_KEY or GEMINI_API_KEY and try again.")
        }
        Some(MedchatError::Authentication(_)) => Some("Please check your API key."),
        _ if classify(error) == ErrorKind::Network => {
            Some("Please check your network connection.")
        }
        _ => None,
    };
    match hint {
        Some(hint) => format!("{} {} {}", FAILURE_PREFIX, error, hint),
        None => format!("{} {}", FAILURE_PREFIX, error),
    }
}

/// Runs one provider exchange per user turn against a transcript
///
/// Only one turn may be in flight at a time; a second `submit` while busy is
/// rejected with [`MedchatError::Busy`] without touching the transcript.
pub struct StreamConsumer {
    provider: Box<dyn Provider>,
    tracker: TurnTracker,
    pending_marker: String,
    cursor_glyph: String,
}

impl StreamConsumer {
    /// Create a consumer for `provider` using the placeholder settings in `config`
    pub fn new(provider: Box<dyn Provider>, config: &ChatConfig) -> Self {
        Self {
            provider,
            tracker: TurnTracker::new(),
            pending_marker: config.pending_marker.clone(),
            cursor_glyph: config.cursor_glyph.clone(),
        }
    }

    /// The underlying provider
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Handle for observing turn state from elsewhere
    pub fn tracker(&self) -> TurnTracker {
        self.tracker.clone()
    }

    /// State of the current or most recent turn
    pub fn state(&self) -> TurnState {
        self.tracker.state()
    }

    /// True from the start of `submit` until its turn reaches a terminal state
    pub fn is_busy(&self) -> bool {
        self.tracker.is_busy()
    }

    /// Run one turn: append the user message and a placeholder, then stream
    /// the response into the placeholder
    ///
    /// The prompt is trimmed. Once the placeholder is in the transcript every
    /// failure is written into it as text and reported through the returned
    /// [`TurnOutcome`] with state `Failed`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the turn is rejected before the transcript
    /// is touched: [`MedchatError::Busy`] while another turn is in flight,
    /// [`MedchatError::EmptyPrompt`] when there is neither text nor an
    /// attachment, or a duplicate message id from the store.
    pub async fn submit(
        &self,
        store: &mut TranscriptStore,
        prompt: &str,
        attachment: Option<Attachment>,
    ) -> Result<TurnOutcome> {
        let guard = self.tracker.begin()?;

        let prompt = prompt.trim();
        if prompt.is_empty() && attachment.is_none() {
            guard.cancel();
            return Err(MedchatError::EmptyPrompt.into());
        }

        let request = ProviderRequest::new(prompt, attachment.as_ref());
        let user = Message::user(prompt, attachment);
        let placeholder = Message::assistant(self.pending_marker.as_str());
        let user_id = user.id.clone();
        let placeholder_id = placeholder.id.clone();

        if let Err(e) = store.append_all(vec![user, placeholder]) {
            guard.cancel();
            return Err(e);
        }

        tracing::info!(
            placeholder = %placeholder_id,
            provider = self.provider.name(),
            model = self.provider.model(),
            "Starting turn"
        );

        let mut running = String::new();
        let mut fragments = 0usize;
        let result = self
            .consume(store, &placeholder_id, request, &guard, &mut running, &mut fragments)
            .await;

        let (state, text) = match result {
            Ok(()) => {
                store.replace_parts(&placeholder_id, vec![Part::text(running.clone())]);
                guard.complete();
                tracing::info!(placeholder = %placeholder_id, fragments, "Turn completed");
                (TurnState::Completed, running)
            }
            Err(e) => {
                let text = failure_text(&e);
                store.replace_parts(&placeholder_id, vec![Part::text(text.clone())]);
                guard.fail();
                tracing::warn!(placeholder = %placeholder_id, fragments, "Turn failed: {:#}", e);
                (TurnState::Failed, text)
            }
        };

        Ok(TurnOutcome {
            user_id,
            placeholder_id,
            state,
            text,
            fragments,
        })
    }

    async fn consume(
        &self,
        store: &mut TranscriptStore,
        placeholder_id: &MessageId,
        request: ProviderRequest,
        guard: &TurnGuard,
        running: &mut String,
        fragments: &mut usize,
    ) -> Result<()> {
        let mut stream = self.provider.stream_message(request).await?;
        guard.streaming();

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            running.push_str(&fragment.text);
            *fragments += 1;
            tracing::trace!(len = fragment.text.len(), "Fragment received");
            store.replace_parts(
                placeholder_id,
                vec![Part::text(format!("{}{}", running, self.cursor_glyph))],
            );
        }
        Ok(())
    }
}
