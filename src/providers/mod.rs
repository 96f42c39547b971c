//! Provider module for MedChat
//!
//! This module contains the model provider abstraction, the SSE framing it
//! relies on, and the Gemini implementation.

pub mod base;
pub mod gemini;
pub mod sse;

pub use base::{Fragment, FragmentStream, InlineData, Provider, ProviderRequest};
pub use gemini::GeminiProvider;

use crate::config::ProviderConfig;
use crate::error::{MedchatError, Result};

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
///
/// # Examples
///
/// ```
/// use medchat::config::ProviderConfig;
/// use medchat::providers::create_provider;
///
/// let provider = create_provider(&ProviderConfig::default()).unwrap();
/// assert_eq!(provider.name(), "gemini");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider::new(config.gemini.clone())?)),
        other => Err(MedchatError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
