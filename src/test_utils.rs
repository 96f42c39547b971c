//! Test utilities for MedChat
//!
//! This module provides common test utilities including temporary file
//! creation, assertion helpers, and a scripted provider that replays canned
//! fragment sequences.

use crate::error::{MedchatError, Result};
use crate::providers::{Fragment, FragmentStream, Provider, ProviderRequest};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error is a `MedchatError` matching `predicate`
///
/// # Panics
///
/// Panics if the error is of another type or does not match
pub fn assert_medchat_error(error: &anyhow::Error, predicate: impl Fn(&MedchatError) -> bool) {
    let inner = error
        .downcast_ref::<MedchatError>()
        .unwrap_or_else(|| panic!("Expected MedchatError, got: {}", error));
    assert!(predicate(inner), "Unexpected error: {}", inner);
}

/// One canned reply of a [`ScriptedProvider`]
pub enum ScriptedReply {
    /// Stream these fragments, then end normally
    Fragments(Vec<&'static str>),
    /// Fail before any fragment is produced
    FailToStart(MedchatError),
    /// Stream these fragments, then yield the error
    FailAfter(Vec<&'static str>, MedchatError),
    /// Wait for the gate to open, then stream the fragments
    Gated(Vec<&'static str>, oneshot::Receiver<()>),
}

/// Provider that replays scripted replies in order and records requests
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl ScriptedProvider {
    /// Provider that will answer with `replies`, one per exchange
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn ok_fragments(texts: Vec<&'static str>) -> Vec<Result<Fragment>> {
    texts.into_iter().map(|t| Ok(Fragment::new(t))).collect()
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn stream_message(&self, request: ProviderRequest) -> Result<FragmentStream> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider ran out of replies");

        match reply {
            ScriptedReply::Fragments(texts) => Ok(Box::pin(futures::stream::iter(ok_fragments(texts)))),
            ScriptedReply::FailToStart(error) => Err(error.into()),
            ScriptedReply::FailAfter(texts, error) => {
                let mut items = ok_fragments(texts);
                items.push(Err(error.into()));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            ScriptedReply::Gated(texts, gate) => {
                let wait = futures::stream::once(async move {
                    let _ = gate.await;
                })
                .filter_map(|_| futures::future::ready(None::<Result<Fragment>>));
                Ok(Box::pin(wait.chain(futures::stream::iter(ok_fragments(texts)))))
            }
        }
    }
}
