//! Test double that replays a fixed sequence of `ProviderEvent`s regardless
//! of the request, so node tests don't depend on a real model.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::EngineError;

use super::{ChatRequest, LlmProvider, ProviderEvent};

/// Replays one scripted response per call to `stream`, in order. Panics if
/// called more times than scripts were provided, so tests fail loudly on an
/// unexpected extra call.
pub struct ScriptedProvider {
    scripts: Mutex<Vec<Vec<ProviderEvent>>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Vec<ProviderEvent>>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
        }
    }

    /// Convenience for the common case: a single `DeltaText` followed by `Done`.
    pub fn single_text(text: impl Into<String>) -> Self {
        Self::new(vec![vec![
            ProviderEvent::DeltaText(text.into()),
            ProviderEvent::Done,
        ]])
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<ProviderEvent>, EngineError> {
        request.validate()?;
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                panic!("ScriptedProvider called more times than scripts were provided");
            }
            scripts.remove(0)
        };
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            let _ = tx.send(event).await;
        }
        Ok(rx)
    }
}
