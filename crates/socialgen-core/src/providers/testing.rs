//! Scripted backend used by the provider and manager tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::types::{BackendError, CompletionBackend};

enum Script {
    Reply(Result<String, BackendError>),
    Slow(Duration),
}

/// Answers each model with a fixed outcome and records call order
pub(crate) struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok(mut self, model: &str, text: &str) -> Self {
        self.scripts
            .insert(model.to_string(), Script::Reply(Ok(text.to_string())));
        self
    }

    pub(crate) fn fail(mut self, model: &str, error: BackendError) -> Self {
        self.scripts
            .insert(model.to_string(), Script::Reply(Err(error)));
        self
    }

    /// Sleep for `delay` and then succeed
    pub(crate) fn slow(mut self, model: &str, delay: Duration) -> Self {
        self.scripts.insert(model.to_string(), Script::Slow(delay));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn backend_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, model: &str, _prompt: &str) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(model.to_string());
        match self.scripts.get(model) {
            Some(Script::Reply(result)) => result.clone(),
            Some(Script::Slow(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(format!("late reply from {model}"))
            }
            None => Err(BackendError::Http {
                status: 404,
                message: format!("model {model} not found"),
            }),
        }
    }
}
