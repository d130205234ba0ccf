//! Scripted model provider for loop and fan-out tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ai::provider::ModelProvider;
use crate::ai::retry::ProviderError;
use crate::ai::types::{AiToolCall, ModelRequest, ModelResponse};

type Responder = Box<dyn Fn(&ModelRequest) -> Result<ModelResponse, ProviderError> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<ModelResponse, ProviderError>>>),
    Func(Responder),
}

/// Replays canned responses, or answers through a closure when the order of
/// calls is not deterministic (fan-out)
pub(crate) struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(responses.into())))
    }

    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse, ProviderError> + Send + Sync + 'static,
    {
        Self::with_script(Script::Func(Box::new(f)))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Decode("script exhausted".into()))),
            Script::Func(f) => f(request),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

pub(crate) fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> AiToolCall {
    AiToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub(crate) fn rate_limited() -> ProviderError {
    ProviderError::Http {
        status: 429,
        code: Some("rate_limit_exceeded".into()),
        message: "Rate limit reached".into(),
        retry_after: None,
    }
}
