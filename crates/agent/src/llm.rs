use std::sync::Mutex;

use async_trait::async_trait;
use gpfolio_core::ChatMessage;
use thiserror::Error;

/// Why a completion is requested. Not sent to the backend; used for logs and
/// by scripted clients to answer each call appropriately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionPurpose {
    Review,
    Title,
    Improvement,
}

impl CompletionPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Title => "title",
            Self::Improvement => "improvement",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub purpose: CompletionPurpose,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("request to generation backend failed: {0}")]
    Transport(String),
    #[error("generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation backend response could not be decoded: {0}")]
    Decode(String),
    #[error("generation backend reported an error: {0}")]
    Api(String),
    #[error("generation backend returned no content")]
    EmptyResponse,
}

/// Text generation backend. One call, one attempt: implementations must not
/// retry on their own.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync;

/// In-process client that answers from a closure and records every request.
pub struct ScriptedLlmClient {
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self { responder: Box::new(responder), requests: Mutex::new(Vec::new()) }
    }

    /// Answers review/improvement calls with `content` and title calls with `title`.
    pub fn with_replies(content: impl Into<String>, title: impl Into<String>) -> Self {
        let content = content.into();
        let title = title.into();
        Self::new(move |request| match request.purpose {
            CompletionPurpose::Title => Ok(title.clone()),
            CompletionPurpose::Review | CompletionPurpose::Improvement => Ok(content.clone()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn requests_for(&self, purpose: CompletionPurpose) -> Vec<CompletionRequest> {
        self.requests().into_iter().filter(|request| request.purpose == purpose).collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.responder)(request)
    }
}
