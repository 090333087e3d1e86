//! Review generation runtime.
//!
//! Sits between the HTTP/CLI surfaces and the text generation backend:
//! - `llm` defines the backend seam ([`LlmClient`]) and a scripted client
//!   for tests and offline runs
//! - `openai` talks to any OpenAI-compatible `chat/completions` endpoint
//! - `guardrails` holds request checks that run before any backend call
//! - `runtime` drives the generate and improve flows end to end
//!
//! The model only ever produces free text. Titles, section structure and
//! error classification are decided here.

pub mod guardrails;
pub mod llm;
pub mod openai;
pub mod runtime;

pub use guardrails::{PolicyDecision, RequestPolicy};
pub use llm::{CompletionPurpose, CompletionRequest, LlmClient, LlmError, ScriptedLlmClient};
pub use openai::OpenAiClient;
pub use runtime::ReviewRuntime;
