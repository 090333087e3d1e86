//! Prompt composition for the generation backend.
//!
//! Three independent composers live here:
//! - the case review prompt (system instructions, two few-shot pairs, request)
//! - the short title prompt, shared by the generate and improve flows
//! - the improvement prompt, which resubmits an existing review
//!
//! Composition is pure. Capability names are not checked against the
//! taxonomy here; callers that want that check do it before composing.

pub mod templates;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::capability::CapabilityName;

use self::templates::{
    EXAMPLE_1_REQUEST, EXAMPLE_1_RESPONSE, EXAMPLE_2_REQUEST, EXAMPLE_2_RESPONSE,
    IMPROVE_REMINDER, IMPROVE_SYSTEM_PROMPT, JUSTIFICATION_PROMPT, REVIEW_REQUEST_PREAMBLE,
    REVIEW_REQUEST_TEMPLATE, REVIEW_REQUEST_TEMPLATE_NAME, SYSTEM_PROMPT, TITLE_REQUEST_PREFIX,
    TITLE_SYSTEM_PROMPT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt template `{name}` is invalid: {message}")]
    Template { name: &'static str, message: String },
    #[error("prompt template `{name}` failed to render: {message}")]
    Render { name: &'static str, message: String },
}

pub struct PromptComposer {
    templates: Tera,
}

impl PromptComposer {
    pub fn new() -> Result<Self, PromptError> {
        let mut templates = Tera::default();
        templates.autoescape_on(Vec::new());
        templates
            .add_raw_template(REVIEW_REQUEST_TEMPLATE_NAME, REVIEW_REQUEST_TEMPLATE)
            .map_err(|error| PromptError::Template {
                name: REVIEW_REQUEST_TEMPLATE_NAME,
                message: error.to_string(),
            })?;
        Ok(Self { templates })
    }

    /// Builds the full message sequence for a fresh case review: system
    /// instructions, both few-shot pairs in order, then the request.
    pub fn review_messages(
        &self,
        case_description: &str,
        capabilities: &[CapabilityName],
    ) -> Result<Vec<ChatMessage>, PromptError> {
        let request = self.render_review_request(case_description, capabilities)?;

        Ok(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(EXAMPLE_1_REQUEST),
            ChatMessage::assistant(EXAMPLE_1_RESPONSE),
            ChatMessage::user(EXAMPLE_2_REQUEST),
            ChatMessage::assistant(EXAMPLE_2_RESPONSE),
            ChatMessage::user(format!("{REVIEW_REQUEST_PREAMBLE}\n{request}")),
        ])
    }

    fn render_review_request(
        &self,
        case_description: &str,
        capabilities: &[CapabilityName],
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("case_description", case_description);
        context.insert("formatted_capabilities", &format_capabilities(capabilities));

        self.templates.render(REVIEW_REQUEST_TEMPLATE_NAME, &context).map_err(|error| {
            PromptError::Render { name: REVIEW_REQUEST_TEMPLATE_NAME, message: error.to_string() }
        })
    }
}

/// One `Capability:` header plus the justification prompt per capability,
/// each followed by a blank line, in caller order.
pub fn format_capabilities(capabilities: &[CapabilityName]) -> String {
    capabilities
        .iter()
        .map(|name| format!("Capability: {name}\n{JUSTIFICATION_PROMPT}\n\n"))
        .collect()
}

pub fn title_messages(source_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(TITLE_SYSTEM_PROMPT),
        ChatMessage::user(format!("{TITLE_REQUEST_PREFIX}\n{source_text}")),
    ]
}

pub fn improve_messages(original_review: &str, improvement_prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(IMPROVE_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Current case review:\n{original_review}\n\nRequested improvement:\n{improvement_prompt}\n\n{IMPROVE_REMINDER}"
        )),
    ]
}
