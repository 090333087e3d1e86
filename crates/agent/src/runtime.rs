use std::sync::Arc;

use gpfolio_core::config::{AppConfig, LlmConfig};
use gpfolio_core::prompts::{improve_messages, title_messages};
use gpfolio_core::{
    normalize_reply, ApplicationError, CapabilityName, CapabilityTaxonomy, CaseReviewRequest,
    CaseReviewResult, CaseReviewSections, DomainError, GenerationStage, ImprovementRequest,
    PromptComposer, SectionExtractor,
};
use tracing::{info, warn};

use crate::guardrails::{PolicyDecision, RequestPolicy};
use crate::llm::{CompletionPurpose, CompletionRequest, LlmClient, LlmError};

/// Orchestrates prompt composition, generation calls and section extraction
/// for both review flows. Holds no per-request state.
pub struct ReviewRuntime {
    llm: LlmConfig,
    fallback_title: String,
    composer: PromptComposer,
    extractor: SectionExtractor,
    taxonomy: Arc<CapabilityTaxonomy>,
    client: Arc<dyn LlmClient>,
    policy: RequestPolicy,
}

impl ReviewRuntime {
    pub fn new(
        config: &AppConfig,
        taxonomy: Arc<CapabilityTaxonomy>,
        client: Arc<dyn LlmClient>,
    ) -> Result<Self, ApplicationError> {
        let composer = PromptComposer::new().map_err(DomainError::from)?;
        let extractor = SectionExtractor::new()
            .and_then(|extractor| extractor.with_capabilities(taxonomy.names()))
            .map_err(DomainError::from)?;

        Ok(Self {
            llm: config.llm.clone(),
            fallback_title: config.review.fallback_title.clone(),
            composer,
            extractor,
            taxonomy,
            client,
            policy: RequestPolicy {
                enforce_known_capabilities: config.review.enforce_known_capabilities,
            },
        })
    }

    pub fn capabilities(&self) -> &CapabilityTaxonomy {
        &self.taxonomy
    }

    pub fn fallback_title(&self) -> &str {
        &self.fallback_title
    }

    /// Generates a review and its title. The two backend calls are
    /// independent and run concurrently; only the content call can fail the
    /// request.
    pub async fn generate_case_review(
        &self,
        request: &CaseReviewRequest,
    ) -> Result<CaseReviewResult, ApplicationError> {
        request.validate()?;
        self.check_policy(&request.selected_capabilities)?;

        let messages = self
            .composer
            .review_messages(&request.case_description, &request.selected_capabilities)
            .map_err(DomainError::from)?;
        let content_request = CompletionRequest {
            purpose: CompletionPurpose::Review,
            model: self.llm.model.clone(),
            messages,
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        };
        let title_request = self.title_request(&request.case_description);

        info!(
            event_name = "review.generate.started",
            description_chars = request.case_description.chars().count(),
            capabilities = request.selected_capabilities.len(),
            "generating case review"
        );

        let (content, title) = tokio::join!(
            self.client.complete(&content_request),
            self.client.complete(&title_request)
        );
        let content = content.map_err(|error| backend_failure(GenerationStage::Content, error))?;
        let (review_content, sections) = self.extract(&content, &request.selected_capabilities)?;
        let case_title = self.resolve_title(title);

        log_completed(GenerationStage::Content, &case_title, &review_content, &sections);
        Ok(CaseReviewResult { case_title, review_content, sections })
    }

    /// Rewrites an existing review per the instruction, then titles the
    /// result from its extracted brief description.
    pub async fn improve_case_review(
        &self,
        request: &ImprovementRequest,
    ) -> Result<CaseReviewResult, ApplicationError> {
        request.validate()?;
        self.check_policy(&request.selected_capabilities)?;

        let improve_request = CompletionRequest {
            purpose: CompletionPurpose::Improvement,
            model: self.llm.model.clone(),
            messages: improve_messages(&request.original_case, &request.improvement_prompt),
            max_tokens: self.llm.improve_max_tokens,
            temperature: self.llm.temperature,
        };

        info!(
            event_name = "review.improve.started",
            original_chars = request.original_case.chars().count(),
            instruction_chars = request.improvement_prompt.chars().count(),
            capabilities = request.selected_capabilities.len(),
            "improving case review"
        );

        let content = self
            .client
            .complete(&improve_request)
            .await
            .map_err(|error| backend_failure(GenerationStage::Improvement, error))?;

        let (review_content, sections) = self.extract(&content, &request.selected_capabilities)?;

        let case_title = if sections.brief_description.is_empty() {
            warn!(
                event_name = "review.title.skipped",
                reason = "empty_brief_description",
                "improved review has no brief description; using fallback title"
            );
            self.fallback_title.clone()
        } else {
            let title_request = self.title_request(&sections.brief_description);
            self.resolve_title(self.client.complete(&title_request).await)
        };

        log_completed(GenerationStage::Improvement, &case_title, &review_content, &sections);
        Ok(CaseReviewResult { case_title, review_content, sections })
    }

    fn extract(
        &self,
        content: &str,
        capabilities: &[CapabilityName],
    ) -> Result<(String, CaseReviewSections), ApplicationError> {
        let review_content = normalize_reply(content);
        let sections =
            self.extractor.extract(&review_content, capabilities).map_err(DomainError::from)?;
        Ok((review_content, sections))
    }

    fn check_policy(&self, selected: &[CapabilityName]) -> Result<(), ApplicationError> {
        match self.policy.evaluate(selected, &self.taxonomy) {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny { reason_code, user_message } => {
                warn!(event_name = "review.policy.denied", reason_code, "request denied by policy");
                Err(DomainError::InvalidRequest(user_message).into())
            }
        }
    }

    fn title_request(&self, source_text: &str) -> CompletionRequest {
        CompletionRequest {
            purpose: CompletionPurpose::Title,
            model: self.llm.title_model.clone(),
            messages: title_messages(source_text),
            max_tokens: self.llm.title_max_tokens,
            temperature: self.llm.temperature,
        }
    }

    fn resolve_title(&self, reply: Result<String, LlmError>) -> String {
        match reply {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    warn!(event_name = "review.title.fallback", reason = "empty_title", "title reply was empty");
                    self.fallback_title.clone()
                } else {
                    title
                }
            }
            Err(error) => {
                warn!(
                    event_name = "review.title.fallback",
                    reason = "backend_error",
                    error = %error,
                    "title generation failed; using fallback title"
                );
                self.fallback_title.clone()
            }
        }
    }
}

fn clean_title(raw: &str) -> String {
    raw.trim().replace('"', "").trim().to_string()
}

fn backend_failure(stage: GenerationStage, error: LlmError) -> ApplicationError {
    warn!(event_name = "review.backend.failed", stage = %stage, error = %error, "generation call failed");
    ApplicationError::Backend { stage, message: error.to_string() }
}

fn log_completed(
    stage: GenerationStage,
    case_title: &str,
    review_content: &str,
    sections: &CaseReviewSections,
) {
    info!(
        event_name = "review.completed",
        stage = %stage,
        title_chars = case_title.chars().count(),
        content_chars = review_content.chars().count(),
        empty_sections = ?sections.empty_fields(),
        "case review ready"
    );
}
