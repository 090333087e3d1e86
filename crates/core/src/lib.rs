//! Domain core for GP portfolio case reviews: configuration, the capability
//! taxonomy, prompt composition and section extraction.

pub mod config;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod prompts;

pub use domain::capability::{
    load_taxonomy, CapabilityGroup, CapabilityName, CapabilityTaxonomy, TaxonomyError,
};
pub use domain::review::{
    CapabilityJustifications, CaseReviewRequest, CaseReviewResult, CaseReviewSections,
    ImprovementRequest,
};
pub use errors::{ApplicationError, DomainError, GenerationStage, InterfaceError};
pub use extraction::{normalize_reply, ExtractionError, SectionExtractor};
pub use prompts::{ChatMessage, ChatRole, PromptComposer, PromptError};
