use std::fs;
use std::path::Path;

use gpfolio_core::{normalize_reply, CapabilityName, CaseReviewSections, SectionExtractor};
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ExtractReport {
    sections: CaseReviewSections,
    empty_sections: Vec<&'static str>,
}

/// Runs the same normalise-then-extract pass the service applies to live
/// replies, against a reply saved on disk.
pub fn run(input: &Path, capabilities: &[String]) -> CommandResult {
    let raw = match fs::read_to_string(input) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "io",
                format!("failed to read {}: {error}", input.display()),
                2,
            )
        }
    };

    let names: Vec<CapabilityName> =
        capabilities.iter().map(|name| CapabilityName::from(name.as_str())).collect();

    let sections = SectionExtractor::new()
        .and_then(|extractor| extractor.extract(&normalize_reply(&raw), &names));

    match sections {
        Ok(sections) => {
            let empty_sections = sections.empty_fields();
            CommandResult::document("extract", &ExtractReport { sections, empty_sections })
        }
        Err(error) => CommandResult::failure("extract", "extraction", error.to_string(), 1),
    }
}
