use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::capability::CapabilityName;
use crate::errors::DomainError;

pub const MIN_CASE_DESCRIPTION_CHARS: usize = 10;
pub const MAX_SELECTED_CAPABILITIES: usize = 3;

/// One justification per requested capability, kept in request order.
///
/// Serializes as a JSON object so clients can index by capability name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityJustifications {
    entries: Vec<(CapabilityName, String)>,
}

impl CapabilityJustifications {
    /// Records the justification for `name`, replacing an earlier value for
    /// the same capability without moving it.
    pub fn insert(&mut self, name: CapabilityName, justification: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, value)) => *value = justification,
            None => self.entries.push((name, justification)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityName, &str)> {
        self.entries.iter().map(|(name, value)| (name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CapabilityJustifications {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, justification) in &self.entries {
            map.serialize_entry(name.as_str(), justification)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CaseReviewSections {
    pub brief_description: String,
    pub capabilities: CapabilityJustifications,
    pub reflection: String,
    pub learning_needs: String,
}

impl CaseReviewSections {
    /// Names of the fields the reply did not fill, for diagnostics.
    pub fn empty_fields(&self) -> Vec<&'static str> {
        let mut empty = Vec::new();
        if self.brief_description.is_empty() {
            empty.push("brief_description");
        }
        if self.capabilities.iter().any(|(_, value)| value.is_empty()) {
            empty.push("capabilities");
        }
        if self.reflection.is_empty() {
            empty.push("reflection");
        }
        if self.learning_needs.is_empty() {
            empty.push("learning_needs");
        }
        empty
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CaseReviewResult {
    pub case_title: String,
    pub review_content: String,
    pub sections: CaseReviewSections,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReviewRequest {
    pub case_description: String,
    pub selected_capabilities: Vec<CapabilityName>,
}

impl CaseReviewRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.case_description.chars().count() < MIN_CASE_DESCRIPTION_CHARS {
            return Err(DomainError::InvalidRequest(format!(
                "case_description must be at least {MIN_CASE_DESCRIPTION_CHARS} characters"
            )));
        }
        validate_selection(&self.selected_capabilities, MAX_SELECTED_CAPABILITIES)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementRequest {
    pub original_case: String,
    pub improvement_prompt: String,
    pub selected_capabilities: Vec<CapabilityName>,
}

impl ImprovementRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.original_case.trim().is_empty() {
            return Err(DomainError::InvalidRequest("original_case must not be empty".to_string()));
        }
        if self.improvement_prompt.trim().is_empty() {
            return Err(DomainError::InvalidRequest(
                "improvement_prompt must not be empty".to_string(),
            ));
        }
        // Improvement keeps whatever the original review covered, so no upper bound.
        validate_selection(&self.selected_capabilities, usize::MAX)
    }
}

fn validate_selection(selected: &[CapabilityName], max: usize) -> Result<(), DomainError> {
    if selected.is_empty() {
        return Err(DomainError::InvalidRequest(
            "selected_capabilities must contain at least one capability".to_string(),
        ));
    }
    if selected.len() > max {
        return Err(DomainError::InvalidRequest(format!(
            "selected_capabilities must contain at most {max} capabilities"
        )));
    }
    if let Some(blank) = selected.iter().find(|name| name.as_str().trim().is_empty()) {
        return Err(DomainError::InvalidRequest(format!(
            "selected_capabilities contains a blank entry `{blank}`"
        )));
    }
    Ok(())
}
