//! Recovers a structured case review from free-text model output.
//!
//! Every field is looked up with an ordered cascade of label patterns. A
//! field whose labels are all absent is an empty string: a reply with
//! missing sections still yields a complete, well-formed record. The only
//! error is a pattern that cannot be compiled.
//!
//! Both the generate and the improve flows go through [`SectionExtractor`].

mod matcher;

pub use matcher::{MatcherCascade, SectionMatcher};

use thiserror::Error;

use crate::domain::capability::CapabilityName;
use crate::domain::review::{CapabilityJustifications, CaseReviewSections};

const BRIEF_DESCRIPTION_PATTERN: &str = r"(?s)Brief Description:\s*(.*?)(?:\n\n|$)";

const REFLECTION_PATTERNS: [(&str, &str); 3] = [
    (
        "reflection_question",
        r"(?s)Reflection: What will I maintain, improve or stop\?(.*?)(?:Learning needs|$)",
    ),
    (
        "reflection_phrase",
        r"(?s)Reflection: What will I maintain, improve or stop(.*?)(?:Learning needs|$)",
    ),
    ("reflection_bare", r"(?s)Reflection:(.*?)(?:Learning needs|$)"),
];

const LEARNING_NEEDS_PATTERN: &str = r"(?s)Learning needs identified from this event:(.*)";

/// Labels that close a capability justification.
const CAPABILITY_TERMINATORS: &str = "Reflection:|Learning needs|$";

/// Markup characters stripped from replies before extraction.
const MARKUP_CHARS: [char; 2] = ['*', '#'];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("section pattern `{matcher}` could not be compiled: {message}")]
    Pattern { matcher: &'static str, message: String },
}

/// Removes emphasis and heading markers so labels such as `**Reflection:**`
/// match their plain form.
pub fn normalize_reply(text: &str) -> String {
    text.replace(MARKUP_CHARS, "")
}

#[derive(Clone, Debug)]
pub struct SectionExtractor {
    brief_description: MatcherCascade,
    reflection: MatcherCascade,
    learning_needs: MatcherCascade,
    /// Capability cascades compiled ahead of time, usually one per taxonomy group.
    capabilities: Vec<(CapabilityName, MatcherCascade)>,
}

impl SectionExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        let reflection = REFLECTION_PATTERNS
            .iter()
            .map(|(name, pattern)| SectionMatcher::new(name, pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            brief_description: MatcherCascade::new(vec![SectionMatcher::new(
                "brief_description",
                BRIEF_DESCRIPTION_PATTERN,
            )?]),
            reflection: MatcherCascade::new(reflection),
            learning_needs: MatcherCascade::new(vec![SectionMatcher::new(
                "learning_needs",
                LEARNING_NEEDS_PATTERN,
            )?]),
            capabilities: Vec::new(),
        })
    }

    /// Precompiles capability cascades for `names`. Names outside this set
    /// still extract; their cascade is compiled on each call.
    pub fn with_capabilities<'a>(
        mut self,
        names: impl IntoIterator<Item = &'a CapabilityName>,
    ) -> Result<Self, ExtractionError> {
        for name in names {
            if self.cached_cascade(name).is_none() {
                let cascade = capability_cascade(name)?;
                self.capabilities.push((name.clone(), cascade));
            }
        }
        Ok(self)
    }

    pub fn cached_cascade(&self, name: &CapabilityName) -> Option<&MatcherCascade> {
        self.capabilities.iter().find(|(cached, _)| cached == name).map(|(_, cascade)| cascade)
    }

    /// Extracts all four sections. `capabilities` in the result holds exactly
    /// the requested names, in request order, each possibly empty.
    pub fn extract(
        &self,
        text: &str,
        capabilities: &[CapabilityName],
    ) -> Result<CaseReviewSections, ExtractionError> {
        let mut justifications = CapabilityJustifications::default();
        for name in capabilities {
            let compiled;
            let cascade = match self.cached_cascade(name) {
                Some(cascade) => cascade,
                None => {
                    compiled = capability_cascade(name)?;
                    &compiled
                }
            };
            justifications.insert(name.clone(), first_or_empty(cascade, text));
        }

        Ok(CaseReviewSections {
            brief_description: first_or_empty(&self.brief_description, text),
            capabilities: justifications,
            reflection: first_or_empty(&self.reflection, text),
            learning_needs: first_or_empty(&self.learning_needs, text),
        })
    }
}

fn first_or_empty(cascade: &MatcherCascade, text: &str) -> String {
    cascade.first_match(text).map(|(_, content)| content).unwrap_or_default()
}

/// Builds the three capability shapes, most specific first:
/// `Capability: <name> ... Justification ...:`, then `<name>:`, then `<name>`
/// alone on its line. The name is escaped and matched literally.
pub fn capability_cascade(name: &CapabilityName) -> Result<MatcherCascade, ExtractionError> {
    let escaped = regex::escape(name.as_str());

    Ok(MatcherCascade::new(vec![
        SectionMatcher::new(
            "capability_labelled",
            &format!(
                r"(?s)Capability: {escaped}.*?Justification.*?:(.*?)(?:Capability:|{CAPABILITY_TERMINATORS})"
            ),
        )?,
        SectionMatcher::new(
            "capability_colon",
            &format!(r"(?s){escaped}:(.*?)(?:\n\n[A-Za-z]|{CAPABILITY_TERMINATORS})"),
        )?,
        SectionMatcher::new(
            "capability_line",
            &format!(r"(?s){escaped}\n(.*?)(?:\n\n[A-Za-z]|{CAPABILITY_TERMINATORS})"),
        )?,
    ]))
}
