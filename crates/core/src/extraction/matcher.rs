use regex::Regex;

use super::ExtractionError;

/// One labelled text shape. Captures group 1 and trims it.
#[derive(Clone, Debug)]
pub struct SectionMatcher {
    name: &'static str,
    regex: Regex,
}

impl SectionMatcher {
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, ExtractionError> {
        let regex = Regex::new(pattern)
            .map_err(|error| ExtractionError::Pattern { matcher: name, message: error.to_string() })?;
        Ok(Self { name, regex })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capture(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|content| content.as_str().trim().to_string())
    }
}

/// Ordered fallback list for one field. The first matcher that matches wins,
/// even when its capture trims down to an empty string.
#[derive(Clone, Debug, Default)]
pub struct MatcherCascade {
    matchers: Vec<SectionMatcher>,
}

impl MatcherCascade {
    pub fn new(matchers: Vec<SectionMatcher>) -> Self {
        Self { matchers }
    }

    pub fn first_match(&self, text: &str) -> Option<(&'static str, String)> {
        self.matchers
            .iter()
            .find_map(|matcher| matcher.capture(text).map(|content| (matcher.name(), content)))
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(SectionMatcher::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{MatcherCascade, SectionMatcher};

    fn matcher(name: &'static str, pattern: &str) -> SectionMatcher {
        SectionMatcher::new(name, pattern).expect("valid pattern")
    }

    #[test]
    fn capture_trims_first_group() {
        let matcher = matcher("label", r"(?s)Label:(.*?)(?:\n\n|$)");
        assert_eq!(matcher.capture("Label:   padded value \n\nnext"), Some("padded value".to_string()));
        assert_eq!(matcher.capture("no label here"), None);
    }

    #[test]
    fn cascade_returns_first_matching_matcher() {
        let cascade = MatcherCascade::new(vec![
            matcher("strict", r"(?s)Strict:(.*)"),
            matcher("loose", r"(?s)Loose:(.*)"),
            matcher("looser", r"(?s)Lo(.*)"),
        ]);

        assert_eq!(cascade.first_match("Loose: value"), Some(("loose", "value".to_string())));
        assert_eq!(cascade.first_match("nothing"), None);
        assert_eq!(cascade.matcher_names(), vec!["strict", "loose", "looser"]);
    }

    #[test]
    fn empty_capture_still_wins() {
        let cascade = MatcherCascade::new(vec![
            matcher("empty", r"(?s)Label:(\s*)$"),
            matcher("fallback", r"(?s)(Label)"),
        ]);

        assert_eq!(cascade.first_match("Label:   "), Some(("empty", String::new())));
    }

    #[test]
    fn invalid_pattern_is_reported_with_matcher_name() {
        let error = SectionMatcher::new("broken", "(unclosed").expect_err("pattern should fail");
        assert!(error.to_string().contains("broken"));
    }
}
