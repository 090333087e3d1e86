use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Framework text compiled into the binary, used when no source file is configured.
pub const DEFAULT_TAXONOMY_SOURCE: &str = include_str!("../../../../config/capabilities.txt");

const DESCRIPTOR_MARKER: char = '-';

/// Name of a capability group. Used verbatim as a map key and as a literal
/// label searched for in generated text, so case and spacing matter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityName(pub String);

impl CapabilityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CapabilityName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityGroup {
    pub name: CapabilityName,
    pub descriptors: Vec<String>,
}

/// Two-level capability framework: group header -> ordered descriptors.
///
/// Built once from plain text and read-only afterwards. Group order follows
/// the source text, and serialization keeps that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityTaxonomy {
    groups: Vec<CapabilityGroup>,
}

impl CapabilityTaxonomy {
    /// Parses the framework text.
    ///
    /// Lines not starting with `-` open a new group; `-` lines belong to the
    /// most recent group with leading `-` and spaces removed. Groups without
    /// any descriptor are dropped and a repeated header replaces the earlier
    /// group's descriptors in place. Malformed input never fails.
    pub fn parse(source: &str) -> Self {
        let mut taxonomy = Self::default();
        let mut current: Option<CapabilityName> = None;
        let mut descriptors: Vec<String> = Vec::new();

        for line in source.lines().filter(|line| !line.trim().is_empty()).map(str::trim_end) {
            if line.starts_with(DESCRIPTOR_MARKER) {
                descriptors.push(line.trim_start_matches(['-', ' ']).to_string());
                continue;
            }

            if let Some(name) = current.take() {
                taxonomy.insert(name, std::mem::take(&mut descriptors));
            }
            descriptors.clear();
            current = Some(CapabilityName::from(line));
        }

        if let Some(name) = current {
            taxonomy.insert(name, descriptors);
        }

        taxonomy
    }

    fn insert(&mut self, name: CapabilityName, descriptors: Vec<String>) {
        if descriptors.is_empty() {
            return;
        }

        match self.groups.iter_mut().find(|group| group.name == name) {
            Some(existing) => existing.descriptors = descriptors,
            None => self.groups.push(CapabilityGroup { name, descriptors }),
        }
    }

    pub fn groups(&self) -> &[CapabilityGroup] {
        &self.groups
    }

    pub fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.groups.iter().map(|group| &group.name)
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|group| group.name.as_str() == name)
            .map(|group| group.descriptors.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read capability source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("capability source {origin} contains no capability groups")]
    Empty { origin: String },
}

/// Loads the taxonomy from `source_path`, or from the built-in framework
/// text when no path is given. An empty result is an error: a service
/// without capabilities cannot build a single prompt.
pub fn load_taxonomy(source_path: Option<&Path>) -> Result<CapabilityTaxonomy, TaxonomyError> {
    let (origin, taxonomy) = match source_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|source| TaxonomyError::Read { path: path.to_path_buf(), source })?;
            (path.display().to_string(), CapabilityTaxonomy::parse(&text))
        }
        None => ("built-in".to_string(), CapabilityTaxonomy::parse(DEFAULT_TAXONOMY_SOURCE)),
    };

    if taxonomy.is_empty() {
        return Err(TaxonomyError::Empty { origin });
    }
    Ok(taxonomy)
}

impl Serialize for CapabilityTaxonomy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(group.name.as_str(), &group.descriptors)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use super::{
        load_taxonomy, CapabilityName, CapabilityTaxonomy, TaxonomyError, DEFAULT_TAXONOMY_SOURCE,
    };

    fn descriptors(taxonomy: &CapabilityTaxonomy, name: &str) -> Vec<String> {
        taxonomy.get(name).map(<[String]>::to_vec).unwrap_or_default()
    }

    #[test]
    fn parses_headers_and_descriptor_lines() {
        let taxonomy = CapabilityTaxonomy::parse("GroupA\n- x\n- y\nGroupB\n- z");

        assert_eq!(taxonomy.len(), 2);
        assert_eq!(descriptors(&taxonomy, "GroupA"), vec!["x", "y"]);
        assert_eq!(descriptors(&taxonomy, "GroupB"), vec!["z"]);
        let names: Vec<&str> = taxonomy.names().map(CapabilityName::as_str).collect();
        assert_eq!(names, vec!["GroupA", "GroupB"]);
    }

    #[test]
    fn header_without_descriptors_is_dropped() {
        let taxonomy = CapabilityTaxonomy::parse("Empty\nGroupA\n- x\nTrailing");

        assert_eq!(taxonomy.len(), 1);
        assert!(!taxonomy.contains("Empty"));
        assert!(!taxonomy.contains("Trailing"));
        assert!(taxonomy.contains("GroupA"));
    }

    #[test]
    fn blank_lines_and_trailing_whitespace_are_ignored() {
        let taxonomy = CapabilityTaxonomy::parse("\n  \nGroupA   \n\n-   spaced out  \n--double\n");

        assert_eq!(descriptors(&taxonomy, "GroupA"), vec!["spaced out", "double"]);
    }

    #[test]
    fn descriptors_before_first_header_are_ignored() {
        let taxonomy = CapabilityTaxonomy::parse("- orphan\nGroupA\n- x");

        assert_eq!(taxonomy.len(), 1);
        assert_eq!(descriptors(&taxonomy, "GroupA"), vec!["x"]);
    }

    #[test]
    fn repeated_header_replaces_descriptors_in_place() {
        let taxonomy = CapabilityTaxonomy::parse("GroupA\n- x\nGroupB\n- y\nGroupA\n- z");

        let names: Vec<&str> = taxonomy.names().map(CapabilityName::as_str).collect();
        assert_eq!(names, vec!["GroupA", "GroupB"]);
        assert_eq!(descriptors(&taxonomy, "GroupA"), vec!["z"]);
    }

    #[test]
    fn parsing_is_repeatable() {
        let source = "GroupA\n- x\nGroupB\n- y";
        assert_eq!(CapabilityTaxonomy::parse(source), CapabilityTaxonomy::parse(source));
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let taxonomy = CapabilityTaxonomy::parse("Zeta\n- last letter\nAlpha\n- first letter");
        let json = serde_json::to_string(&taxonomy).expect("serialize taxonomy");

        assert_eq!(json, r#"{"Zeta":["last letter"],"Alpha":["first letter"]}"#);
    }

    #[test]
    fn built_in_framework_parses_into_groups() {
        let taxonomy = CapabilityTaxonomy::parse(DEFAULT_TAXONOMY_SOURCE);

        assert_eq!(taxonomy.len(), 13);
        assert!(taxonomy.contains("Communication and consultation skills"));
        assert!(taxonomy.contains("Clinical management"));
        assert!(taxonomy.groups().iter().all(|group| !group.descriptors.is_empty()));
    }

    #[test]
    fn load_without_path_uses_built_in_framework() {
        let taxonomy = load_taxonomy(None).expect("built-in taxonomy");
        assert_eq!(taxonomy, CapabilityTaxonomy::parse(DEFAULT_TAXONOMY_SOURCE));
    }

    #[test]
    fn load_reads_configured_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Making decisions\n- Uses tools\n- Weighs risk").expect("write");

        let taxonomy = load_taxonomy(Some(file.path())).expect("taxonomy");
        assert_eq!(taxonomy.len(), 1);
        assert_eq!(descriptors(&taxonomy, "Making decisions"), vec!["Uses tools", "Weighs risk"]);
    }

    #[test]
    fn load_rejects_source_without_groups() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Heading only\nAnother heading").expect("write");

        let error = load_taxonomy(Some(file.path())).expect_err("empty taxonomy");
        assert!(matches!(error, TaxonomyError::Empty { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let error = load_taxonomy(Some(Path::new("/nonexistent/capabilities.txt")))
            .expect_err("missing file");
        assert!(matches!(error, TaxonomyError::Read { .. }));
        assert!(error.to_string().contains("/nonexistent/capabilities.txt"));
    }
}
