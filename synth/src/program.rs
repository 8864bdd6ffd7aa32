//! Program representation shared across sessions
//!
//! A `Program` owns the parsed source units, the units generated from them,
//! the `SourceMap` holding every unit's text and the artifact registry that
//! remembers which generated unit came from which source. It only changes
//! through [`Program::add_source`], [`Program::apply_changes`] and the
//! session's serial commit.

use diagnostics::{Diagnostics, FileId, SourceMap, SourceSpan};
use indexmap::{IndexMap, IndexSet};
use parser::{parse_unit_in, Span, Unit};
use serde::{Deserialize, Serialize};

/// Where a unit came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    Source,
    Generated { from: String },
}

/// A parsed unit registered in the program
#[derive(Debug, Clone)]
pub struct ProgramUnit {
    pub path: String,
    pub file_id: FileId,
    pub unit: Unit,
    pub origin: UnitOrigin,
}

impl ProgramUnit {
    pub fn is_generated(&self) -> bool {
        matches!(self.origin, UnitOrigin::Generated { .. })
    }

    /// Map a node span of this unit to file/line/column
    pub fn source_span(&self, source_map: &SourceMap, span: Span) -> SourceSpan {
        source_map
            .span_from_offsets(self.file_id, span.start, span.end)
            .unwrap_or_else(SourceSpan::unknown)
    }
}

/// Path plus text of a unit fed to the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: String,
    pub text: String,
}

impl SourceText {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Incremental change feed between two sessions
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub added: Vec<SourceText>,
    pub changed: Vec<SourceText>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.added.push(SourceText::new(path, text));
        self
    }

    pub fn change(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.changed.push(SourceText::new(path, text));
        self
    }

    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.removed.push(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

// =============================================================================
// Artifact Registry
// =============================================================================

/// Source unit path -> generated artifact paths, in generation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRegistry {
    artifacts: IndexMap<String, Vec<String>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the artifacts recorded for `source`
    pub fn record(&mut self, source: impl Into<String>, artifacts: Vec<String>) {
        let source = source.into();
        if artifacts.is_empty() {
            self.artifacts.shift_remove(&source);
        } else {
            self.artifacts.insert(source, artifacts);
        }
    }

    /// Forget `source`, returning the artifacts it had
    pub fn remove(&mut self, source: &str) -> Vec<String> {
        self.artifacts.shift_remove(source).unwrap_or_default()
    }

    pub fn artifacts_of(&self, source: &str) -> &[String] {
        self.artifacts.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source unit an artifact was generated from
    pub fn source_of(&self, artifact: &str) -> Option<&str> {
        self.artifacts
            .iter()
            .find(|(_, artifacts)| artifacts.iter().any(|a| a == artifact))
            .map(|(source, _)| source.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.artifacts
            .iter()
            .map(|(source, artifacts)| (source.as_str(), artifacts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Output
// =============================================================================

/// One rewritten unit handed downstream
#[derive(Debug, Clone)]
pub struct ExpandedUnit {
    pub path: String,
    pub origin: UnitOrigin,
    pub unit: Unit,
    pub text: String,
}

/// Rewritten units of a committed session, in program order
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub units: IndexMap<String, ExpandedUnit>,
}

impl Output {
    pub fn get(&self, path: &str) -> Option<&ExpandedUnit> {
        self.units.get(path)
    }

    /// Printed text of `path`
    pub fn text(&self, path: &str) -> Option<&str> {
        self.units.get(path).map(|u| u.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpandedUnit> {
        self.units.values()
    }

    pub fn generated(&self) -> impl Iterator<Item = &ExpandedUnit> {
        self.units
            .values()
            .filter(|u| matches!(u.origin, UnitOrigin::Generated { .. }))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Everything a successful session writes back into the program
#[derive(Debug)]
pub(crate) struct Commit {
    pub source_map: SourceMap,
    /// Freshly generated units, grouped by the source they came from
    pub generated: IndexMap<String, Vec<ProgramUnit>>,
    pub output: Output,
}

// =============================================================================
// Program
// =============================================================================

#[derive(Debug, Default)]
pub struct Program {
    units: IndexMap<String, ProgramUnit>,
    source_map: SourceMap,
    artifacts: ArtifactRegistry,
    /// Sources whose synthesized artifacts must be regenerated
    stale: IndexSet<String>,
    expanded: Option<Output>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a source unit, replacing any unit with the same
    /// path. Artifacts generated from the old version are dropped.
    pub fn add_source(&mut self, path: &str, text: &str) -> Result<(), Diagnostics> {
        self.drop_artifacts(path);
        let file_id = self.source_map.add_file(path.to_string(), text.to_string());
        let parsed = parse_unit_in(file_id, path, text);
        self.stale.insert(path.to_string());
        match parsed {
            Ok(unit) => {
                log::debug!("registered source unit {}", path);
                self.units.insert(
                    path.to_string(),
                    ProgramUnit {
                        path: path.to_string(),
                        file_id,
                        unit,
                        origin: UnitOrigin::Source,
                    },
                );
                Ok(())
            }
            Err(diagnostics) => {
                // keep the text for rendering, but the unit cannot take part
                self.units.shift_remove(path);
                Err(diagnostics)
            }
        }
    }

    /// Apply an incremental change feed. Added and changed units become stale
    /// and are re-synthesized by the next session; removed units disappear
    /// together with their artifacts. Parse failures are returned as data.
    pub fn apply_changes(&mut self, changes: ChangeSet) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        for path in &changes.removed {
            self.drop_artifacts(path);
            self.units.shift_remove(path);
            self.source_map.remove_file(path);
            self.stale.shift_remove(path);
            log::debug!("removed source unit {}", path);
        }

        for source in changes.added.iter().chain(changes.changed.iter()) {
            if let Err(errors) = self.add_source(&source.path, &source.text) {
                diagnostics.extend(errors);
            }
        }

        diagnostics
    }

    fn drop_artifacts(&mut self, source: &str) {
        for artifact in self.artifacts.remove(source) {
            self.units.shift_remove(&artifact);
            self.source_map.remove_file(&artifact);
            log::trace!("dropped artifact {} of {}", artifact, source);
        }
    }

    pub(crate) fn commit(&mut self, commit: Commit) {
        self.source_map = commit.source_map;
        for (source, generated) in commit.generated {
            let paths = generated.iter().map(|u| u.path.clone()).collect();
            for unit in generated {
                self.units.insert(unit.path.clone(), unit);
            }
            self.artifacts.record(source.clone(), paths);
            self.stale.shift_remove(&source);
        }
        // stale sources that produced nothing are settled too
        let settled: Vec<String> = self
            .stale
            .iter()
            .filter(|path| self.units.contains_key(path.as_str()))
            .cloned()
            .collect();
        for path in settled {
            self.stale.shift_remove(&path);
        }
        self.expanded = Some(commit.output);
    }

    pub fn units(&self) -> impl Iterator<Item = &ProgramUnit> {
        self.units.values()
    }

    pub fn source_units(&self) -> impl Iterator<Item = &ProgramUnit> {
        self.units.values().filter(|u| !u.is_generated())
    }

    pub fn get(&self, path: &str) -> Option<&ProgramUnit> {
        self.units.get(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn is_stale(&self, path: &str) -> bool {
        self.stale.contains(path)
    }

    pub fn stale_sources(&self) -> impl Iterator<Item = &str> {
        self.stale.iter().map(String::as_str)
    }

    /// Rewritten units of the last committed session
    pub fn expanded(&self) -> Option<&Output> {
        self.expanded.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_source_marks_stale() {
        let mut program = Program::new();
        program
            .add_source("a.lm", "class A { }")
            .expect("unit should parse");
        assert!(program.is_stale("a.lm"));
        assert_eq!(program.len(), 1);
        assert!(program.source_map().file_id("a.lm").is_some());
    }

    #[test]
    fn test_parse_failure_keeps_text_but_not_unit() {
        let mut program = Program::new();
        let errors = program.add_source("bad.lm", "class {").unwrap_err();
        assert!(errors.has_errors());
        assert!(program.get("bad.lm").is_none());
        assert!(program.source_map().file_id("bad.lm").is_some());
    }

    #[test]
    fn test_removal_drops_artifacts() {
        let mut program = Program::new();
        program.add_source("a.lm", "class A { }").unwrap();
        program.artifacts.record("a.lm", vec!["generated/A.record.g.lm".into()]);

        let diagnostics = program.apply_changes(ChangeSet::new().remove("a.lm"));
        assert!(diagnostics.is_empty());
        assert!(program.is_empty());
        assert!(program.artifacts().is_empty());
        assert!(!program.is_stale("a.lm"));
    }

    #[test]
    fn test_registry_json_round_trip() {
        let mut registry = ArtifactRegistry::new();
        registry.record("geo.lm", vec!["generated/Geo.Point.record.g.lm".into()]);
        let json = registry.to_json().unwrap();
        assert_eq!(ArtifactRegistry::from_json(&json).unwrap(), registry);
        assert_eq!(
            registry.source_of("generated/Geo.Point.record.g.lm"),
            Some("geo.lm")
        );
    }
}
