//! Turning synthesized fragments into generated units
//!
//! Each (declaration, annotation) pair becomes one artifact: the fragment's
//! members inside a `partial` reopening of the target, wrapped in the same
//! namespace and enclosing types, with companions placed beside the target.

use super::context::SynthesizedFragment;
use crate::config::SessionConfig;
use crate::errors::SynthError;
use crate::program::{ProgramUnit, UnitOrigin};
use diagnostics::{Diagnostics, SourceMap, SourceSpan};
use fxhash::FxHashMap;
use parser::parse_unit_in;

/// Rendered text of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub source: String,
    pub path: String,
    pub text: String,
    pub span: SourceSpan,
}

/// Render every fragment, rejecting artifact paths claimed twice.
/// `claimed` maps artifact paths that settled sources already own to
/// their source.
pub fn render_fragments(
    fragments: &[SynthesizedFragment],
    config: &SessionConfig,
    mut claimed: FxHashMap<String, String>,
) -> (Vec<GeneratedText>, Diagnostics) {
    let mut rendered = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for fragment in fragments {
        let path = config.artifact_path(&fragment.qualified, fragment.annotation.name());
        if let Some(first_source) = claimed.get(&path) {
            diagnostics.push(
                SynthError::DuplicateArtifact {
                    path,
                    first_source: first_source.clone(),
                    span: fragment.span,
                }
                .into(),
            );
            continue;
        }
        claimed.insert(path.clone(), fragment.source.clone());
        rendered.push(GeneratedText {
            source: fragment.source.clone(),
            text: render_fragment(fragment),
            path,
            span: fragment.span,
        });
    }
    (rendered, diagnostics)
}

struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, text: &str) {
        for line in text.lines() {
            if !line.is_empty() {
                for _ in 0..self.depth {
                    self.out.push_str("    ");
                }
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{} {{", header));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }
}

pub fn render_fragment(fragment: &SynthesizedFragment) -> String {
    let mut writer = Writer {
        out: String::new(),
        depth: 0,
    };
    if !fragment.namespace.is_empty() {
        writer.open(&format!("namespace {}", fragment.namespace.join(".")));
    }
    for ancestor in &fragment.ancestry {
        writer.open(&ancestor.partial_header());
    }

    writer.open(&fragment.target.partial_header());
    for (i, member) in fragment.members.iter().enumerate() {
        if i > 0 {
            writer.line("");
        }
        writer.line(member);
    }
    writer.close();

    for companion in &fragment.companions {
        writer.line("");
        writer.line(companion);
    }

    for _ in &fragment.ancestry {
        writer.close();
    }
    if !fragment.namespace.is_empty() {
        writer.close();
    }
    writer.out
}

/// Register rendered artifacts in `source_map` and parse them
pub fn parse_generated(
    texts: Vec<GeneratedText>,
    source_map: &mut SourceMap,
) -> (Vec<ProgramUnit>, Diagnostics) {
    let mut units = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for generated in texts {
        let file_id = source_map.add_file(generated.path.clone(), generated.text.clone());
        match parse_unit_in(file_id, &generated.path, &generated.text) {
            Ok(unit) => {
                log::debug!("generated {} from {}", generated.path, generated.source);
                units.push(ProgramUnit {
                    path: generated.path,
                    file_id,
                    unit,
                    origin: UnitOrigin::Generated {
                        from: generated.source,
                    },
                });
            }
            Err(errors) => {
                let message = errors
                    .iter()
                    .next()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| "unknown syntax error".to_string());
                diagnostics.push(
                    SynthError::GeneratedParse {
                        path: generated.path,
                        message,
                        span: generated.span,
                    }
                    .into(),
                );
            }
        }
    }
    (units, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::context::DeclHeader;
    use crate::generator::registry::AnnotationKind;
    use parser::TypeKind;

    fn fragment(qualified: &str, source: &str) -> SynthesizedFragment {
        SynthesizedFragment {
            source: source.to_string(),
            annotation: AnnotationKind::Singleton,
            qualified: qualified.to_string(),
            namespace: vec!["App".to_string()],
            ancestry: vec![DeclHeader {
                kind: TypeKind::Class,
                name: "Outer".to_string(),
                type_params: Vec::new(),
            }],
            target: DeclHeader {
                kind: TypeKind::Class,
                name: "Config".to_string(),
                type_params: Vec::new(),
            },
            members: vec!["private Config() {\n}".to_string()],
            companions: Vec::new(),
            span: SourceSpan::unknown(),
        }
    }

    #[test]
    fn test_fragment_reopens_ancestry() {
        let text = render_fragment(&fragment("App.Outer.Config", "a.lm"));
        let unit = parser::parse_unit("g.lm", &text).expect("generated text should parse");
        let printed = parser::print_unit(&unit);
        assert!(printed.contains("namespace App {"));
        assert!(printed.contains("partial class Outer {"));
        assert!(printed.contains("private Config() {"));
    }

    #[test]
    fn test_duplicate_artifacts_are_rejected() {
        let config = SessionConfig::default();
        let fragments = vec![
            fragment("App.Outer.Config", "a.lm"),
            fragment("App.Outer.Config", "b.lm"),
        ];
        let (rendered, diagnostics) = render_fragments(&fragments, &config, FxHashMap::default());
        assert_eq!(rendered.len(), 1);
        assert_eq!(diagnostics.with_code("E6003").count(), 1);
    }

    #[test]
    fn test_paths_held_by_settled_sources_are_rejected() {
        let config = SessionConfig::default();
        let mut claimed = FxHashMap::default();
        claimed.insert(
            "generated/App.Outer.Config.singleton.g.lm".to_string(),
            "a.lm".to_string(),
        );
        let fragments = vec![fragment("App.Outer.Config", "b.lm")];
        let (rendered, diagnostics) = render_fragments(&fragments, &config, claimed);
        assert!(rendered.is_empty());
        let duplicate = diagnostics.with_code("E6003").next().unwrap();
        assert!(duplicate.help.iter().any(|h| h.contains("a.lm")));
    }
}
