//! Annotation-driven declaration synthesis
//!
//! The scanner pairs declarations with registered annotations and hands
//! synthesis kinds to the template handlers (`record`, `matcher`,
//! `singleton`). Handlers push text fragments into a per-unit
//! `GeneratorContext`; `emit` turns the merged fragments into generated units.

pub mod context;
pub mod emit;
pub mod matcher;
pub mod options;
pub mod record;
pub mod registry;
pub mod scanner;
pub mod singleton;

pub use context::{DeclHeader, GeneratorContext, SynthesizedFragment};
pub use emit::{parse_generated, render_fragment, render_fragments, GeneratedText};
pub use options::{ConstructorMode, RecordOptions};
pub use registry::{AnnotationKind, AnnotationRole, SynthesisHandler, SynthesisRegistry};
pub use scanner::{scan_unit, Declaration};
