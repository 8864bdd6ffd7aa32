//! Loom synthesis engine
//!
//! Reads annotated declarations, synthesizes members for `@record`,
//! `@matcher` and `@singleton` types, expands calls to macro methods and
//! fills in `@implicit` arguments. Everything runs inside a [`Session`] over
//! a [`Program`].

pub mod config;
pub mod discovery;
pub mod error_codes;
pub mod errors;
pub mod generator;
pub mod implicits;
pub mod logging;
pub mod macros;
pub mod pipeline;
pub mod program;
pub mod rewrite;
pub mod semantic;

pub use config::{ConfigError, OutputConfig, SessionConfig, CONFIG_FILE_NAME};
pub use errors::{MacroError, ResolveError, SynthError};
pub use pipeline::{PassResult, Session, SessionResult, SessionStats, UnitPass};
pub use program::{
    ArtifactRegistry, ChangeSet, ExpandedUnit, Output, Program, ProgramUnit, SourceText,
    UnitOrigin,
};
