//! Implicit parameters
//!
//! Calls that leave `@implicit` parameters out get them filled from the
//! caller's scope by type. `@pass_through` methods forward whatever their
//! own calls need and their scope cannot provide as extra parameters.

pub mod candidates;
pub mod solver;

pub use candidates::{scope_candidates, Candidate, CandidateOrigin, CandidateSet, Hidden};
pub use solver::{resolve_implicits, Resolution, Slot};
