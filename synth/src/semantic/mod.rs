//! Symbol resolution service
//!
//! A read-only view of every type, field and method declared across the
//! working set of units. Partial declarations of one type merge into a single
//! `TypeInfo`. The table is built once per pass and shared between rayon
//! tasks, so everything in here is immutable after construction.

pub mod classify;
pub mod scope;
pub mod symbols;

use std::fmt;

/// Define a lightweight u32 identifier with arena-style helpers
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_raw(self) -> u32 {
                self.0
            }

            pub(crate) const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id_type!(
    /// Identity of a (possibly partial) type across all units
    TypeId
);

define_id_type!(
    /// Identity of a method or constructor
    MethodId
);

pub use classify::{classify, enumerable_element, ValueClass};
pub use scope::{BodyScope, Resolved};
pub use symbols::{
    DeclSite, FieldInfo, MethodInfo, MethodKind, ParamInfo, SymbolTable, TypeInfo,
};
