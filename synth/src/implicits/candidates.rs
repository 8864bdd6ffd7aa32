//! Implicit candidates visible from a body
//!
//! A body sees its method's `@implicit` parameters, then the `@implicit`
//! fields and readable properties along its type's base chain. A field is
//! hidden when a nearer declaration with the same name would win a plain
//! name lookup at the call.

use crate::semantic::{FieldInfo, MethodId, SymbolTable, TypeId};
use fxhash::FxHashMap;
use parser::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOrigin {
    Param,
    Field { owner: TypeId, is_property: bool },
    /// Parameter a pass-through method gains
    Forwarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Name the argument refers to
    pub name: String,
    pub ty: TypeRef,
    pub origin: CandidateOrigin,
    /// Name used in messages
    pub display: String,
}

#[derive(Debug, Clone)]
pub struct Hidden {
    pub candidate: Candidate,
    pub shadowed_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub visible: Vec<Candidate>,
    pub hidden: Vec<Hidden>,
}

impl CandidateSet {
    pub fn matching<'s>(&'s self, ty: &'s TypeRef) -> impl Iterator<Item = &'s Candidate> {
        self.visible.iter().filter(move |c| &c.ty == ty)
    }

    pub fn hidden_matching<'s>(&'s self, ty: &'s TypeRef) -> impl Iterator<Item = &'s Hidden> {
        self.hidden.iter().filter(move |h| &h.candidate.ty == ty)
    }

    /// Some candidate, visible or hidden, has type `ty`
    pub fn covers(&self, ty: &TypeRef) -> bool {
        self.matching(ty).next().is_some() || self.hidden_matching(ty).next().is_some()
    }
}

fn field_candidate(table: &SymbolTable, field: &FieldInfo) -> Candidate {
    Candidate {
        name: field.name.clone(),
        ty: field.ty.clone(),
        origin: CandidateOrigin::Field {
            owner: field.owner,
            is_property: field.is_property,
        },
        display: format!("{}.{}", table.type_info(field.owner).name, field.name),
    }
}

/// Candidates seen from a body of `enclosing` in `owner`. `shadowing` holds
/// the non-implicit parameters and locals visible at the point of use.
pub fn scope_candidates(
    table: &SymbolTable,
    enclosing: Option<MethodId>,
    owner: Option<TypeId>,
    is_static: bool,
    shadowing: &[String],
) -> CandidateSet {
    let mut set = CandidateSet::default();

    let mut implicit_params: Vec<&str> = Vec::new();
    if let Some(method) = enclosing {
        for param in table.method(method).implicit_params() {
            implicit_params.push(&param.name);
            set.visible.push(Candidate {
                name: param.name.clone(),
                ty: param.ty.clone(),
                origin: CandidateOrigin::Param,
                display: param.name.clone(),
            });
        }
    }

    let Some(owner) = owner else {
        return set;
    };
    let eligible = |field: &FieldInfo| field.is_implicit && field.readable && (!is_static || field.is_static);

    // nearest declaration of each name along the chain
    let mut nearest: FxHashMap<&str, &FieldInfo> = FxHashMap::default();
    for ty in table.base_chain(owner) {
        for field in &table.type_info(ty).fields {
            if let Some(&nearer) = nearest.get(field.name.as_str()) {
                if eligible(field) && !nearer.is_implicit {
                    set.hidden.push(Hidden {
                        candidate: field_candidate(table, field),
                        shadowed_by: format!(
                            "field '{}.{}'",
                            table.type_info(nearer.owner).name,
                            nearer.name
                        ),
                    });
                }
                continue;
            }
            nearest.insert(&field.name, field);

            if !eligible(field) || implicit_params.contains(&field.name.as_str()) {
                continue;
            }
            if shadowing.iter().any(|s| s == &field.name) {
                set.hidden.push(Hidden {
                    candidate: field_candidate(table, field),
                    shadowed_by: format!("local or parameter '{}'", field.name),
                });
                continue;
            }
            set.visible.push(field_candidate(table, field));
        }
    }
    set
}
