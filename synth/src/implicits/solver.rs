//! Implicit argument resolution
//!
//! Pass-through methods are resolved first, callees before callers, with an
//! explicit depth-first stack. A pass-through method gains one `@implicit`
//! parameter per type its calls need but its own scope cannot provide. Each
//! recorded call site is then resolved against the candidates of its body,
//! forwarded parameters included.

use super::candidates::{scope_candidates, Candidate, CandidateOrigin, CandidateSet, Hidden};
use crate::discovery::CallSite;
use crate::errors::ResolveError;
use crate::program::ProgramUnit;
use crate::rewrite::{MemberEdit, UnitEdits};
use crate::semantic::{DeclSite, MethodId, SymbolTable};
use diagnostics::{Diagnostics, SourceMap, SourceSpan};
use fxhash::{FxHashMap, FxHashSet};
use parser::build::{annotation, ident, named_arg, param};
use parser::TypeRef;

/// Implicit parameter a call still needs
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Default)]
pub struct Resolution {
    /// Edits per working-set unit index
    pub edits: FxHashMap<usize, UnitEdits>,
    /// Parameters added to each pass-through method
    pub forwarded: FxHashMap<MethodId, Vec<Slot>>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
enum PassState {
    InProgress,
    Done(Vec<Slot>),
    Failed,
}

struct Frame {
    method: MethodId,
    deps: Vec<MethodId>,
    next: usize,
}

/// Resolve every call site. `units` is the working set the sites and the
/// symbol table index into.
pub fn resolve_implicits(
    table: &SymbolTable,
    units: &[ProgramUnit],
    source_map: &SourceMap,
    sites: &[CallSite],
) -> Resolution {
    let mut by_method: FxHashMap<MethodId, Vec<&CallSite>> = FxHashMap::default();
    for site in sites {
        if let Some(method) = site.enclosing {
            by_method.entry(method).or_default().push(site);
        }
    }

    let mut solver = Solver {
        table,
        units,
        source_map,
        by_method,
        states: FxHashMap::default(),
        in_cycle: FxHashSet::default(),
        hidden_reported: FxHashSet::default(),
        resolution: Resolution::default(),
    };

    let pass_through: Vec<MethodId> = table
        .methods()
        .filter(|m| m.is_pass_through())
        .map(|m| m.id)
        .collect();
    for &method in &pass_through {
        solver.resolve_pass_through(method);
    }
    for &method in &pass_through {
        solver.forward_params(method);
    }
    for site in sites {
        solver.resolve_site(site);
    }

    log::debug!(
        "resolved {} call sites, {} pass-through methods, {} diagnostics",
        sites.len(),
        pass_through.len(),
        solver.resolution.diagnostics.len()
    );
    solver.resolution
}

struct Solver<'a> {
    table: &'a SymbolTable,
    units: &'a [ProgramUnit],
    source_map: &'a SourceMap,
    by_method: FxHashMap<MethodId, Vec<&'a CallSite>>,
    states: FxHashMap<MethodId, PassState>,
    in_cycle: FxHashSet<MethodId>,
    hidden_reported: FxHashSet<(Option<MethodId>, String)>,
    resolution: Resolution,
}

fn unique_name(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .unwrap_or_else(|| base.to_string())
}

impl<'a> Solver<'a> {
    fn decl_span(&self, site: DeclSite) -> SourceSpan {
        self.units
            .get(site.unit)
            .map(|unit| unit.source_span(self.source_map, site.span))
            .unwrap_or_else(SourceSpan::unknown)
    }

    fn sites_in(&self, method: MethodId) -> Vec<&'a CallSite> {
        self.by_method.get(&method).cloned().unwrap_or_default()
    }

    /// Pass-through callees of the calls inside `method`, first call first
    fn dependencies(&self, method: MethodId) -> Vec<MethodId> {
        let mut deps = Vec::new();
        for site in self.sites_in(method) {
            if self.table.method(site.callee).is_pass_through() && !deps.contains(&site.callee) {
                deps.push(site.callee);
            }
        }
        deps
    }

    fn is_failed(&self, method: MethodId) -> bool {
        matches!(self.states.get(&method), Some(PassState::Failed))
    }

    fn resolve_pass_through(&mut self, root: MethodId) {
        if self.states.contains_key(&root) {
            return;
        }
        self.states.insert(root, PassState::InProgress);
        let mut stack = vec![Frame {
            method: root,
            deps: self.dependencies(root),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.deps.len() {
                let dep = frame.deps[frame.next];
                frame.next += 1;
                match self.states.get(&dep) {
                    None => {
                        self.states.insert(dep, PassState::InProgress);
                        let deps = self.dependencies(dep);
                        stack.push(Frame {
                            method: dep,
                            deps,
                            next: 0,
                        });
                    }
                    Some(PassState::InProgress) => self.report_cycle(&stack, dep),
                    Some(PassState::Done(_)) | Some(PassState::Failed) => {}
                }
                continue;
            }

            let Some(frame) = stack.pop() else {
                break;
            };
            let failed = self.in_cycle.contains(&frame.method)
                || frame.deps.iter().any(|&dep| self.is_failed(dep));
            let state = if failed {
                PassState::Failed
            } else {
                PassState::Done(self.forwarded_slots(frame.method))
            };
            self.states.insert(frame.method, state);
        }
    }

    /// Report the cycle closed by a call from the top of `stack` into `back_to`
    fn report_cycle(&mut self, stack: &[Frame], back_to: MethodId) {
        let Some(start) = stack.iter().position(|f| f.method == back_to) else {
            return;
        };
        let members: Vec<MethodId> = stack[start..].iter().map(|f| f.method).collect();
        let reported = members.iter().any(|m| self.in_cycle.contains(m));
        self.in_cycle.extend(members.iter().copied());
        if reported {
            return;
        }

        let mut path: Vec<String> = members
            .iter()
            .map(|&m| self.table.method_display(m))
            .collect();
        path.push(self.table.method_display(back_to));

        let closing = members.last().copied().unwrap_or(back_to);
        let span = self
            .sites_in(closing)
            .into_iter()
            .find(|site| site.callee == back_to)
            .map(|site| site.span)
            .unwrap_or_else(|| self.decl_span(self.table.method(closing).site));
        log::debug!("pass-through cycle: {}", path.join(" -> "));
        self.resolution
            .diagnostics
            .push(ResolveError::Cyclic { path, span }.into());
    }

    /// Slots of `site`'s callee left for implicit resolution; `None` when the
    /// callee's own resolution failed
    fn required_slots(&self, site: &CallSite) -> Option<Vec<Slot>> {
        let callee = self.table.method(site.callee);
        let mut slots: Vec<Slot> = callee
            .implicit_params()
            .filter(|p| !site.supplies(&p.name))
            .map(|p| Slot {
                name: p.name.clone(),
                ty: p.ty.clone(),
            })
            .collect();
        if callee.is_pass_through() {
            match self.states.get(&site.callee) {
                Some(PassState::Done(forwarded)) => slots.extend(
                    forwarded
                        .iter()
                        .filter(|slot| !site.supplies(&slot.name))
                        .cloned(),
                ),
                Some(PassState::Failed) => return None,
                Some(PassState::InProgress) | None => {}
            }
        }
        Some(slots)
    }

    /// Types the calls inside `method` need and its own scope lacks,
    /// one parameter per type
    fn forwarded_slots(&self, method: MethodId) -> Vec<Slot> {
        let info = self.table.method(method);
        let shadowing: Vec<String> = info
            .params
            .iter()
            .filter(|p| !p.is_implicit)
            .map(|p| p.name.clone())
            .collect();
        let base = scope_candidates(
            self.table,
            Some(method),
            Some(info.owner),
            info.is_static,
            &shadowing,
        );

        let mut taken: Vec<String> = info.params.iter().map(|p| p.name.clone()).collect();
        let mut forwarded: Vec<Slot> = Vec::new();
        for site in self.sites_in(method) {
            let Some(slots) = self.required_slots(site) else {
                continue;
            };
            for slot in slots {
                if base.covers(&slot.ty) || forwarded.iter().any(|f| f.ty == slot.ty) {
                    continue;
                }
                let name = unique_name(&slot.name, &taken);
                taken.push(name.clone());
                forwarded.push(Slot { name, ty: slot.ty });
            }
        }
        forwarded
    }

    fn forward_params(&mut self, method: MethodId) {
        let Some(PassState::Done(forwarded)) = self.states.get(&method) else {
            return;
        };
        if forwarded.is_empty() {
            return;
        }
        let forwarded = forwarded.clone();
        let params = forwarded
            .iter()
            .map(|slot| param(vec![annotation("implicit")], slot.ty.clone(), slot.name.clone()))
            .collect();

        let site = self.table.method(method).site;
        let span = self.decl_span(site);
        self.resolution
            .edits
            .entry(site.unit)
            .or_default()
            .member(site.node, MemberEdit::AddParams(params), span);
        log::trace!(
            "{} forwards {} implicit parameters",
            self.table.method_display(method),
            forwarded.len()
        );
        self.resolution.forwarded.insert(method, forwarded);
    }

    fn candidates_at(&self, site: &CallSite) -> CandidateSet {
        let mut set = scope_candidates(
            self.table,
            site.enclosing,
            site.owner,
            site.is_static,
            &site.shadowing,
        );
        if let Some(method) = site.enclosing {
            if let Some(forwarded) = self.resolution.forwarded.get(&method) {
                set.visible.extend(forwarded.iter().map(|slot| Candidate {
                    name: slot.name.clone(),
                    ty: slot.ty.clone(),
                    origin: CandidateOrigin::Forwarded,
                    display: slot.name.clone(),
                }));
            }
        }
        set
    }

    fn resolve_site(&mut self, site: &CallSite) {
        if let Some(method) = site.enclosing {
            // the cycle or the failed callee has been reported already
            if self.is_failed(method) {
                return;
            }
        }
        let Some(slots) = self.required_slots(site) else {
            return;
        };
        if slots.is_empty() {
            return;
        }

        let candidates = self.candidates_at(site);
        let mut args = Vec::new();
        for slot in slots {
            // a shadowed candidate is an error even when another one matches
            let hidden: Vec<&Hidden> = candidates.hidden_matching(&slot.ty).collect();
            if !hidden.is_empty() {
                self.report_hidden(site, &hidden);
                continue;
            }

            let matches: Vec<&Candidate> = candidates.matching(&slot.ty).collect();
            match matches.as_slice() {
                [only] => args.push(named_arg(slot.name.clone(), ident(only.name.clone()))),
                [] => {
                    self.resolution.diagnostics.push(
                        ResolveError::Missing {
                            param: slot.name.clone(),
                            ty: slot.ty.to_string(),
                            callee: self.table.method_display(site.callee),
                            span: site.span,
                        }
                        .into(),
                    );
                }
                several => {
                    self.resolution.diagnostics.push(
                        ResolveError::Ambiguous {
                            param: slot.name.clone(),
                            ty: slot.ty.to_string(),
                            candidates: several.iter().map(|c| c.display.clone()).collect(),
                            span: site.span,
                        }
                        .into(),
                    );
                }
            }
        }

        if !args.is_empty() {
            self.resolution
                .edits
                .entry(site.unit)
                .or_default()
                .append_args(site.call, args, site.span);
        }
    }

    /// Report each shadowed candidate once per enclosing method and name
    fn report_hidden(&mut self, site: &CallSite, hidden: &[&Hidden]) {
        for hidden in hidden {
            let key = (site.enclosing, hidden.candidate.name.clone());
            if !self.hidden_reported.insert(key) {
                continue;
            }
            let method = match site.enclosing {
                Some(m) => self.table.method_display(m),
                None => site
                    .owner
                    .map(|o| self.table.type_info(o).name.clone())
                    .unwrap_or_default(),
            };
            self.resolution.diagnostics.push(
                ResolveError::Hidden {
                    name: hidden.candidate.display.clone(),
                    shadowed_by: hidden.shadowed_by.clone(),
                    method,
                    span: site.span,
                }
                .into(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_get_numeric_suffix() {
        let taken = vec!["logger".to_string(), "logger2".to_string()];
        assert_eq!(unique_name("clock", &taken), "clock");
        assert_eq!(unique_name("logger", &taken), "logger3");
    }
}
