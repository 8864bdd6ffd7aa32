//! Synthesis session
//!
//! A `Session` runs one build over a `Program`:
//!
//! 1. scan stale source units and synthesize fragments (parallel per unit),
//!    render and parse the generated units;
//! 2. collect macro definitions, then discover macro invocations and calls
//!    needing implicit arguments (parallel per unit);
//! 3. resolve implicits and pass-through forwarding (serial);
//! 4. rewrite every unit and run the registered `UnitPass`es (parallel per
//!    unit, passes serial);
//! 5. commit into the program, only when no error was reported.
//!
//! Per-unit results are merged in unit order, so output and diagnostics do
//! not depend on scheduling.

use crate::config::SessionConfig;
use crate::discovery::{discover_unit, CallSite, UnitDiscovery};
use crate::errors::SynthError;
use crate::generator::{parse_generated, render_fragments, scan_unit, GeneratorContext, SynthesisRegistry};
use crate::implicits::resolve_implicits;
use crate::macros::{collect_definitions, MacroTable};
use crate::program::{Commit, ExpandedUnit, Output, Program, ProgramUnit, UnitOrigin};
use crate::rewrite::{rewrite_unit, UnitEdits};
use crate::semantic::SymbolTable;
use diagnostics::Diagnostics;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::{debug, info, warn};
use parser::{number_nodes, print_unit, Unit};
use rayon::prelude::*;
use std::time::Instant;

// =============================================================================
// Unit passes
// =============================================================================

/// Hook run on every rewritten unit before commit
pub trait UnitPass: Send {
    /// Get the name of this pass
    fn name(&self) -> &'static str;

    /// Run the pass on one rewritten unit
    fn run_on_unit(&mut self, unit: &mut Unit) -> PassResult;
}

/// Result of a unit pass
#[derive(Debug, Default)]
pub struct PassResult {
    /// Whether the unit was modified
    pub modified: bool,
    pub diagnostics: Diagnostics,
}

impl PassResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self {
            modified: true,
            diagnostics: Diagnostics::new(),
        }
    }
}

// =============================================================================
// Session results
// =============================================================================

/// Counts and timings of one session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Units in the working set (program units plus fresh artifacts)
    pub units: usize,

    /// Stale source units scanned for annotations
    pub units_scanned: usize,

    /// Fragments synthesized
    pub fragments: usize,

    /// Units generated from the fragments
    pub generated_units: usize,

    /// Types declaring macro methods among the scanned units
    pub macro_types: usize,

    /// Macro definitions in the macro table
    pub macros: usize,

    /// Calls inspected by the implicit solver
    pub call_sites: usize,

    /// Edits scheduled across all units
    pub edits: usize,

    /// Scan and synthesis time in microseconds
    pub synthesis_time_us: u64,

    /// Macro table and call discovery time in microseconds
    pub discovery_time_us: u64,

    /// Implicit resolution time in microseconds
    pub resolution_time_us: u64,

    /// Rewrite and unit pass time in microseconds
    pub rewrite_time_us: u64,

    /// Total session time in microseconds
    pub total_time_us: u64,

    pub warning_count: usize,

    pub error_count: usize,
}

/// Outcome of [`Session::run`]
#[derive(Debug)]
pub struct SessionResult {
    /// Every diagnostic of the session, in stage then unit order
    pub diagnostics: Diagnostics,
    pub stats: SessionStats,
    /// The program was updated; the expanded output is in
    /// [`Program::expanded`]
    pub committed: bool,
}

impl SessionResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Owns everything one build needs besides the program itself
pub struct Session {
    config: SessionConfig,
    registry: SynthesisRegistry,
    passes: Vec<Box<dyn UnitPass>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: SynthesisRegistry::new(),
            passes: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a pass to run on every rewritten unit
    pub fn add_pass<P: UnitPass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    /// Run one build over `program`, committing the result when it is
    /// free of errors
    pub fn run(&mut self, program: &mut Program) -> SessionResult {
        let start = Instant::now();

        let pool = match (self.config.parallel, self.config.threads) {
            (true, Some(threads)) => {
                match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        let mut diagnostics = Diagnostics::new();
                        diagnostics.push(
                            SynthError::ThreadPool {
                                message: e.to_string(),
                            }
                            .into(),
                        );
                        return SessionResult {
                            stats: SessionStats {
                                error_count: 1,
                                ..SessionStats::default()
                            },
                            diagnostics,
                            committed: false,
                        };
                    }
                }
            }
            _ => None,
        };

        let mut result = match pool {
            Some(pool) => {
                debug!("running session on a dedicated pool of {} threads", pool.current_num_threads());
                pool.install(|| self.run_stages(program))
            }
            None => self.run_stages(program),
        };

        result.stats.total_time_us = start.elapsed().as_micros() as u64;
        result.stats.error_count = result.diagnostics.error_count();
        result.stats.warning_count = result.diagnostics.warnings().count();
        info!(
            "session finished in {}us: {} units, {} generated, {} errors, {} warnings",
            result.stats.total_time_us,
            result.stats.units,
            result.stats.generated_units,
            result.stats.error_count,
            result.stats.warning_count
        );
        result
    }

    fn run_stages(&mut self, program: &mut Program) -> SessionResult {
        let parallel = self.config.parallel;
        let mut stats = SessionStats::default();
        let mut diagnostics = Diagnostics::new();

        // ---------------------------------------------------------------
        // Pass 1: scan and synthesize
        // ---------------------------------------------------------------
        let synthesis_start = Instant::now();
        let program_units: Vec<&ProgramUnit> = program.units().collect();
        let table = SymbolTable::build(program_units.iter().map(|u| &u.unit));

        let stale: Vec<(usize, &ProgramUnit)> = program_units
            .iter()
            .enumerate()
            .filter(|(_, u)| !u.is_generated() && program.is_stale(&u.path))
            .map(|(i, u)| (i, *u))
            .collect();
        stats.units_scanned = stale.len();
        info!("pass 1: scanning {} stale units", stale.len());

        let registry = &self.registry;
        let source_map = program.source_map();
        let contexts = map_units(parallel, &stale, |_, (index, unit)| {
            scan_unit(*index, unit, &table, registry, source_map)
        });
        let mut merged = GeneratorContext::new("");
        for context in contexts {
            merged.merge(context);
        }
        let (fragments, macro_types, scan_diagnostics) = merged.into_parts();
        diagnostics.extend(scan_diagnostics);
        stats.fragments = fragments.len();
        stats.macro_types = macro_types.len();
        if !macro_types.is_empty() {
            debug!("types declaring macros: {}", macro_types.join(", "));
        }

        let settled: FxHashMap<String, String> = program
            .artifacts()
            .iter()
            .filter(|(source, _)| !program.is_stale(source))
            .flat_map(|(source, paths)| {
                paths
                    .iter()
                    .map(move |path| (path.clone(), source.to_string()))
            })
            .collect();
        let (texts, render_diagnostics) = render_fragments(&fragments, &self.config, settled);
        diagnostics.extend(render_diagnostics);
        let mut session_map = program.source_map().clone();
        let (generated, parse_diagnostics) = parse_generated(texts, &mut session_map);
        diagnostics.extend(parse_diagnostics);
        stats.generated_units = generated.len();

        let mut working: Vec<ProgramUnit> = program_units.iter().map(|u| (*u).clone()).collect();
        working.extend(generated.iter().cloned());
        stats.units = working.len();
        stats.synthesis_time_us = synthesis_start.elapsed().as_micros() as u64;

        // ---------------------------------------------------------------
        // Pass 2: macro table and call discovery
        // ---------------------------------------------------------------
        let discovery_start = Instant::now();
        let table = SymbolTable::build(working.iter().map(|u| &u.unit));
        let source_map = &session_map;

        let collected = map_units(parallel, &working, |index, unit| {
            collect_definitions(index, unit, &table, source_map)
        });
        let mut macros = MacroTable::new();
        for (definitions, errors) in collected {
            for definition in definitions {
                macros.insert(definition);
            }
            diagnostics.extend(errors);
        }
        stats.macros = macros.len();
        info!("pass 2: {} macro definitions across {} units", macros.len(), working.len());

        let discovered = map_units(parallel, &working, |index, unit| {
            discover_unit(index, unit, &table, &macros, source_map)
        });
        let mut unit_edits: Vec<UnitEdits> = Vec::with_capacity(working.len());
        let mut call_sites: Vec<CallSite> = Vec::new();
        for UnitDiscovery {
            edits,
            call_sites: sites,
            diagnostics: errors,
        } in discovered
        {
            unit_edits.push(edits);
            call_sites.extend(sites);
            diagnostics.extend(errors);
        }
        stats.call_sites = call_sites.len();
        stats.discovery_time_us = discovery_start.elapsed().as_micros() as u64;

        // ---------------------------------------------------------------
        // Serial: implicit resolution
        // ---------------------------------------------------------------
        let resolution_start = Instant::now();
        let resolution = resolve_implicits(&table, &working, source_map, &call_sites);
        for (index, edits) in resolution.edits {
            match unit_edits.get_mut(index) {
                Some(target) => target.merge(edits),
                None => warn!("implicit edits for unknown unit index {}", index),
            }
        }
        diagnostics.extend(resolution.diagnostics);
        if !resolution.forwarded.is_empty() {
            debug!("{} pass-through methods gained parameters", resolution.forwarded.len());
        }
        stats.edits = unit_edits.iter().map(UnitEdits::len).sum();
        stats.resolution_time_us = resolution_start.elapsed().as_micros() as u64;

        // ---------------------------------------------------------------
        // Pass 3: rewrite
        // ---------------------------------------------------------------
        let rewrite_start = Instant::now();
        info!("pass 3: applying {} edits", stats.edits);
        let jobs: Vec<(ProgramUnit, UnitEdits)> = working.into_iter().zip(unit_edits).collect();
        let macros = &macros;
        let rewrite = |(mut unit, edits): (ProgramUnit, UnitEdits)| {
            let errors = rewrite_unit(&mut unit.unit, edits, macros);
            (unit, errors)
        };
        let rewritten: Vec<(ProgramUnit, Diagnostics)> = if parallel {
            jobs.into_par_iter().map(rewrite).collect()
        } else {
            jobs.into_iter().map(rewrite).collect()
        };

        let mut expanded: Vec<ProgramUnit> = Vec::with_capacity(rewritten.len());
        for (unit, errors) in rewritten {
            diagnostics.extend(errors);
            expanded.push(unit);
        }

        for pass in &mut self.passes {
            for unit in &mut expanded {
                let result = pass.run_on_unit(&mut unit.unit);
                if result.modified {
                    debug!("{} modified {}", pass.name(), unit.path);
                    number_nodes(&mut unit.unit);
                }
                diagnostics.extend(result.diagnostics);
            }
        }
        stats.rewrite_time_us = rewrite_start.elapsed().as_micros() as u64;

        // ---------------------------------------------------------------
        // Serial commit
        // ---------------------------------------------------------------
        if diagnostics.has_errors() {
            info!(
                "not committing: {} errors reported",
                diagnostics.error_count()
            );
            return SessionResult {
                diagnostics,
                stats,
                committed: false,
            };
        }

        let mut by_source: IndexMap<String, Vec<ProgramUnit>> = stale
            .iter()
            .map(|(_, unit)| (unit.path.clone(), Vec::new()))
            .collect();
        for unit in generated {
            if let UnitOrigin::Generated { from } = &unit.origin {
                by_source.entry(from.clone()).or_default().push(unit);
            }
        }

        let output = Output {
            units: expanded
                .into_iter()
                .map(|unit| {
                    let text = print_unit(&unit.unit);
                    (
                        unit.path.clone(),
                        ExpandedUnit {
                            path: unit.path,
                            origin: unit.origin,
                            unit: unit.unit,
                            text,
                        },
                    )
                })
                .collect(),
        };

        program.commit(Commit {
            source_map: session_map,
            generated: by_source,
            output,
        });
        info!("committed {} units", program.len());

        SessionResult {
            diagnostics,
            stats,
            committed: true,
        }
    }
}

/// Map `f` over `items` with their index, on the current rayon pool when
/// `parallel`. Results keep the order of `items`.
fn map_units<T, R, F>(parallel: bool, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().enumerate().map(|(i, item)| f(i, item)).collect()
    } else {
        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn program(sources: &[(&str, &str)]) -> Program {
        let mut program = Program::new();
        for (path, text) in sources {
            program.add_source(path, text).expect("source should parse");
        }
        program
    }

    struct CountingPass {
        seen: Arc<AtomicUsize>,
    }

    impl UnitPass for CountingPass {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn run_on_unit(&mut self, _unit: &mut Unit) -> PassResult {
            self.seen.fetch_add(1, Ordering::SeqCst);
            PassResult::unchanged()
        }
    }

    #[test]
    fn test_empty_program_commits() {
        let mut program = Program::new();
        let result = Session::new(SessionConfig::default()).run(&mut program);
        assert!(result.committed);
        assert!(result.diagnostics.is_empty());
        assert_eq!(program.expanded().map(Output::len), Some(0));
    }

    #[test]
    fn test_singleton_generates_artifact() {
        let mut program = program(&[(
            "app.lm",
            "namespace App { @singleton partial class Registry { } }",
        )]);
        let result = Session::new(SessionConfig::default()).run(&mut program);
        assert!(result.committed, "{:?}", result.diagnostics);
        assert_eq!(result.stats.generated_units, 1);
        assert_eq!(program.artifacts().artifacts_of("app.lm").len(), 1);
        assert!(!program.is_stale("app.lm"));
    }

    #[test]
    fn test_errors_block_commit() {
        let mut program = program(&[("app.lm", "@singleton partial interface Shape { }")]);
        let result = Session::new(SessionConfig::default()).run(&mut program);
        assert!(!result.committed);
        assert!(result.diagnostics.with_code("E6002").next().is_some());
        assert!(program.expanded().is_none());
        assert!(program.is_stale("app.lm"));
    }

    #[test]
    fn test_passes_see_every_unit() {
        let mut program = program(&[("a.lm", "class A { }"), ("b.lm", "class B { }")]);
        let mut session = Session::new(SessionConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        session.add_pass(CountingPass { seen: seen.clone() });
        let result = session.run(&mut program);
        assert!(result.committed);
        assert_eq!(result.stats.units, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
