//! Loom - annotation-driven code synthesis and macro expansion
//!
//! # Usage
//!
//! ```bash
//! # Expand every .lm unit under src/ into out/
//! loom expand src/
//!
//! # Run sequentially and show session statistics
//! loom expand --sequential --stats src/ extra/Model.lm
//!
//! # Syntax check only
//! loom check src/Main.lm
//!
//! # Debug the implicit solver only
//! loom --log-stage implicits expand src/
//!
//! # List the diagnostic codes
//! loom codes
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use diagnostics::{Diagnostics, ErrorFormatter, SourceMap};
use std::path::{Path, PathBuf};
use std::process;
use synth::{Program, Session, SessionConfig, SessionStats};
use walkdir::WalkDir;

const SOURCE_EXTENSION: &str = "lm";

#[derive(Parser)]
#[command(name = "loom")]
#[command(version = "0.1.0")]
#[command(about = "Loom - annotation-driven code synthesis and macro expansion", long_about = None)]
struct Cli {
    /// Log session stages (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug output for one engine stage, e.g. `implicits` or `macros`
    #[arg(long = "log-stage", value_name = "STAGE", global = true)]
    log_stages: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize artifacts, resolve implicits and expand macros
    Expand {
        /// Source files or directories containing .lm units
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory receiving the expanded units and artifacts.json
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// Directory holding loom.toml (defaults to the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run every stage on the calling thread
        #[arg(long)]
        sequential: bool,

        /// Size of a dedicated worker pool
        #[arg(long)]
        threads: Option<usize>,

        /// Show session statistics
        #[arg(long)]
        stats: bool,

        /// Render diagnostics with colors
        #[arg(long)]
        color: bool,
    },

    /// Parse units and report syntax errors without expanding
    Check {
        /// Source files or directories containing .lm units
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List diagnostic codes
    Codes {
        /// Show the description and help of a single code (e.g. E2003)
        code: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose || !cli.log_stages.is_empty() {
        let level = if cli.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        };
        synth::logging::init_stages(level, &cli.log_stages);
    } else {
        synth::logging::init_from_env();
    }

    let result = match cli.command {
        Commands::Expand {
            paths,
            out,
            config,
            sequential,
            threads,
            stats,
            color,
        } => expand(paths, out, config, sequential, threads, stats, color),
        Commands::Check { paths, format } => check(paths, format),
        Commands::Codes { code } => list_codes(code),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

// =============================================================================
// Source collection
// =============================================================================

/// A unit on disk and the path it is registered under
struct SourceFile {
    unit_path: String,
    text: String,
}

/// Collect `.lm` files from files and directories. Files inside a directory
/// are registered relative to it; a file argument by its file name.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>, String> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = Vec::new();
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| format!("Failed to walk {}: {}", path.display(), e))?;
                if entry.file_type().is_file() && has_source_extension(entry.path()) {
                    entries.push(entry.into_path());
                }
            }
            for file in entries {
                let relative = file.strip_prefix(path).unwrap_or(&file);
                sources.push(read_source(&file, unit_path(relative))?);
            }
        } else if path.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| format!("Not a file: {}", path.display()))?;
            sources.push(read_source(path, name)?);
        } else {
            return Err(format!("File not found: {}", path.display()));
        }
    }

    log::debug!("collected {} source units", sources.len());
    Ok(sources)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Unit paths always use forward slashes
fn unit_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_source(file: &Path, unit_path: String) -> Result<SourceFile, String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    Ok(SourceFile { unit_path, text })
}

// =============================================================================
// Commands
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn expand(
    paths: Vec<PathBuf>,
    out: PathBuf,
    config_dir: Option<PathBuf>,
    sequential: bool,
    threads: Option<usize>,
    stats: bool,
    color: bool,
) -> Result<(), String> {
    let config_dir = config_dir.unwrap_or_else(|| PathBuf::from("."));
    let mut config = SessionConfig::load_or_default(&config_dir).map_err(|e| e.to_string())?;
    if sequential {
        config.parallel = false;
    }
    if let Some(threads) = threads {
        if threads == 0 {
            return Err("--threads must be at least 1".to_string());
        }
        config.threads = Some(threads);
    }

    let formatter = if color {
        ErrorFormatter::with_colors()
    } else {
        ErrorFormatter::new()
    };

    let sources = collect_sources(&paths)?;
    let mut program = Program::new();
    let mut parse_errors = Diagnostics::new();
    for source in &sources {
        if let Err(errors) = program.add_source(&source.unit_path, &source.text) {
            parse_errors.extend(errors);
        }
    }
    if parse_errors.has_errors() {
        eprintln!("{}", formatter.format_diagnostics(&parse_errors, program.source_map()));
        return Err(format!(
            "{} unit(s) failed to parse",
            parse_errors.error_count()
        ));
    }

    let result = Session::new(config).run(&mut program);
    if !result.diagnostics.is_empty() {
        eprintln!(
            "{}",
            formatter.format_diagnostics(&result.diagnostics, program.source_map())
        );
    }
    if stats {
        print_stats(&result.stats);
    }
    if !result.committed {
        return Err(format!(
            "expansion failed with {} error(s)",
            result.stats.error_count
        ));
    }

    let output = program
        .expanded()
        .ok_or_else(|| "session committed without output".to_string())?;
    for unit in output.iter() {
        let target = out.join(&unit.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::write(&target, &unit.text)
            .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
    }

    let registry = program
        .artifacts()
        .to_json()
        .map_err(|e| format!("Failed to serialize artifact registry: {}", e))?;
    let registry_path = out.join("artifacts.json");
    std::fs::write(&registry_path, registry)
        .map_err(|e| format!("Failed to write {}: {}", registry_path.display(), e))?;

    println!(
        "✓ Expanded {} unit(s) ({} generated) into {}",
        output.len(),
        output.generated().count(),
        out.display()
    );
    Ok(())
}

fn print_stats(stats: &SessionStats) {
    println!("\nSession statistics:");
    println!("  Units:            {}", stats.units);
    println!("  Units scanned:    {}", stats.units_scanned);
    println!("  Generated units:  {}", stats.generated_units);
    println!("  Macro types:      {}", stats.macro_types);
    println!("  Macros:           {}", stats.macros);
    println!("  Call sites:       {}", stats.call_sites);
    println!("  Edits:            {}", stats.edits);
    println!("  Warnings:         {}", stats.warning_count);
    println!("  Errors:           {}", stats.error_count);
    println!("  Synthesis:        {}us", stats.synthesis_time_us);
    println!("  Discovery:        {}us", stats.discovery_time_us);
    println!("  Resolution:       {}us", stats.resolution_time_us);
    println!("  Rewrite:          {}us", stats.rewrite_time_us);
    println!("  Total:            {}us", stats.total_time_us);
}

fn check(paths: Vec<PathBuf>, format: OutputFormat) -> Result<(), String> {
    let sources = collect_sources(&paths)?;
    let mut source_map = SourceMap::new();
    let mut errors = Diagnostics::new();
    let mut declarations = 0;

    for source in &sources {
        let file_id = source_map.add_file(source.unit_path.clone(), source.text.clone());
        match parser::parse_unit_in(file_id, &source.unit_path, &source.text) {
            Ok(unit) => declarations += count_types(&unit.items),
            Err(diagnostics) => errors.extend(diagnostics),
        }
    }

    match format {
        OutputFormat::Text => {
            if errors.has_errors() {
                eprintln!("{}", ErrorFormatter::new().format_diagnostics(&errors, &source_map));
            } else {
                println!("✓ Syntax: OK");
                println!("  Units: {}", sources.len());
                println!("  Type declarations: {}", declarations);
            }
        }
        OutputFormat::Json => {
            println!("{{");
            println!(
                "  \"status\": \"{}\",",
                if errors.has_errors() { "error" } else { "ok" }
            );
            println!("  \"units\": {},", sources.len());
            println!("  \"declarations\": {},", declarations);
            println!("  \"errors\": {}", errors.error_count());
            println!("}}");
        }
    }

    if errors.has_errors() {
        return Err(format!("{} syntax error(s)", errors.error_count()));
    }
    Ok(())
}

fn count_types(items: &[parser::Item]) -> usize {
    items
        .iter()
        .map(|item| match item {
            parser::Item::Namespace(ns) => count_types(&ns.items),
            parser::Item::Type(_) => 1,
        })
        .sum()
}

fn list_codes(code: Option<String>) -> Result<(), String> {
    let registry = synth::error_codes::error_registry();

    if let Some(code) = code {
        let entry = registry
            .get_by_string(&code)
            .or_else(|| registry.get_by_slug(&code))
            .ok_or_else(|| format!("Unknown diagnostic code: {}", code))?;
        println!("{}", entry);
        if let Some(help) = entry.help {
            println!("  help: {}", help);
        }
        return Ok(());
    }

    for entry in registry.get_range(0, u16::MAX) {
        println!("{}", entry);
    }
    Ok(())
}
