//! Spacer Trace CLI Application
//!
//! This is the command-line interface for the Spacer trace decoder.
//! It uses the spacer-trace-decoder library and adds:
//! - Config file support (config.toml)
//! - Parallel decoding of several traces
//! - JSON output to a file, a directory or stdout
//! - Per-trace summaries

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use spacer_trace_decoder::{Decoder, DecoderConfig};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::AppConfig;
use report::TraceReport;

/// Spacer Trace Decoder - Rebuild proof-search trees from Spacer traces
#[derive(Parser, Debug)]
#[command(name = "spacer-trace-cli")]
#[command(about = "Reconstruct the proof-search tree of a Spacer trace as JSON", long_about = None)]
#[command(version)]
struct Args {
    /// Trace file(s) to decode (e.g. spacer.log)
    #[arg(value_name = "TRACE")]
    traces: Vec<PathBuf>,

    /// CHC input file the solver ran on (relation signatures for typing)
    #[arg(long, value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// File of declare-const statements (alternative to --input-file)
    #[arg(long, value_name = "FILE")]
    decls: Option<PathBuf>,

    /// Write the loaded declarations as declare-const statements
    #[arg(long, value_name = "FILE")]
    write_decls: Option<PathBuf>,

    /// Output file for the tree (single trace only, default: stdout)
    #[arg(short, long, value_name = "FILE", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write one <trace>.json per trace into this directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the expression annotation pass
    #[arg(long)]
    no_annotate: bool,

    /// Annotate expressions in parallel
    #[arg(long)]
    parallel: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Settings after merging the config file with the command line
#[derive(Debug)]
struct RunSettings {
    traces: Vec<PathBuf>,
    input_file: Option<PathBuf>,
    declarations: Option<PathBuf>,
    decoder: DecoderConfig,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    pretty: bool,
}

impl RunSettings {
    /// Command-line flags override the config file
    fn merge(args: Args, config: AppConfig) -> Self {
        let mut decoder = config.annotation;
        if args.no_annotate {
            decoder = decoder.with_annotation(false);
        }
        if args.parallel {
            decoder = decoder.with_parallel_annotation(true);
        }

        Self {
            traces: if args.traces.is_empty() {
                config.input.traces
            } else {
                args.traces
            },
            input_file: args.input_file.or(config.input.input_file),
            declarations: args.decls.or(config.input.declarations),
            decoder,
            output: args.output,
            output_dir: args.output_dir.or(config.output.output_dir),
            pretty: args.pretty || config.output.pretty,
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Spacer Trace CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", spacer_trace_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            let config = config::load_config(path)?;
            log::debug!("Configuration loaded successfully");
            config
        }
        None => AppConfig::default(),
    };
    let write_decls = args.write_decls.clone();
    let settings = RunSettings::merge(args, config);

    if settings.traces.is_empty() && write_decls.is_none() {
        println!("Spacer Trace Decoder - No input specified");
        println!("\nQuick Start:");
        println!("  spacer-trace-cli spacer.log --input-file input_file.smt2 -o tree.json");
        println!("  spacer-trace-cli run1/spacer.log run2/spacer.log --output-dir trees");
        println!("\nWith a config file:");
        println!("  spacer-trace-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let decoder = build_decoder(&settings)?;

    if let Some(path) = &write_decls {
        fs::write(path, decoder.declarations().to_declare_statements())
            .with_context(|| format!("Failed to write declarations: {:?}", path))?;
        log::info!("Wrote {} declarations to {:?}", decoder.declarations().len(), path);
    }

    run(&decoder, &settings)
}

/// Create the decoder and load whatever declarations were given
fn build_decoder(settings: &RunSettings) -> Result<Decoder> {
    let mut decoder = Decoder::with_config(settings.decoder.clone());

    if let Some(path) = &settings.input_file {
        decoder
            .add_input_file(path)
            .with_context(|| format!("Failed to load CHC input: {:?}", path))?;
    }
    if let Some(path) = &settings.declarations {
        decoder
            .add_declarations_file(path)
            .with_context(|| format!("Failed to load declarations: {:?}", path))?;
    }
    if decoder.declarations().is_empty() && settings.decoder.annotate_expressions {
        log::debug!("No declarations loaded, variables will be left unsorted");
    }

    Ok(decoder)
}

/// Decode every trace; traces are independent, so they run in parallel
fn run(decoder: &Decoder, settings: &RunSettings) -> Result<()> {
    if settings.output.is_some() && settings.traces.len() > 1 {
        bail!("--output takes a single trace; use --output-dir for {} traces", settings.traces.len());
    }
    if let Some(dir) = &settings.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    // Planned before decoding so no two traces can write the same file
    let outputs = output_paths(settings)?;

    let results: Vec<Result<(TraceReport, Option<String>)>> = settings
        .traces
        .par_iter()
        .zip(outputs.par_iter())
        .map(|(trace, output)| process_trace(decoder, settings, trace, output.as_deref()))
        .collect();

    // Stdout output keeps the order traces were given in
    for result in results {
        let (report, stdout) = result?;
        report.log();
        if let Some(json) = stdout {
            println!("{}", json);
        }
    }
    Ok(())
}

/// Decode one trace and write its tree
///
/// # Returns
/// * The trace summary, plus the JSON when it goes to stdout
fn process_trace(
    decoder: &Decoder,
    settings: &RunSettings,
    trace: &Path,
    output: Option<&Path>,
) -> Result<(TraceReport, Option<String>)> {
    let (tree, annotation) = decoder
        .process_file(trace)
        .with_context(|| format!("Failed to decode trace: {:?}", trace))?;
    let json = tree
        .to_json_string(settings.pretty)
        .with_context(|| format!("Failed to serialize tree of {:?}", trace))?;

    let report = TraceReport::new(trace.to_path_buf(), &tree, annotation);
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write output file: {:?}", path))?;
            Ok((report.with_output(path.to_path_buf()), None))
        }
        None => Ok((report, Some(json))),
    }
}

/// Where the tree of each trace goes, in trace order (None means stdout)
///
/// With an output directory each tree is named after its trace's file stem.
/// Stems shared by several traces are prefixed with the parent directory
/// name (`run1/spacer.log` -> `run1_spacer.json`); any name still shared
/// after that is an error.
fn output_paths(settings: &RunSettings) -> Result<Vec<Option<PathBuf>>> {
    if let Some(output) = &settings.output {
        return Ok(vec![Some(output.clone()); settings.traces.len()]);
    }
    let dir = match &settings.output_dir {
        Some(dir) => dir,
        None => return Ok(vec![None; settings.traces.len()]),
    };

    let stems: Vec<String> = settings.traces.iter().map(|t| file_stem(t)).collect();
    let mut stem_counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *stem_counts.entry(stem.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(stems.len());
    for (trace, stem) in settings.traces.iter().zip(&stems) {
        let name = match trace.parent().and_then(Path::file_name) {
            Some(parent) if stem_counts[stem.as_str()] > 1 => {
                format!("{}_{}.json", parent.to_string_lossy(), stem)
            }
            _ => format!("{}.json", stem),
        };
        if !seen.insert(name.clone()) {
            bail!("Traces would overwrite each other's output {:?} in {:?}", name, dir);
        }
        paths.push(Some(dir.join(name)));
    }
    Ok(paths)
}

fn file_stem(trace: &Path) -> String {
    trace
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
