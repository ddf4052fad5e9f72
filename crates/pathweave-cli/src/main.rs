//! Pathweave CLI
//!
//! Batch driver around the conversion pipeline: read already-fetched pathway
//! documents, convert each one, and hand the assembled graphs to a consumer
//! (here: a JSON dump per pathway, standing in for the statement exporter).
//!
//! Pathways convert independently, so the batch fans out across the rayon
//! pool with one document resident per worker.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use pathweave_graph::{
    convert_document, ConvertOptions, MapResolver, Namespace, NullResolver, PathwaySource,
    ResolvedId, Resolver,
};
use pathweave_ingest_biopax::BiopaxSource;
use pathweave_ingest_kgml::KgmlSource;
use pathweave_ingest_wprdf::WpRdfSource;

#[derive(Parser)]
#[command(name = "pathweave")]
#[command(author, version, about = "Convert pathway databases into one unified graph model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// KEGG pathway diagram XML (KGML).
    Kgml,
    /// BioPAX level 3 reaction-network RDF/XML.
    Biopax,
    /// WikiPathways diagram-annotation RDF (Turtle).
    Wprdf,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert pathway documents and report (or write) the resulting graphs.
    Convert {
        /// Source format of the input documents.
        #[arg(long, value_enum)]
        format: Format,

        /// Document files, or directories to scan for them.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Expand composite diagram nodes into their members (KGML only).
        #[arg(long)]
        flatten: bool,

        /// Directory to write one JSON graph per converted pathway.
        #[arg(long)]
        out: Option<PathBuf>,

        /// JSON file of canonical identifier mappings, for offline
        /// resolution instead of the null resolver.
        #[arg(long)]
        resolver_map: Option<PathBuf>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            format,
            paths,
            flatten,
            out,
            resolver_map,
        } => convert_batch(format, &paths, flatten, out.as_deref(), resolver_map.as_deref()),
    }
}

// ============================================================================
// Resolver loading
// ============================================================================

/// One line of the `--resolver-map` file.
#[derive(Debug, Deserialize)]
struct ResolverEntry {
    namespace: Namespace,
    raw_id: String,
    canonical: ResolvedId,
}

fn load_resolver(path: Option<&Path>) -> Result<Box<dyn Resolver>> {
    let Some(path) = path else {
        return Ok(Box::new(NullResolver));
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading resolver map {}", path.display()))?;
    let entries: Vec<ResolverEntry> =
        serde_json::from_str(&text).context("parsing resolver map")?;

    let mut resolver = MapResolver::new();
    for entry in entries {
        resolver.insert(entry.namespace, entry.raw_id, entry.canonical);
    }
    Ok(Box::new(resolver))
}

// ============================================================================
// Batch conversion
// ============================================================================

fn source_for(format: Format) -> Box<dyn PathwaySource + Send + Sync> {
    match format {
        Format::Kgml => Box::new(KgmlSource),
        Format::Biopax => Box::new(BiopaxSource),
        Format::Wprdf => Box::new(WpRdfSource),
    }
}

fn wanted_extension(format: Format, path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match format {
        Format::Kgml => matches!(ext.as_str(), "xml" | "kgml"),
        Format::Biopax => matches!(ext.as_str(), "owl" | "rdf" | "xml"),
        Format::Wprdf => matches!(ext.as_str(), "ttl" | "turtle"),
    }
}

fn collect_files(format: Format, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path) {
                let entry = entry?;
                if entry.file_type().is_file() && wanted_extension(format, entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(anyhow!("no input documents found"));
    }
    Ok(files)
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchTotals {
    converted: usize,
    failed: usize,
    entities: usize,
    relationships: usize,
}

fn convert_batch(
    format: Format,
    paths: &[PathBuf],
    flatten: bool,
    out: Option<&Path>,
    resolver_map: Option<&Path>,
) -> Result<()> {
    if let Some(out) = out {
        fs::create_dir_all(out)
            .with_context(|| format!("creating output directory {}", out.display()))?;
    }

    let files = collect_files(format, paths)?;
    let source = source_for(format);
    let resolver = load_resolver(resolver_map)?;
    let options = ConvertOptions { flatten };

    let totals: Vec<BatchTotals> = files
        .par_iter()
        .map(|file| convert_file(file, source.as_ref(), resolver.as_ref(), &options, out))
        .collect();

    let mut sum = BatchTotals::default();
    for t in &totals {
        sum.converted += t.converted;
        sum.failed += t.failed;
        sum.entities += t.entities;
        sum.relationships += t.relationships;
    }

    println!(
        "{} {} pathways ({} entities, {} relationships), {} failed",
        "done:".green().bold(),
        sum.converted,
        sum.entities,
        sum.relationships,
        sum.failed,
    );

    if sum.converted == 0 && sum.failed > 0 {
        return Err(anyhow!("every pathway in the batch failed to convert"));
    }
    Ok(())
}

fn convert_file(
    file: &Path,
    source: &(dyn PathwaySource + Send + Sync),
    resolver: &dyn Resolver,
    options: &ConvertOptions,
    out: Option<&Path>,
) -> BatchTotals {
    let mut totals = BatchTotals::default();

    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("{} {}: {err}", "failed".red(), file.display());
            totals.failed += 1;
            return totals;
        }
    };

    let outcomes = match convert_document(source, &text, resolver, options) {
        Ok(outcomes) => outcomes,
        Err(err) => {
            eprintln!("{} {}: {err}", "failed".red(), file.display());
            totals.failed += 1;
            return totals;
        }
    };

    for outcome in outcomes {
        match outcome {
            Ok(converted) => {
                let pathway = &converted.pathway;
                let report = &converted.report;
                totals.converted += 1;
                totals.entities += pathway.entities().len();
                totals.relationships += pathway.relationships().len();

                println!(
                    "{} {} ({}): {} entities, {} relationships, {} skipped, {} unresolved, {} merged",
                    "converted".green(),
                    pathway.metadata().id,
                    pathway.metadata().source,
                    pathway.entities().len(),
                    pathway.relationships().len(),
                    report.skipped_elements,
                    report.unresolved_entities,
                    report.merged_entities,
                );

                if let Some(out) = out {
                    if let Err(err) = write_pathway(out, &converted.pathway) {
                        eprintln!("{} {}: {err:#}", "failed".red(), pathway.metadata().id);
                        totals.failed += 1;
                    }
                }
            }
            Err(err) => {
                eprintln!("{} {}: {err}", "failed".red(), file.display());
                totals.failed += 1;
            }
        }
    }

    totals
}

fn write_pathway(out: &Path, pathway: &pathweave_graph::Pathway) -> Result<()> {
    let file_name = format!("{}.json", sanitize_file_stem(&pathway.metadata().id));
    let path = out.join(file_name);
    let json = serde_json::to_string_pretty(pathway)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn sanitize_file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
