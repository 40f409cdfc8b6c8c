//! nextplot CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use np_collect::{Catalog, NormalizationPolicy, Registry};
use np_hist::Histogram;

#[derive(Parser)]
#[command(name = "nextplot")]
#[command(about = "nextplot - combine and normalize per-sample histograms")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registry entries and sources defined by a catalog
    List {
        /// Catalog file (YAML or JSON)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Combine one object of one registry entry
    Combine {
        /// Catalog file (YAML or JSON)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Registry key of the collection or composite
        #[arg(short, long)]
        key: String,

        /// Object (histogram) name inside each source
        #[arg(long)]
        object: String,

        /// Scale each source by its cross-section
        #[arg(long)]
        by_xs: bool,

        /// Scale each source by its luminosity
        #[arg(long)]
        by_lumi: bool,

        /// Divide each source by its sum of weights
        #[arg(long)]
        by_sow: bool,

        /// Normalize the combined result to unit integral
        #[arg(long)]
        unit: bool,

        /// Skip sources whose container cannot be opened
        #[arg(long)]
        skip_bad: bool,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { catalog, output } => cmd_list(&catalog, output.as_ref()),
        Commands::Combine {
            catalog,
            key,
            object,
            by_xs,
            by_lumi,
            by_sow,
            unit,
            skip_bad,
            output,
        } => {
            let mut policy = NormalizationPolicy::none();
            if by_xs {
                policy = policy.with_cross_section();
            }
            if by_lumi {
                policy = policy.with_luminosity();
            }
            if by_sow {
                policy = policy.with_sum_of_weights();
            }
            if unit {
                policy = policy.with_unit_integral();
            }
            cmd_combine(&catalog, &key, &object, &policy, skip_bad, output.as_ref())
        }
    }
}

fn load_registry(path: &Path) -> Result<Registry> {
    let catalog = Catalog::load(path)
        .with_context(|| format!("failed to load catalog {}", path.display()))?;
    let registry = catalog.build(Arc::new(catalog.json_opener()))?;
    tracing::info!(entries = registry.len(), "registry ready");
    Ok(registry)
}

fn cmd_list(catalog: &Path, output: Option<&PathBuf>) -> Result<()> {
    let registry = load_registry(catalog)?;

    let entries: Vec<serde_json::Value> = registry
        .entries()
        .map(|(key, entry)| {
            serde_json::json!({
                "key": key,
                "kind": entry.kind(),
                "title": entry.title(),
                "size": entry.len(),
            })
        })
        .collect();
    let sources: Vec<serde_json::Value> = registry
        .sources()
        .map(|s| {
            serde_json::json!({
                "name": s.name(),
                "path": s.path(),
                "cross_section": s.cross_section(),
                "luminosity": s.luminosity(),
            })
        })
        .collect();

    write_json(output, serde_json::json!({ "entries": entries, "sources": sources }))
}

fn cmd_combine(
    catalog: &Path,
    key: &str,
    object: &str,
    policy: &NormalizationPolicy,
    skip_bad: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let registry = load_registry(catalog)?;
    let combined = registry
        .retrieve(key, object, policy, skip_bad)?
        .with_context(|| format!("no source of '{}' contributed object '{}'", key, object))?;

    write_json(output, combined_json(key, object, policy, &combined)?)
}

fn combined_json(
    key: &str,
    object: &str,
    policy: &NormalizationPolicy,
    histogram: &Histogram,
) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "key": key,
        "object": object,
        "policy": serde_json::to_value(policy)?,
        "integral": histogram.integral(),
        "histogram": serde_json::to_value(histogram)?,
    }))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
