use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use rss_builder::config::{Config, DEFAULT_CONFIG_PATH};
use rss_builder::publish;
use rss_builder::sources::Source;
use rss_builder::util::file_stem;

#[derive(Parser, Debug)]
#[command(
    name = "rss-builder",
    about = "Scrape sites without feeds and publish one RSS 2.0 file per site"
)]
struct Args {
    /// Config file (optional; defaults apply when it does not exist)
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the feed files, overriding `output_dir` from the config
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Only publish the named source (repeatable; matches name or file stem, case-insensitive)
    #[arg(long = "source", value_name = "NAME")]
    sources: Vec<String>,

    /// List the configured sources and exit
    #[arg(long)]
    list: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn source_matches(source: &dyn Source, name: &str) -> bool {
    source.name().eq_ignore_ascii_case(name) || file_stem(source.name()).eq_ignore_ascii_case(name)
}

/// One `--list` row: name, scraped URL and feed file, tab separated.
fn list_line(source: &dyn Source) -> String {
    format!(
        "{}\t{}\t{}.xml",
        source.name(),
        source.home_url(),
        file_stem(source.name())
    )
}

/// Keep only the sources named on the command line, in configured order.
fn select_sources(
    sources: Vec<Arc<dyn Source>>,
    wanted: &[String],
) -> Result<Vec<Arc<dyn Source>>> {
    if wanted.is_empty() {
        return Ok(sources);
    }

    if let Some(unknown) = wanted
        .iter()
        .find(|name| !sources.iter().any(|s| source_matches(s.as_ref(), name)))
    {
        let available: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        anyhow::bail!(
            "Unknown source {:?} (available: {})",
            unknown,
            available.join(", ")
        );
    }

    Ok(sources
        .into_iter()
        .filter(|s| wanted.iter().any(|name| source_matches(s.as_ref(), name)))
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let sources = config.all_sources().context("Failed to set up sources")?;
    let sources = select_sources(sources, &args.sources)?;

    if args.list {
        for source in &sources {
            println!("{}", list_line(source.as_ref()));
        }
        return Ok(());
    }

    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            output_dir.display()
        )
    })?;

    tracing::info!(
        sources = sources.len(),
        output_dir = %output_dir.display(),
        "Publishing feeds"
    );
    let summary = publish::run(sources, &output_dir).await;

    let failed = summary.failures().count();
    if failed > 0 {
        for report in summary.failures() {
            if let Err(e) = &report.outcome {
                eprintln!("Error: {}: {}", report.name, e);
            }
        }
        tracing::warn!(failed, total = summary.reports.len(), "Some feeds were not published");
        std::process::exit(1);
    }

    tracing::info!(total = summary.reports.len(), "All feeds published");
    Ok(())
}
