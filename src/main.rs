mod fetch;
mod merge;
mod parser;
mod sources;
mod store;
mod wiki;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::parser::filter::TitleFilter;

#[derive(Parser)]
#[command(
    name = "meibo",
    about = "Harvest Japanese personal names from EDINET filings and Wikipedia dumps"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the EDINET Atom feed and write source manifests
    Sources {
        /// Collect filings updated on or after this date (YYYY-MM-DD)
        #[arg(short, long)]
        since: String,
        /// Directory for source_<page>.json manifests
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Fetch filing documents and append officer records to a CSV
    Extract {
        /// Directory holding source manifests
        #[arg(short, long)]
        sources_dir: PathBuf,
        /// Output CSV path (appended across runs)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Scan a Wikipedia dump (.bz2) for living-person titles
    Wiki {
        /// Dump path, e.g. jawiki-YYYYMMDD-pages-articles.xml.bz2
        #[arg(short, long)]
        input: PathBuf,
        /// Output name list, one name per line
        #[arg(short, long)]
        output: PathBuf,
        /// Drop titles without any kanji or hiragana
        #[arg(long)]
        only_kanji_hiragana: bool,
        /// Drop titles of two characters or fewer
        #[arg(long)]
        exclude_short_name: bool,
    },
    /// Merge the officer CSV and the wiki list into one unique name column
    Merge {
        /// Officer CSV produced by `extract`
        #[arg(long)]
        edinet: PathBuf,
        /// Name list produced by `wiki`
        #[arg(long)]
        wiki: PathBuf,
        /// Exclusion list, one name per line
        #[arg(short, long)]
        exclude: PathBuf,
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sources { since, output_dir } => {
            let since = NaiveDate::parse_from_str(&since, "%Y-%m-%d")
                .context("--since must be formatted YYYY-MM-DD")?
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time");
            sources::run(since, &output_dir).await
        }
        Commands::Extract { sources_dir, output } => {
            let counts = extract_filings(&sources_dir, &output).await?;
            counts.print();
            Ok(())
        }
        Commands::Wiki { input, output, only_kanji_hiragana, exclude_short_name } => {
            wiki::run(&input, &output, TitleFilter { only_kanji_hiragana, exclude_short_name })
        }
        Commands::Merge { edinet, wiki, exclude, output } => {
            merge::run(&edinet, &wiki, &exclude, &output)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ExtractCounts {
    filings: usize,
    records: usize,
    empty: usize,
}

impl ExtractCounts {
    fn print(&self) {
        println!(
            "Processed {} filings: {} officer records, {} filings yielded none.",
            self.filings, self.records, self.empty,
        );
    }
}

/// Per-manifest driver: fetch each filing's document pair sequentially with a
/// fixed delay, extract officers, append to the CSV, then retire the manifest
/// to done/. A filing that yields nothing is counted, never fatal.
async fn extract_filings(sources_dir: &Path, output: &Path) -> Result<ExtractCounts> {
    let mut counts = ExtractCounts { filings: 0, records: 0, empty: 0 };
    let manifests = store::manifest_paths(sources_dir)?;
    if manifests.is_empty() {
        println!(
            "No source manifests in {}. Run 'sources' first.",
            sources_dir.display()
        );
        return Ok(counts);
    }

    let done_dir = sources_dir.join("done");
    let client = reqwest::Client::new();

    for manifest in manifests {
        info!(manifest = %manifest.display(), "loading");
        let filing_sources = store::load_sources(&manifest)?;

        let pb = ProgressBar::new(filing_sources.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len}")
                .expect("progress template")
                .progress_chars("=> "),
        );

        let mut rows = Vec::new();
        for (source_id, source) in &filing_sources {
            info!(%source_id, title = %source.title, "processing");
            let executives = fetch::fetch_document(&client, &source.link_executives).await;
            let profile = fetch::fetch_document(&client, &source.link_profile).await;
            let records = parser::extract_officers(&profile, &executives);
            if records.is_empty() {
                warn!(title = %source.title, "no executive name found");
                counts.empty += 1;
            } else {
                rows.extend(records);
            }
            counts.filings += 1;
            pb.inc(1);
            tokio::time::sleep(fetch::REQUEST_DELAY).await;
        }
        pb.finish_and_clear();

        counts.records += rows.len();
        store::append_records(output, &rows)?;
        store::move_to_done(&manifest, &done_dir)?;
    }

    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
