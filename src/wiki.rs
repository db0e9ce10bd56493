use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{ensure, Context, Result};
use bzip2::read::BzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::info;

use crate::parser::filter::{self, TitleFilter};
use crate::parser::normalize;
use crate::store;

static PAGE_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+<page>").unwrap());
static PAGE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+</page>").unwrap());
static LIVING_PERSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[Category:存命人物").unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("<title>(.+)</title>").unwrap());

/// Scan a compressed dump for living-person page titles and write the
/// deduplicated list, one name per line.
pub fn run(input: &Path, output: &Path, filter: TitleFilter) -> Result<()> {
    ensure!(
        input.extension().is_some_and(|ext| ext == "bz2"),
        "input must be a .bz2 archive: {}",
        input.display()
    );
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let reader = BufReader::with_capacity(256 * 1024, BzDecoder::new(file));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("spinner template"),
    );

    let mut names = Vec::new();
    let mut pages = 0u64;
    scan_pages(reader, |page| {
        pages += 1;
        if pages % 10_000 == 0 {
            spinner.set_message(format!("{} pages, {} names", pages, names.len()));
        }
        if let Some(name) = person_name(page, filter) {
            names.push(name);
        }
    })?;
    spinner.finish_and_clear();

    info!(pages, names = names.len(), "archive scan finished");
    store::save_name_list(output, &names)
}

/// Accumulate lines between the page markers and hand each complete page
/// record to the callback. One strictly forward pass: a page must be whole
/// before it can be evaluated.
fn scan_pages<R: BufRead>(reader: R, mut on_page: impl FnMut(&str)) -> Result<()> {
    let mut page_lines: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if PAGE_START_RE.is_match(&line) {
            page_lines.clear();
            continue;
        }
        let is_end = PAGE_END_RE.is_match(&line);
        page_lines.push(line);
        if is_end {
            let page = page_lines.join("\n");
            on_page(&page);
        }
    }
    Ok(())
}

/// A page contributes a name when it carries the living-person category
/// marker and its normalized title survives the archive filter.
fn person_name(page: &str, filter: TitleFilter) -> Option<String> {
    if !LIVING_PERSON_RE.is_match(page) {
        return None;
    }
    let title = TITLE_RE.captures(page)?.get(1)?.as_str();
    let name = normalize::normalize_title(title);
    filter::is_valid_title(&name, filter).then_some(name)
}

// ── Tests ──
