use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One officer row as written to the extract CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveRecord {
    pub company_name: String,
    pub name: String,
    pub position: String,
}

/// One filing discovered on the feed: title plus the two document links the
/// extractor needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingSource {
    pub title: String,
    pub link_profile: String,
    pub link_executives: String,
    pub updated_at: String,
}

/// Manifest contents: source id → filing.
pub type SourceMap = BTreeMap<String, FilingSource>;

pub fn manifest_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading sources dir {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn load_sources(path: &Path) -> Result<SourceMap> {
    let file =
        File::open(path).with_context(|| format!("opening manifest {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing manifest {}", path.display()))
}

pub fn save_sources(path: &Path, sources: &SourceMap) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("writing manifest {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, sources)?;
    writer.flush()?;
    Ok(())
}

/// Retire a processed manifest into the done directory.
pub fn move_to_done(path: &Path, done_dir: &Path) -> Result<()> {
    fs::create_dir_all(done_dir)?;
    let file_name = path.file_name().context("manifest path has no file name")?;
    fs::rename(path, done_dir.join(file_name))
        .with_context(|| format!("moving {} to done", path.display()))?;
    Ok(())
}

/// Append records to the extract CSV. The header row is written exactly once,
/// when the file is created; reruns append below it.
pub fn append_records(path: &Path, records: &[ExecutiveRecord]) -> Result<()> {
    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if write_header {
        writer.write_record(["company_name", "name", "position"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_records(path: &Path) -> Result<Vec<ExecutiveRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("reading {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

pub fn load_name_list(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("opening name list {}", path.display()))?;
    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// One name per line, deduplicated at write time; first occurrence wins.
pub fn save_name_list(path: &Path, names: &[String]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("writing name list {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut seen = HashSet::new();
    for name in names {
        if seen.insert(name.as_str()) {
            writeln!(writer, "{name}")?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Single unnamed column, no header.
pub fn save_merged(path: &Path, names: &[String]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("writing {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    for name in names {
        writer.write_record([name.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

// ── Tests ──
