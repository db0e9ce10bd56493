use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static LATIN_DIGIT_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Za-z0-9。、,?？.*]").unwrap());
static KANA_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[ぁ-ゞー・〜]+$").unwrap());
static KANJI_OR_HIRAGANA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Han}|\p{Hiragana}").unwrap());
static IRRELEVANCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[:/;]").unwrap());

/// Externally curated names that are never valid people. Loaded once per run
/// and passed into the filter explicitly.
pub struct ExcludeList(HashSet<String>);

impl ExcludeList {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening exclude list {}", path.display()))?;
        let mut names = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let name = line.trim();
            if !name.is_empty() {
                names.insert(name.to_string());
            }
        }
        Ok(Self(names))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl FromIterator<String> for ExcludeList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Document-pipeline validity: a conjunction of independent predicates, any
/// failure rejects.
pub fn is_valid_name(name: &str, exclude: &ExcludeList) -> bool {
    name.chars().count() > 2
        && !contains_latin_digit_or_punct(name)
        && !is_kana_only(name)
        && !exclude.contains(name)
}

/// Strictness knobs for encyclopedia titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleFilter {
    pub only_kanji_hiragana: bool,
    pub exclude_short_name: bool,
}

/// Archive-pipeline validity. Irrelevance markers show up in
/// disambiguation-style titles, never in person names.
pub fn is_valid_title(name: &str, filter: TitleFilter) -> bool {
    if filter.exclude_short_name && name.chars().count() <= 2 {
        return false;
    }
    if filter.only_kanji_hiragana && !contains_kanji_or_hiragana(name) {
        return false;
    }
    !has_irrelevance_marker(name)
}

fn contains_latin_digit_or_punct(name: &str) -> bool {
    LATIN_DIGIT_PUNCT_RE.is_match(name)
}

fn is_kana_only(name: &str) -> bool {
    KANA_ONLY_RE.is_match(name)
}

fn contains_kanji_or_hiragana(name: &str) -> bool {
    KANJI_OR_HIRAGANA_RE.is_match(name)
}

fn has_irrelevance_marker(name: &str) -> bool {
    IRRELEVANCE_RE.is_match(name)
}

// ── Tests ──
