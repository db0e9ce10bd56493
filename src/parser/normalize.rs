use std::sync::LazyLock;

use regex::Regex;

static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(（|\().*").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").unwrap());
static READING_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]").unwrap());
static TITLE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(".*(執行役員|CEO|ＣＥＯ|社長|責任者)").unwrap());

/// Full pipeline for officer names. Order matters: bracket extraction assumes
/// whitespace is already gone, and title stripping assumes brackets are gone.
pub fn normalize(raw: &str) -> String {
    let name = strip_parenthetical(raw);
    let name = strip_whitespace(&name);
    let name = reading_bracket(&name);
    strip_title_prefix(&name)
}

/// Lighter variant for encyclopedia titles: parenthetical annotation and
/// surrounding whitespace only. Titles carry no honorifics or reading
/// brackets.
pub fn normalize_title(raw: &str) -> String {
    strip_parenthetical(raw).trim().to_string()
}

/// Drops everything from the first open paren (full- or half-width) to the
/// end of the string, even past a matching close paren.
fn strip_parenthetical(name: &str) -> String {
    PARENTHETICAL_RE.replace(name, "").into_owned()
}

fn strip_whitespace(name: &str) -> String {
    WHITESPACE_RE.replace_all(name, "").into_owned()
}

/// `RomanName[ヨミガナ]` → `ヨミガナ`: a bracketed span after a romanized
/// name holds the native reading.
fn reading_bracket(name: &str) -> String {
    match READING_BRACKET_RE.captures(name) {
        Some(caps) => caps[1].to_string(),
        None => name.to_string(),
    }
}

/// `社長執行役員角一幸` → `角一幸`: the greedy prefix runs to the last
/// marker occurrence, keeping only the trailing remainder.
fn strip_title_prefix(name: &str) -> String {
    TITLE_PREFIX_RE.replace(name, "").into_owned()
}

// ── Tests ──
