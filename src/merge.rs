use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::parser::filter::{self, ExcludeList};
use crate::parser::normalize;
use crate::store::{self, ExecutiveRecord};

/// Merge the officer CSV and the archive name list into one unique name
/// column.
pub fn run(edinet_csv: &Path, wiki_list: &Path, exclude_path: &Path, output: &Path) -> Result<()> {
    let exclude = ExcludeList::load(exclude_path)?;
    let records = store::load_records(edinet_csv)?;
    let wiki_names = store::load_name_list(wiki_list)?;

    let merged = merge_names(&records, &wiki_names, &exclude);
    info!(
        officers = records.len(),
        wiki = wiki_names.len(),
        merged = merged.len(),
        "merged name lists"
    );
    store::save_merged(output, &merged)
}

/// Officer names are normalized here; archive names already went through
/// their own pipeline. Both pass the document validity filter, then dedup by
/// exact string equality, first occurrence wins.
fn merge_names(
    records: &[ExecutiveRecord],
    wiki_names: &[String],
    exclude: &ExcludeList,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    let mut keep = |name: String| {
        if filter::is_valid_name(&name, exclude) && !seen.contains(&name) {
            seen.insert(name.clone());
            merged.push(name);
        }
    };

    for record in records {
        if record.name.is_empty() || record.position.is_empty() {
            continue;
        }
        keep(normalize::normalize(&record.name));
    }
    for name in wiki_names {
        keep(name.clone());
    }
    merged
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ExecutiveRecord {
        ExecutiveRecord {
            company_name: "テスト株式会社".to_string(),
            name: name.to_string(),
            position: "取締役".to_string(),
        }
    }

    fn no_excludes() -> ExcludeList {
        ExcludeList::from_iter(std::iter::empty())
    }

    #[test]
    fn duplicates_collapse_to_one_member() {
        let records = vec![record("角一幸"), record("角一幸")];
        let wiki = vec!["山田太郎".to_string()];
        let merged = merge_names(&records, &wiki, &no_excludes());
        assert_eq!(merged, vec!["角一幸".to_string(), "山田太郎".to_string()]);
    }

    #[test]
    fn officer_names_normalized_before_merge() {
        let records = vec![record("社長執行役員角一幸")];
        let merged = merge_names(&records, &[], &no_excludes());
        assert_eq!(merged, vec!["角一幸".to_string()]);
    }

    #[test]
    fn rows_missing_name_or_position_dropped() {
        let mut missing_position = record("田中花子");
        missing_position.position = String::new();
        let merged = merge_names(&[missing_position], &[], &no_excludes());
        assert!(merged.is_empty());
    }

    #[test]
    fn exclusion_set_applies_to_both_pipelines() {
        let exclude = ExcludeList::from_iter(["山田太郎".to_string()]);
        let records = vec![record("山田太郎"), record("田中花子")];
        let wiki = vec!["山田太郎".to_string(), "鈴木一朗".to_string()];
        let merged = merge_names(&records, &wiki, &exclude);
        assert_eq!(merged, vec!["田中花子".to_string(), "鈴木一朗".to_string()]);
    }

    #[test]
    fn invalid_wiki_names_filtered_at_merge_time() {
        let wiki = vec!["やまだたろう".to_string(), "山".to_string(), "佐藤次郎".to_string()];
        let merged = merge_names(&[], &wiki, &no_excludes());
        assert_eq!(merged, vec!["佐藤次郎".to_string()]);
    }
}
