use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

const OFFICER_HEADING: &str = "役員の状況";
const FILER_NAME_MARKER: &str = "FilerNameInJapaneseDEI";
const REPRESENTATIVE_MARKER: &str = "TitleAndNameOfRepresentativeCoverPage";
/// Roster data rows carry at least this many cells; narrower rows are spacer
/// or merged layout rows.
const MIN_ROW_CELLS: usize = 5;

static POSITION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("役名|役職名").unwrap());
static NAME_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("氏名").unwrap());
static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The filer's registered name from the profile document, or empty when the
/// field is absent.
pub fn filer_name(profile: &Html) -> String {
    attr_field_text(profile, FILER_NAME_MARKER).unwrap_or_default()
}

/// Representative-officer fallback: one field holding "position name",
/// whitespace-separated. Tokens beyond the second join into the name.
pub fn representative_officer(profile: &Html) -> Option<(String, String)> {
    let text = attr_field_text(profile, REPRESENTATIVE_MARKER)?;
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        warn!(field = %text, "representative-officer field has too few tokens");
        return None;
    }
    Some((words[0].to_string(), words[1..].join(" ")))
}

/// Extract name → position pairs from every roster table under the
/// officer-status heading. Later rows overwrite earlier positions for the
/// same name.
pub fn officer_roster(executives_html: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(executives_html);
    let mut officers: Vec<(String, String)> = Vec::new();

    let headings = officer_headings(&doc);
    let Some(&heading) = headings.first() else {
        return officers;
    };
    if headings.len() > 1 {
        warn!(count = headings.len(), "multiple officer-status headings, using the first");
    }
    let Some(block) = heading.parent().and_then(ElementRef::wrap) else {
        return officers;
    };

    let table_selector = Selector::parse("table").expect("table selector");
    for table in block.select(&table_selector) {
        let rows = table_rows(table);
        let Some(columns) = resolve_columns(&rows) else {
            continue;
        };
        for (index, row) in rows.iter().enumerate() {
            if index == columns.header_row || element_children(row).count() < MIN_ROW_CELLS {
                continue;
            }
            let cells = data_cells(row);
            let position = cells.get(columns.position).map(cell_text).unwrap_or_default();
            let name = cells.get(columns.name).map(cell_text).unwrap_or_default();
            if name.is_empty() || position.is_empty() {
                if !name.is_empty() {
                    warn!(%name, "roster row has a name but no position, dropping");
                }
                continue;
            }
            upsert(&mut officers, name, position);
        }
    }
    officers
}

/// Level-3 headings first, then level-4, filtered to the officer-status
/// marker phrase.
fn officer_headings(doc: &Html) -> Vec<ElementRef<'_>> {
    let h3 = Selector::parse("h3").expect("h3 selector");
    let h4 = Selector::parse("h4").expect("h4 selector");
    doc.select(&h3)
        .chain(doc.select(&h4))
        .filter(|el| el.text().collect::<String>().contains(OFFICER_HEADING))
        .collect()
}

/// Resolved structural roles for one table: which column holds the position,
/// which holds the name, and which row declared them.
struct RosterColumns {
    position: usize,
    name: usize,
    header_row: usize,
}

/// Phase one of roster extraction. Marker indices accumulate across rows so
/// split header layouts still resolve; the row that completes both is the
/// header row and is excluded from data extraction. A table that never
/// resolves both is not a roster table.
fn resolve_columns(rows: &[ElementRef]) -> Option<RosterColumns> {
    let mut position = None;
    let mut name = None;
    for (row_index, row) in rows.iter().enumerate() {
        for (index, cell) in data_cells(row).iter().enumerate() {
            let text = cell_text(cell);
            if POSITION_HEADER_RE.is_match(&text) {
                position = Some(index);
            }
            if NAME_HEADER_RE.is_match(&text) {
                name = Some(index);
            }
        }
        if let (Some(position), Some(name)) = (position, name) {
            return Some(RosterColumns { position, name, header_row: row_index });
        }
    }
    None
}

fn table_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let tbody_tr = Selector::parse("tbody tr").expect("tbody tr selector");
    let rows: Vec<_> = table.select(&tbody_tr).collect();
    if !rows.is_empty() {
        return rows;
    }
    let tr = Selector::parse("tr").expect("tr selector");
    table.select(&tr).collect()
}

fn element_children<'a>(row: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children().filter_map(ElementRef::wrap)
}

fn data_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    element_children(row).filter(|el| el.value().name() == "td").collect()
}

fn cell_text(cell: &ElementRef) -> String {
    let text = cell.text().collect::<String>();
    SPACE_RUN_RE.replace_all(&text, " ").trim().to_string()
}

fn attr_field_text(doc: &Html, marker: &str) -> Option<String> {
    let selector =
        Selector::parse(&format!(r#"[name*="{marker}"]"#)).expect("attribute selector");
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn upsert(officers: &mut Vec<(String, String)>, name: String, position: String) {
    match officers.iter_mut().find(|(existing, _)| *existing == name) {
        Some((_, existing_position)) => *existing_position = position,
        None => officers.push((name, position)),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_table_resolved_and_extracted() {
        let html = r#"
        <div>
          <h4>５【役員の状況】</h4>
          <table><tbody>
            <tr><td>役職名</td><td>氏名</td><td>生年月日</td><td>略歴</td><td>任期</td><td>所有株式数</td></tr>
            <tr><td>取締役</td><td>田中花子</td><td>1960年</td><td>略歴</td><td>注3</td><td>100</td></tr>
            <tr><td>監査役</td><td>佐藤  次郎</td><td>1955年</td><td>略歴</td><td>注4</td><td>50</td></tr>
          </tbody></table>
        </div>"#;
        let officers = officer_roster(html);
        assert_eq!(officers.len(), 2);
        assert_eq!(officers[0], ("田中花子".to_string(), "取締役".to_string()));
        // Internal whitespace run collapsed to a single space
        assert_eq!(officers[1], ("佐藤 次郎".to_string(), "監査役".to_string()));
    }

    #[test]
    fn narrow_and_empty_rows_skipped() {
        let html = r#"
        <div>
          <h3>役員の状況</h3>
          <table><tbody>
            <tr><td>役名</td><td>氏名</td><td>a</td><td>b</td><td>c</td></tr>
            <tr><td colspan="5">計</td></tr>
            <tr><td>社外取締役</td><td></td><td>-</td><td>-</td><td>-</td></tr>
            <tr><td>取締役</td><td>田中花子</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>"#;
        let officers = officer_roster(html);
        assert_eq!(officers, vec![("田中花子".to_string(), "取締役".to_string())]);
    }

    #[test]
    fn header_markers_accumulate_across_rows() {
        let html = r#"
        <div>
          <h3>役員の状況</h3>
          <table><tbody>
            <tr><td>役職名</td><td>x</td><td>x</td><td>x</td><td>x</td></tr>
            <tr><td>x</td><td>氏名</td><td>x</td><td>x</td><td>x</td></tr>
            <tr><td>監査役</td><td>鈴木一朗</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>"#;
        let officers = officer_roster(html);
        // Only the completing row is dropped; the partial-marker row keeps
        // its data role
        assert!(officers.contains(&("鈴木一朗".to_string(), "監査役".to_string())));
        assert!(!officers.iter().any(|(name, _)| name == "氏名"));
    }

    #[test]
    fn duplicate_names_last_row_wins() {
        let html = r#"
        <div>
          <h3>役員の状況</h3>
          <table><tbody>
            <tr><td>役職名</td><td>氏名</td><td>a</td><td>b</td><td>c</td></tr>
            <tr><td>取締役</td><td>田中花子</td><td>-</td><td>-</td><td>-</td></tr>
            <tr><td>代表取締役</td><td>田中花子</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>"#;
        let officers = officer_roster(html);
        assert_eq!(officers, vec![("田中花子".to_string(), "代表取締役".to_string())]);
    }

    #[test]
    fn table_without_both_markers_is_not_a_roster() {
        let html = r#"
        <div>
          <h3>役員の状況</h3>
          <table><tbody>
            <tr><td>氏名</td><td>a</td><td>b</td><td>c</td><td>d</td></tr>
            <tr><td>田中花子</td><td>-</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>"#;
        assert!(officer_roster(html).is_empty());
    }

    #[test]
    fn no_heading_means_no_roster() {
        let html = "<div><h3>事業の状況</h3><table><tbody><tr><td>x</td></tr></tbody></table></div>";
        assert!(officer_roster(html).is_empty());
    }

    #[test]
    fn first_heading_wins_when_ambiguous() {
        let html = r#"
        <div>
          <h3>役員の状況</h3>
          <table><tbody>
            <tr><td>役職名</td><td>氏名</td><td>a</td><td>b</td><td>c</td></tr>
            <tr><td>取締役</td><td>田中花子</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>
        <div>
          <h4>役員の状況（続き）</h4>
          <table><tbody>
            <tr><td>役職名</td><td>氏名</td><td>a</td><td>b</td><td>c</td></tr>
            <tr><td>監査役</td><td>別人名前</td><td>-</td><td>-</td><td>-</td></tr>
          </tbody></table>
        </div>"#;
        let officers = officer_roster(html);
        assert_eq!(officers, vec![("田中花子".to_string(), "取締役".to_string())]);
    }

    #[test]
    fn representative_field_splits_position_and_name() {
        let profile = Html::parse_document(
            r#"<p><span name="jpcrp_cor:TitleAndNameOfRepresentativeCoverPage">代表取締役社長  山本一郎</span></p>"#,
        );
        assert_eq!(
            representative_officer(&profile),
            Some(("代表取締役社長".to_string(), "山本一郎".to_string()))
        );
    }

    #[test]
    fn representative_extra_tokens_join_into_name() {
        let profile = Html::parse_document(
            r#"<span name="TitleAndNameOfRepresentativeCoverPage">取締役社長 山田 太郎</span>"#,
        );
        assert_eq!(
            representative_officer(&profile),
            Some(("取締役社長".to_string(), "山田 太郎".to_string()))
        );
    }

    #[test]
    fn representative_single_token_is_malformed() {
        let profile = Html::parse_document(
            r#"<span name="TitleAndNameOfRepresentativeCoverPage">山本一郎</span>"#,
        );
        assert_eq!(representative_officer(&profile), None);
    }

    #[test]
    fn filer_name_defaults_to_empty() {
        let profile = Html::parse_document("<p>no marker here</p>");
        assert_eq!(filer_name(&profile), "");
    }
}
