use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::fetch::REQUEST_DELAY;
use crate::store::{self, FilingSource, SourceMap};

const FEED_BASE_URL: &str = "http://resource.ufocatch.com/atom/edinetx";
const REPORT_TITLE_MARKER: &str = "有価証券報告書";
/// Link-path fragments that mark the cover/profile document and the
/// executive-roster document of a filing.
const PROFILE_LINK_MARKER: &str = "0000000_header";
const EXECUTIVES_LINK_MARKER: &str = "0104010";
const UPDATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+09:00";

#[derive(Debug, Default)]
struct FeedEntry {
    id: String,
    title: String,
    updated: String,
    html_links: Vec<String>,
}

/// Walk the feed page by page, newest first, until an entry older than
/// `since` appears. Each page that yielded filings becomes one manifest.
pub async fn run(since: NaiveDateTime, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let client = reqwest::Client::new();
    let mut page = 1u32;
    let mut total = 0usize;

    loop {
        let url = format!("{FEED_BASE_URL}/{page}");
        let xml = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetching feed page {page}"))?
            .text()
            .await?;
        let entries = parse_feed(&xml)?;
        let (sources, done) = collect_sources(&entries, since);
        total += sources.len();
        if !sources.is_empty() {
            store::save_sources(&output_dir.join(format!("source_{page}.json")), &sources)?;
        }
        if done {
            info!(total, "reached the since cutoff");
            break;
        }
        info!(page, total, "processed feed page");
        page += 1;
        sleep(REQUEST_DELAY).await;
    }
    Ok(())
}

/// Filter feed entries down to securities reports carrying at least one
/// person-related link. The second return value is true once the `since`
/// cutoff was reached.
fn collect_sources(entries: &[FeedEntry], since: NaiveDateTime) -> (SourceMap, bool) {
    let mut sources = SourceMap::new();
    for entry in entries {
        match NaiveDateTime::parse_from_str(&entry.updated, UPDATED_FORMAT) {
            Ok(updated) if updated >= since => {}
            Ok(_) => return (sources, true),
            Err(err) => {
                warn!(updated = %entry.updated, %err, "unparsable entry timestamp, skipping");
                continue;
            }
        }
        if !entry.title.contains(REPORT_TITLE_MARKER) {
            continue;
        }
        let (link_profile, link_executives) = classify_links(&entry.html_links);
        if link_profile.is_empty() && link_executives.is_empty() {
            info!(title = %entry.title, "no person-related link");
            continue;
        }
        sources.insert(
            entry.id.clone(),
            FilingSource {
                title: entry.title.clone(),
                link_profile,
                link_executives,
                updated_at: entry.updated.clone(),
            },
        );
    }
    (sources, false)
}

fn classify_links(links: &[String]) -> (String, String) {
    let mut profile = String::new();
    let mut executives = String::new();
    for link in links {
        if link.contains(PROFILE_LINK_MARKER) {
            profile = link.clone();
        } else if link.contains(EXECUTIVES_LINK_MARKER) {
            executives = link.clone();
        }
    }
    (profile, executives)
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Updated,
    Id,
}

/// Parse an Atom feed page and return its entries' title, timestamp, id and
/// `text/html` link hrefs.
fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"entry" => current = Some(FeedEntry::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"updated" if current.is_some() => field = Some(Field::Updated),
                b"id" if current.is_some() => field = Some(Field::Id),
                b"link" => push_html_link(&e, current.as_mut())?,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"link" => {
                push_html_link(&e, current.as_mut())?;
            }
            Ok(Event::Text(e)) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                    let text = e.unescape()?;
                    match field {
                        Field::Title => entry.title.push_str(&text),
                        Field::Updated => entry.updated.push_str(&text),
                        Field::Id => entry.id.push_str(&text),
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                b"title" | b"updated" | b"id" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

fn push_html_link(e: &BytesStart, entry: Option<&mut FeedEntry>) -> Result<()> {
    let Some(entry) = entry else {
        return Ok(());
    };
    let mut href = None;
    let mut is_html = false;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"type" if attr.unescape_value()? == "text/html" => is_html = true,
            b"href" => href = Some(attr.unescape_value()?.to_string()),
            _ => {}
        }
    }
    if is_html {
        if let Some(href) = href {
            entry.html_links.push(href);
        }
    }
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>EDINET</title>
  <updated>2019-09-09T12:00:00+09:00</updated>
  <entry>
    <title>有価証券報告書－第10期 テスト株式会社</title>
    <id>ED2019090900115</id>
    <updated>2019-09-09T10:00:00+09:00</updated>
    <link type="text/html" href="http://example.com/S100/0000000_header_jpcrp_ixbrl.htm"/>
    <link type="text/html" href="http://example.com/S100/0104010_honbun_jpcrp_ixbrl.htm"/>
    <link type="application/zip" href="http://example.com/S100.zip"/>
  </entry>
  <entry>
    <title>四半期報告書 別の会社</title>
    <id>ED2019090900116</id>
    <updated>2019-09-09T09:00:00+09:00</updated>
    <link type="text/html" href="http://example.com/S101/0000000_header_jpcrp_ixbrl.htm"/>
  </entry>
  <entry>
    <title>有価証券報告書－第5期 古い株式会社</title>
    <id>ED2019010100001</id>
    <updated>2019-01-01T09:00:00+09:00</updated>
    <link type="text/html" href="http://example.com/S102/0000000_header_jpcrp_ixbrl.htm"/>
  </entry>
</feed>"#;

    fn since(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn feed_entries_parsed_with_html_links_only() {
        let entries = parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "ED2019090900115");
        assert_eq!(entries[0].html_links.len(), 2);
        assert!(entries[0].title.contains("有価証券報告書"));
    }

    #[test]
    fn both_document_links_classified() {
        let entries = parse_feed(FEED).unwrap();
        let (profile, executives) = classify_links(&entries[0].html_links);
        assert!(profile.contains("0000000_header"));
        assert!(executives.contains("0104010"));
    }

    #[test]
    fn non_report_titles_skipped() {
        let entries = parse_feed(FEED).unwrap();
        let (sources, done) = collect_sources(&entries, since("2019-01-01 00:00:00"));
        assert!(!done);
        assert_eq!(sources.len(), 2);
        assert!(!sources.contains_key("ED2019090900116"));
    }

    #[test]
    fn cutoff_stops_the_walk() {
        let entries = parse_feed(FEED).unwrap();
        let (sources, done) = collect_sources(&entries, since("2019-06-01 00:00:00"));
        assert!(done);
        assert_eq!(sources.len(), 1);
        assert!(sources.contains_key("ED2019090900115"));
    }
}
