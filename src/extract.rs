use crate::models::{ApplyKind, JobRecord, WorkArrangement};
use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

fn job_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/jobs/view/(\d+)").unwrap())
}

fn posted_age_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+)\s+(?:minute|hour|day|week|month)s?\s+ago\b").unwrap()
    })
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Narrow an oversized page to its job containers, then truncate
/// deterministically from the start if it is still too large. Trailing
/// content may be lost; that is an accepted precision/recall tradeoff.
pub fn prepare_html(html: &str, max_chars: usize) -> String {
    if html.len() <= max_chars {
        return html.to_string();
    }
    warn!("Page HTML too large ({} chars), narrowing to job containers", html.len());

    let doc = Html::parse_document(html);

    // Best case: rebuild the page from just the job cards.
    let cards: Vec<String> = doc
        .select(&sel("[data-job-id], [data-id]"))
        .map(|card| card.html())
        .collect();
    if !cards.is_empty() {
        let narrowed = format!("<div class='extracted-jobs'>{}</div>", cards.join("\n"));
        if narrowed.len() > 1000 {
            return truncate_chars(&narrowed, max_chars);
        }
    }

    // Otherwise take the first recognizable listing container.
    for container in [
        "div.jobs-search-results",
        "div.jobs-search-results-list",
        "main",
        "div[role='main']",
    ] {
        if let Some(element) = doc.select(&sel(container)).next() {
            let inner = element.inner_html();
            if inner.len() > 1000 {
                let narrowed = format!("<div class='extracted-jobs'>{inner}</div>");
                return truncate_chars(&narrowed, max_chars);
            }
        }
    }

    truncate_chars(html, max_chars)
}

fn truncate_chars(html: &str, max_chars: usize) -> String {
    if html.len() <= max_chars {
        return html.to_string();
    }
    let mut end = max_chars;
    while end > 0 && !html.is_char_boundary(end) {
        end -= 1;
    }
    html[..end].to_string()
}

/// Turn a rendered listing page into an ordered, deduplicated sequence of
/// job records.
///
/// Structural patterns are tried in priority order and the first one that
/// yields anything wins; patterns are never merged, so one heuristic cannot
/// contribute conflicting partial records on top of another. No pattern
/// matching is not an error: an empty result means "no more jobs here".
pub fn extract_records(html: &str) -> Vec<JobRecord> {
    let doc = Html::parse_document(html);

    let patterns: [fn(&Html) -> Option<Vec<JobRecord>>; 3] =
        [from_id_attributes, from_card_classes, from_detail_links];

    for pattern in patterns {
        if let Some(records) = pattern(&doc) {
            debug!("Extraction pattern matched {} candidates", records.len());
            return dedup_first_seen(records);
        }
    }

    debug!("No extraction pattern matched");
    Vec::new()
}

fn dedup_first_seen(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// Pattern 1: containers carrying an explicit identifier attribute.
fn from_id_attributes(doc: &Html) -> Option<Vec<JobRecord>> {
    let records: Vec<JobRecord> = doc
        .select(&sel("[data-job-id], [data-id]"))
        .filter_map(|card| {
            let id = card
                .value()
                .attr("data-job-id")
                .or_else(|| card.value().attr("data-id"))?
                .trim()
                .to_string();
            if id.is_empty() {
                return None;
            }
            Some(candidate_record(id, &card))
        })
        .collect();
    (!records.is_empty()).then_some(records)
}

/// Pattern 2: card-class heuristics with the id parsed out of the nested
/// detail link.
fn from_card_classes(doc: &Html) -> Option<Vec<JobRecord>> {
    let records: Vec<JobRecord> = doc
        .select(&sel("div.job-card-container, li.jobs-search-results__list-item"))
        .filter_map(|card| {
            let id = id_from_links(&card)?;
            Some(candidate_record(id, &card))
        })
        .collect();
    (!records.is_empty()).then_some(records)
}

/// Pattern 3: bare detail links anywhere on the page. The weakest signal,
/// used only when nothing card-shaped exists.
fn from_detail_links(doc: &Html) -> Option<Vec<JobRecord>> {
    let records: Vec<JobRecord> = doc
        .select(&sel("a[href*='/jobs/view/']"))
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let id = job_url_re().captures(href)?.get(1)?.as_str().to_string();
            let mut record = JobRecord::new(id);
            let title = text_of(&link);
            if !title.is_empty() {
                record.title = title;
            }
            // Sibling text around the link often carries company/location.
            if let Some(parent) = link.parent().and_then(ElementRef::wrap) {
                fill_from_texts(&mut record, &text_chunks(&parent));
            }
            Some(record)
        })
        .collect();
    (!records.is_empty()).then_some(records)
}

fn id_from_links(card: &ElementRef) -> Option<String> {
    for link in card.select(&sel("a[href]")) {
        let href = link.value().attr("href")?;
        if let Some(caps) = job_url_re().captures(href) {
            return Some(caps.get(1)?.as_str().to_string());
        }
    }
    None
}

fn candidate_record(id: String, card: &ElementRef) -> JobRecord {
    let mut record = JobRecord::new(id);

    if let Some(link) = card.select(&sel("a")).next() {
        let title = text_of(&link);
        if !title.is_empty() {
            record.title = title;
        }
    }

    fill_from_texts(&mut record, &text_chunks(card));
    record
}

/// Position/keyword heuristics over the card's visible text chunks. There
/// is no fixed schema: the first chunk after the title that looks like a
/// place becomes the location, the first that doesn't becomes the company.
fn fill_from_texts(record: &mut JobRecord, chunks: &[String]) {
    for chunk in chunks {
        if chunk == &record.title {
            continue;
        }
        if chunk.to_lowercase().contains("easy apply") {
            record.apply_kind = ApplyKind::QuickApply;
            continue;
        }
        if record.posted_at.is_none() {
            if let Some(m) = posted_age_re().find(chunk) {
                record.posted_at = Some(m.as_str().to_string());
                continue;
            }
        }
        if record.location.is_empty() && looks_like_location(chunk) {
            record.location = chunk.clone();
            continue;
        }
        if record.company == "Unknown" && looks_like_company(chunk) {
            record.company = chunk.clone();
        }
    }

    if record.work_arrangement == WorkArrangement::Unknown && !record.location.is_empty() {
        record.work_arrangement = WorkArrangement::from_text(&record.location);
    }
}

fn text_chunks(element: &ElementRef) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_location(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("remote")
        || lower.contains("hybrid")
        || lower.contains("on-site")
        || lower.contains("united states")
        // "San Jose, CA" style
        || (text.contains(", ") && text.len() < 60)
}

fn looks_like_company(text: &str) -> bool {
    if text.len() < 2 || text.len() > 80 {
        return false;
    }
    let lower = text.to_lowercase();
    const NOISE: &[&str] = &[
        "ago",
        "applicant",
        "easy apply",
        "promoted",
        "viewed",
        "actively reviewing",
        "be an early applicant",
        "$",
    ];
    !NOISE.iter().any(|n| lower.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_PAGE: &str = r#"
        <html><body>
          <div class="jobs-search-results">
            <div data-job-id="4292436628" class="job-card-container">
              <a href="/jobs/view/4292436628">Application Developer</a>
              <span>netPolarity, Inc.</span>
              <span>United States (Remote)</span>
              <span>6 days ago</span>
              <span>Easy Apply</span>
            </div>
            <div data-job-id="4210108588" class="job-card-container">
              <a href="/jobs/view/4210108588">Platform Engineer</a>
              <span>Acme Corp</span>
              <span>San Jose, CA (Hybrid)</span>
            </div>
            <div data-job-id="4292436628" class="job-card-container">
              <a href="/jobs/view/4292436628">Application Developer</a>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_id_attribute_pattern_with_dedup() {
        let records = extract_records(CARD_PAGE);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "4292436628");
        assert_eq!(records[1].id, "4210108588");
        // First occurrence wins, page order preserved.
        assert_eq!(records[0].title, "Application Developer");
        assert_eq!(records[1].title, "Platform Engineer");
    }

    #[test]
    fn test_field_heuristics() {
        let records = extract_records(CARD_PAGE);
        let first = &records[0];
        assert_eq!(first.company, "netPolarity, Inc.");
        assert_eq!(first.location, "United States (Remote)");
        assert_eq!(first.work_arrangement, WorkArrangement::Remote);
        assert_eq!(first.posted_at.as_deref(), Some("6 days ago"));
        assert_eq!(first.apply_kind, ApplyKind::QuickApply);

        let second = &records[1];
        assert_eq!(second.company, "Acme Corp");
        assert_eq!(second.work_arrangement, WorkArrangement::Hybrid);
        assert_eq!(second.apply_kind, ApplyKind::Unknown);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let once = extract_records(CARD_PAGE);
        let twice = extract_records(CARD_PAGE);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_malformed_fragment_single_candidate() {
        // One valid candidate among separator noise yields exactly one
        // record; the separators are dropped silently.
        let html = r#"
            <div class="separator">People also viewed</div>
            <div data-id="555"><a href="/jobs/view/555">Rust Engineer</a></div>
            <div class="separator"></div>
        "#;
        let records = extract_records(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "555");
    }

    #[test]
    fn test_patterns_not_merged() {
        // A page with id-attribute cards AND a stray detail link: the
        // higher-priority pattern wins outright, the link id is not added.
        let html = r#"
            <div data-job-id="111"><a href="/jobs/view/111">A</a></div>
            <a href="/jobs/view/999">Unrelated footer link</a>
        "#;
        let records = extract_records(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "111");
    }

    #[test]
    fn test_card_class_fallback() {
        let html = r#"
            <div class="job-card-container">
              <a href="https://www.linkedin.com/jobs/view/777/?ref=x">Data Engineer</a>
              <span>Initech</span>
              <span>Austin, TX</span>
            </div>
        "#;
        let records = extract_records(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "777");
        assert_eq!(records[0].title, "Data Engineer");
        assert_eq!(records[0].company, "Initech");
    }

    #[test]
    fn test_detail_link_fallback() {
        let html = r#"<ul>
            <li><a href="/jobs/view/123/">Backend Developer</a> <span>Globex</span></li>
            <li><a href="/jobs/view/456/">SRE</a></li>
        </ul>"#;
        let records = extract_records(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "123");
        assert_eq!(records[0].title, "Backend Developer");
        assert_eq!(records[1].id, "456");
    }

    #[test]
    fn test_no_pattern_matches_yields_empty() {
        let records = extract_records("<html><body><p>Nothing here</p></body></html>");
        assert!(records.is_empty());
    }

    #[test]
    fn test_prepare_html_untouched_when_small() {
        let html = "<div data-job-id='1'>x</div>";
        assert_eq!(prepare_html(html, 400_000), html);
    }

    #[test]
    fn test_prepare_html_narrows_to_cards() {
        // Oversized page where the bulk is outside the cards: narrowing
        // keeps every card and drops the padding.
        let padding = "p".repeat(2000);
        let card: String = (0..20)
            .map(|i| format!("<div data-job-id=\"{i}\"><a href=\"/jobs/view/{i}\">Job {i}</a></div>"))
            .collect();
        let html = format!("<html><body><div>{padding}</div>{card}</body></html>");

        let prepared = prepare_html(&html, 3000);
        let records = extract_records(&prepared);
        assert_eq!(records.len(), 20);
        assert!(!prepared.contains(&padding));
    }

    #[test]
    fn test_prepare_html_truncates_deterministically() {
        let html = format!("<p>{}</p>", "a".repeat(10_000));
        let a = prepare_html(&html, 500);
        let b = prepare_html(&html, 500);
        assert_eq!(a, b);
        assert!(a.len() <= 500);
        // Truncation keeps the head of the document.
        assert!(a.starts_with("<p>"));
    }
}
