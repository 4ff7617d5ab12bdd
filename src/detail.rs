use crate::browser::PageDriver;
use crate::config::Settings;
use crate::models::{ApplyKind, JobRecord, WorkArrangement};
use log::{debug, warn};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

const PLACEHOLDER_DESCRIPTION: &str = "(description unavailable)";

fn applicants_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:over\s+)?(\d+)\+?\s+applicants?\b").unwrap())
}

fn posted_age_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+)\s+(?:minute|hour|day|week|month)s?\s+ago\b").unwrap()
    })
}

/// Open a record's detail view and return an enriched copy.
///
/// The input record is never mutated; enrichment only adds or overwrites
/// fields. A panel that will not materialize (or stays below the minimum
/// length after one retry) degrades to the original record with a
/// placeholder description -- one bad detail view must not abort the batch.
pub async fn resolve<D: PageDriver>(
    driver: &D,
    record: &JobRecord,
    settings: &Settings,
) -> JobRecord {
    let wait = Duration::from_millis(settings.detail_wait_ms);

    if let Err(e) = driver.open_card(&record.id).await {
        warn!("Could not open detail view for {}: {e:#}", record.id);
        return with_placeholder(record);
    }
    driver.settle(wait).await;

    let mut panel = fetch_panel(driver, settings).await;
    if panel.is_none() {
        // One bounded retry: a short or missing panel usually just has not
        // rendered yet.
        driver.settle(wait).await;
        panel = fetch_panel(driver, settings).await;
    }

    let Some(html) = panel else {
        warn!("Detail panel never materialized for {}", record.id);
        return with_placeholder(record);
    };

    debug!("Detail panel for {}: {} chars", record.id, html.len());
    enrich(record, &html)
}

async fn fetch_panel<D: PageDriver>(driver: &D, settings: &Settings) -> Option<String> {
    match driver.detail_html().await {
        Ok(Some(html)) if html.len() >= settings.min_detail_chars => Some(html),
        Ok(Some(html)) => {
            debug!("Detail panel too short ({} chars), treating as not loaded", html.len());
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Detail panel query failed: {e:#}");
            None
        }
    }
}

fn with_placeholder(record: &JobRecord) -> JobRecord {
    let mut enriched = record.clone();
    if enriched.description.is_none() {
        enriched.description = Some(PLACEHOLDER_DESCRIPTION.to_string());
    }
    enriched
}

fn enrich(record: &JobRecord, panel_html: &str) -> JobRecord {
    let mut enriched = record.clone();
    let doc = Html::parse_fragment(panel_html);

    let text = doc
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if !text.is_empty() {
        enriched.description = Some(text.clone());
    } else {
        enriched.description = Some(PLACEHOLDER_DESCRIPTION.to_string());
    }

    // Quick-apply affordance: a button or text marker anywhere in the panel.
    let lower = text.to_lowercase();
    if panel_has_quick_apply(&doc) || lower.contains("easy apply") {
        enriched.apply_kind = ApplyKind::QuickApply;
    } else if enriched.apply_kind == ApplyKind::Unknown && lower.contains("apply") {
        enriched.apply_kind = ApplyKind::External;
    }

    if enriched.posted_at.is_none() {
        if let Some(m) = posted_age_re().find(&text) {
            enriched.posted_at = Some(m.as_str().to_string());
        }
    }

    if enriched.applicants.is_none() {
        if let Some(m) = applicants_re().find(&text) {
            enriched.applicants = Some(m.as_str().to_string());
        }
    }

    // Preference chips refine the arrangement beyond what the card showed.
    if lower.contains("remote") {
        enriched.work_arrangement = WorkArrangement::Remote;
    } else if lower.contains("hybrid") {
        enriched.work_arrangement = WorkArrangement::Hybrid;
    } else if lower.contains("on-site") || lower.contains("onsite") {
        enriched.work_arrangement = WorkArrangement::Onsite;
    }

    enriched
}

fn panel_has_quick_apply(doc: &Html) -> bool {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let selector = SEL.get_or_init(|| {
        Selector::parse("button.jobs-apply-button, button[aria-label*='Easy Apply']").unwrap()
    });
    doc.select(selector).next().is_some()
}
