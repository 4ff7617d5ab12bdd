use crate::apply::{self, SessionState};
use crate::browser::PageDriver;
use crate::config::Settings;
use crate::db::Database;
use crate::detail;
use crate::extract;
use crate::gate::{self, Decision, MatchAssessment};
use crate::loader;
use crate::models::{ApplicationOutcome, ApplyKind, JobRecord, OutcomeStatus, RunSummary};
use crate::profile::CandidateProfile;
use crate::rate::RateLimiter;
use crate::scorer::Scorer;
use anyhow::{Context as _, Result};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One browsing run over a listing feed: load each page fully, extract its
/// records, and take every record through detail resolution, scoring, the
/// match gate and (when it proceeds) the application wizard.
///
/// Record-level problems degrade to skip-or-placeholder and the batch goes
/// on; only losing the page itself ends the run with an error.
pub struct Pipeline<'a, D: PageDriver, S: Scorer> {
    driver: &'a D,
    scorer: &'a S,
    db: &'a Database,
    profile: &'a CandidateProfile,
    settings: &'a Settings,
    limiter: RateLimiter,
    cancel: Arc<AtomicBool>,
    /// Stop reviewing after this many records, across pages.
    max_jobs: u32,
}

impl<'a, D: PageDriver, S: Scorer> Pipeline<'a, D, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: &'a D,
        scorer: &'a S,
        db: &'a Database,
        profile: &'a CandidateProfile,
        settings: &'a Settings,
        limiter: RateLimiter,
        cancel: Arc<AtomicBool>,
        max_jobs: u32,
    ) -> Self {
        Pipeline { driver, scorer, db, profile, settings, limiter, cancel, max_jobs }
    }

    pub async fn run(mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        'pages: for page in 1..=self.settings.max_pages {
            summary.pages = page;

            let load = loader::load_all(self.driver, self.settings).await;
            info!(
                "Page {page}: {} card(s) loaded ({} stable round(s))",
                load.loaded_count, load.stable_rounds
            );

            let html = self
                .driver
                .page_html()
                .await
                .with_context(|| format!("failed to read listing page {page}"))?;
            let prepared = extract::prepare_html(&html, self.settings.max_html_chars);
            let records = extract::extract_records(&prepared);

            if records.is_empty() {
                info!("Page {page}: no records extracted, stopping");
                break;
            }
            info!("Page {page}: {} record(s) extracted", records.len());

            for record in &records {
                if self.cancel.load(Ordering::SeqCst) {
                    info!("Cancellation requested, finishing run");
                    summary.cancelled = true;
                    break 'pages;
                }
                if summary.reviewed >= self.max_jobs {
                    info!("Reviewed {} record(s), reaching the run cap", summary.reviewed);
                    break 'pages;
                }
                if summary.daily_limit_hit {
                    break 'pages;
                }

                summary.reviewed += 1;
                self.handle_record(record, &mut summary).await;
                self.limiter.between_jobs().await;
            }

            // No point loading another page once the budget is gone.
            if summary.daily_limit_hit {
                break;
            }

            match self.driver.advance_page().await {
                Ok(true) => continue,
                Ok(false) => {
                    info!("No further pages after page {page}");
                    break;
                }
                Err(e) => {
                    warn!("Pagination broke after page {page}: {e:#}");
                    break;
                }
            }
        }

        Ok(summary)
    }

    async fn handle_record(&mut self, record: &JobRecord, summary: &mut RunSummary) {
        // Idempotency first: a prior submission (or an unanswerable check)
        // means hands off.
        match self.db.has_applied(&record.id) {
            Ok(false) => {}
            Ok(true) => {
                info!("Already applied to {} ({}), skipping", record.title, record.id);
                summary.skipped += 1;
                return;
            }
            Err(e) => {
                warn!("Could not check application history for {}: {e:#}", record.id);
                summary.skipped += 1;
                return;
            }
        }

        let record = detail::resolve(self.driver, record, self.settings).await;
        info!("Reviewing: {} at {} [{}]", record.title, record.company, record.id);

        if let Some(days) = record.posted_days_ago() {
            if days > self.settings.posting_age_days {
                info!("Posted {days} day(s) ago, past the freshness window, skipping");
                summary.skipped += 1;
                return;
            }
        }

        if record.apply_kind != ApplyKind::QuickApply {
            info!("No quick-apply flow for {} ({:?}), skipping", record.id, record.apply_kind);
            self.finish(&record, OutcomeStatus::Skipped, 0.0);
            summary.skipped += 1;
            return;
        }

        let assessment = self.scorer.assess(self.profile, &record).await;
        info!(
            "Match score {:.2} ({:?}) for {}",
            assessment.score, assessment.recommendation, record.id
        );

        let decision = gate::decide(
            assessment,
            self.settings.min_match_score,
            self.settings.recommendation_override,
        );
        if decision == Decision::Skip {
            self.finish(&record, OutcomeStatus::Skipped, assessment.score);
            summary.skipped += 1;
            return;
        }

        if self.limiter.limit_reached() {
            info!("Daily application limit reached, stopping for today");
            summary.daily_limit_hit = true;
            return;
        }

        if self.settings.dry_run {
            info!("[dry-run] Would apply to {} at {}", record.title, record.company);
            summary.applied += 1;
            return;
        }

        self.limiter.before_apply().await;
        let session = apply::run_session(self.driver, self.settings).await;
        self.record_session(&record, assessment, session.state, summary);
    }

    fn record_session(
        &mut self,
        record: &JobRecord,
        assessment: MatchAssessment,
        state: SessionState,
        summary: &mut RunSummary,
    ) {
        match state {
            SessionState::Submitted => {
                self.limiter.record_submission();
                self.finish(record, OutcomeStatus::Submitted, assessment.score);
                summary.applied += 1;
            }
            SessionState::Abandoned => {
                self.finish(record, OutcomeStatus::Abandoned, assessment.score);
                summary.skipped += 1;
            }
            _ => {
                self.finish(record, OutcomeStatus::Failed, assessment.score);
                summary.failed += 1;
            }
        }
    }

    fn finish(&self, record: &JobRecord, status: OutcomeStatus, score: f64) {
        let outcome = ApplicationOutcome {
            job_id: record.id.clone(),
            title: record.title.clone(),
            company: record.company.clone(),
            location: record.location.clone(),
            work_arrangement: record.work_arrangement,
            status,
            score,
            source_url: record.source_url(),
            applied_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        // Losing one history row must not end the run.
        if let Err(e) = self.db.record_outcome(&outcome) {
            warn!("Could not record outcome for {}: {e:#}", record.id);
        }
    }
}
