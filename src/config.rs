use std::env;

/// Runtime settings. Defaults mirror the behavior of the production site
/// flow; every value can be overridden through a `JOBPILOT_*` environment
/// variable.
#[derive(Debug, Clone)]
pub struct Settings {
    // Rate / policy
    pub daily_application_limit: u32,
    pub min_match_score: f64,
    pub search_delay_secs: (f64, f64),
    pub apply_delay_secs: (f64, f64),
    pub posting_age_days: u32,

    // Listing traversal
    pub max_pages: u32,

    // Content loader
    pub scroll_max_attempts: u32,
    pub scroll_settle_ms: u64,
    /// Stop after this many no-growth rounds once the count is already
    /// at least `early_exit_min_count`.
    pub stability_threshold: u32,
    pub early_exit_min_count: usize,
    /// Stop after this many no-growth rounds regardless of count.
    pub stability_cap: u32,
    /// Typical full page size for the listing UI; reaching it ends loading.
    pub page_size_hint: usize,

    // Record extraction
    pub max_html_chars: usize,

    // Detail resolution
    pub detail_wait_ms: u64,
    /// A panel shorter than this is treated as not yet loaded.
    pub min_detail_chars: usize,

    // Application wizard
    pub modal_wait_ms: u64,
    pub max_wizard_steps: u32,

    // Gate policy: a "yes" recommendation can override a numeric miss.
    pub recommendation_override: bool,

    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            daily_application_limit: 50,
            min_match_score: 0.7,
            search_delay_secs: (5.0, 15.0),
            apply_delay_secs: (10.0, 30.0),
            posting_age_days: 7,
            max_pages: 5,
            scroll_max_attempts: 15,
            scroll_settle_ms: 3000,
            stability_threshold: 3,
            early_exit_min_count: 20,
            stability_cap: 5,
            page_size_hint: 25,
            max_html_chars: 400_000,
            detail_wait_ms: 3000,
            min_detail_chars: 100,
            modal_wait_ms: 2000,
            max_wizard_steps: 5,
            recommendation_override: true,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Some(v) = env_parse::<u32>("JOBPILOT_DAILY_LIMIT") {
            settings.daily_application_limit = v;
        }
        if let Some(v) = env_parse::<f64>("JOBPILOT_MIN_MATCH_SCORE") {
            settings.min_match_score = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_parse::<u32>("JOBPILOT_POSTING_AGE_DAYS") {
            settings.posting_age_days = v;
        }
        if let Some(v) = env_parse::<u32>("JOBPILOT_MAX_PAGES") {
            settings.max_pages = v;
        }
        if let Some(v) = env_parse::<u64>("JOBPILOT_SETTLE_MS") {
            settings.scroll_settle_ms = v;
        }
        if let Some(v) = env_parse::<f64>("JOBPILOT_SEARCH_DELAY_MIN") {
            settings.search_delay_secs.0 = v;
        }
        if let Some(v) = env_parse::<f64>("JOBPILOT_SEARCH_DELAY_MAX") {
            settings.search_delay_secs.1 = v;
        }
        if let Some(v) = env_parse::<f64>("JOBPILOT_APPLY_DELAY_MIN") {
            settings.apply_delay_secs.0 = v;
        }
        if let Some(v) = env_parse::<f64>("JOBPILOT_APPLY_DELAY_MAX") {
            settings.apply_delay_secs.1 = v;
        }
        if let Some(v) = env_parse::<bool>("JOBPILOT_RECOMMENDATION_OVERRIDE") {
            settings.recommendation_override = v;
        }

        settings
    }

    /// Zero-delay settings for tests; keeps the same structural tunables.
    #[cfg(test)]
    pub fn fast() -> Self {
        Settings {
            search_delay_secs: (0.0, 0.0),
            apply_delay_secs: (0.0, 0.0),
            scroll_settle_ms: 0,
            detail_wait_ms: 0,
            modal_wait_ms: 0,
            ..Settings::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
