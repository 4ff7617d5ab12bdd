use serde::{Deserialize, Serialize};

/// How a job expects to be worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
    Unknown,
}

impl WorkArrangement {
    /// Infer an arrangement from free text such as "United States (Remote)".
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("remote") {
            WorkArrangement::Remote
        } else if lower.contains("hybrid") {
            WorkArrangement::Hybrid
        } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("on site")
        {
            WorkArrangement::Onsite
        } else {
            WorkArrangement::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkArrangement::Remote => "remote",
            WorkArrangement::Hybrid => "hybrid",
            WorkArrangement::Onsite => "onsite",
            WorkArrangement::Unknown => "unknown",
        }
    }
}

/// How an application for a job can be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyKind {
    /// In-page multi-step application flow.
    QuickApply,
    /// Redirects to an external site; out of reach for the wizard.
    External,
    Unknown,
}

/// A discovered job listing. Created by the extractor with whatever fields
/// the listing card exposes; enriched later by the detail resolver. The id
/// is site-assigned and immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub work_arrangement: WorkArrangement,
    /// Relative-age text as shown on the page, e.g. "6 days ago".
    pub posted_at: Option<String>,
    pub applicants: Option<String>,
    pub apply_kind: ApplyKind,
    pub description: Option<String>,
}

impl JobRecord {
    pub fn new(id: impl Into<String>) -> Self {
        JobRecord {
            id: id.into(),
            title: String::from("Unknown"),
            company: String::from("Unknown"),
            location: String::new(),
            work_arrangement: WorkArrangement::Unknown,
            posted_at: None,
            applicants: None,
            apply_kind: ApplyKind::Unknown,
            description: None,
        }
    }

    /// Canonical detail-view URL, always derivable from the id.
    pub fn source_url(&self) -> String {
        format!("https://www.linkedin.com/jobs/view/{}/", self.id)
    }

    /// Relative posting age in days, if the posted_at text can be read.
    /// "3 weeks ago" -> 21, "2 hours ago" -> 0. Unknown ages return None.
    pub fn posted_days_ago(&self) -> Option<u32> {
        let text = self.posted_at.as_deref()?.to_lowercase();
        let mut parts = text.split_whitespace();
        let count: u32 = parts.next()?.parse().ok()?;
        let unit = parts.next()?;
        if unit.starts_with("hour") || unit.starts_with("minute") {
            Some(0)
        } else if unit.starts_with("day") {
            Some(count)
        } else if unit.starts_with("week") {
            Some(count * 7)
        } else if unit.starts_with("month") {
            Some(count * 30)
        } else {
            None
        }
    }
}

/// Terminal result of handling one record, handed to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationOutcome {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub work_arrangement: WorkArrangement,
    pub status: OutcomeStatus,
    pub score: f64,
    pub source_url: String,
    pub applied_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Submitted,
    Abandoned,
    Failed,
    Skipped,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Submitted => "submitted",
            OutcomeStatus::Abandoned => "abandoned",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(OutcomeStatus::Submitted),
            "abandoned" => Some(OutcomeStatus::Abandoned),
            "failed" => Some(OutcomeStatus::Failed),
            "skipped" => Some(OutcomeStatus::Skipped),
            _ => None,
        }
    }
}

/// End-of-run counters reported to the user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub pages: u32,
    pub reviewed: u32,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub cancelled: bool,
    pub daily_limit_hit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrangement_from_text() {
        assert_eq!(
            WorkArrangement::from_text("United States (Remote)"),
            WorkArrangement::Remote
        );
        assert_eq!(
            WorkArrangement::from_text("San Jose, CA (Hybrid)"),
            WorkArrangement::Hybrid
        );
        assert_eq!(
            WorkArrangement::from_text("New York, NY (On-site)"),
            WorkArrangement::Onsite
        );
        assert_eq!(WorkArrangement::from_text("Austin, TX"), WorkArrangement::Unknown);
    }

    #[test]
    fn test_source_url_derived_from_id() {
        let record = JobRecord::new("4292436628");
        assert_eq!(
            record.source_url(),
            "https://www.linkedin.com/jobs/view/4292436628/"
        );
    }

    #[test]
    fn test_posted_days_ago() {
        let mut record = JobRecord::new("1");
        assert_eq!(record.posted_days_ago(), None);

        record.posted_at = Some("6 days ago".to_string());
        assert_eq!(record.posted_days_ago(), Some(6));

        record.posted_at = Some("3 weeks ago".to_string());
        assert_eq!(record.posted_days_ago(), Some(21));

        record.posted_at = Some("2 hours ago".to_string());
        assert_eq!(record.posted_days_ago(), Some(0));

        record.posted_at = Some("just now".to_string());
        assert_eq!(record.posted_days_ago(), None);
    }
}
