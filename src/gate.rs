use serde::{Deserialize, Serialize};

/// Verdict from the scorer collaborator. Scorer failures surface as
/// `MatchAssessment::neutral()`, never as an error crossing this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchAssessment {
    /// 0.0..=1.0
    pub score: f64,
    pub recommendation: Recommendation,
}

impl MatchAssessment {
    /// The safest value when scoring failed or was ambiguous.
    pub fn neutral() -> Self {
        MatchAssessment { score: 0.0, recommendation: Recommendation::No }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Yes,
    No,
    Maybe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
}

/// The proceed/skip decision between scoring and applying.
///
/// Proceed when the score clears the threshold, or -- if the override
/// policy is enabled -- when the scorer explicitly recommends "yes" despite
/// a numeric miss. "Maybe" never overrides. Pure; always produces a
/// decision.
pub fn decide(assessment: MatchAssessment, threshold: f64, allow_override: bool) -> Decision {
    if assessment.score >= threshold {
        return Decision::Proceed;
    }
    if allow_override && assessment.recommendation == Recommendation::Yes {
        return Decision::Proceed;
    }
    Decision::Skip
}
