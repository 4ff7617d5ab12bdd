use crate::gate::{MatchAssessment, Recommendation};
use crate::models::{JobRecord, WorkArrangement};
use crate::profile::CandidateProfile;
use anyhow::{Context as _, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;

/// Scores a record against a profile. Implementations must tolerate missing
/// or huge input and always return an assessment; failures become the
/// neutral assessment and never cross this boundary as errors.
pub trait Scorer {
    async fn assess(&self, profile: &CandidateProfile, record: &JobRecord) -> MatchAssessment;
}

/// Runtime dispatch over the available scorer backends.
pub enum ScorerKind {
    Heuristic(HeuristicScorer),
    Anthropic(AnthropicScorer),
}

impl ScorerKind {
    /// API-backed scoring when a key is configured, local heuristics
    /// otherwise.
    pub fn from_env() -> Result<Self> {
        match env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(ScorerKind::Anthropic(AnthropicScorer::new(key))),
            _ => Ok(ScorerKind::Heuristic(HeuristicScorer)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScorerKind::Heuristic(_) => "heuristic",
            ScorerKind::Anthropic(_) => "anthropic",
        }
    }
}

impl Scorer for ScorerKind {
    async fn assess(&self, profile: &CandidateProfile, record: &JobRecord) -> MatchAssessment {
        match self {
            ScorerKind::Heuristic(s) => s.assess(profile, record).await,
            ScorerKind::Anthropic(s) => s.assess(profile, record).await,
        }
    }
}

// --- Heuristic scorer ---

/// Weighted algorithmic match: skills, title, location, experience depth,
/// education. No network, deterministic.
pub struct HeuristicScorer;

const W_SKILLS: f64 = 0.35;
const W_TITLE: f64 = 0.25;
const W_LOCATION: f64 = 0.15;
const W_EXPERIENCE: f64 = 0.15;
const W_EDUCATION: f64 = 0.10;

impl Scorer for HeuristicScorer {
    async fn assess(&self, profile: &CandidateProfile, record: &JobRecord) -> MatchAssessment {
        let score = W_SKILLS * score_skills(profile, record)
            + W_TITLE * score_title(profile, record)
            + W_LOCATION * score_location(profile, record)
            + W_EXPERIENCE * score_experience(profile)
            + W_EDUCATION * score_education(profile);
        let score = score.clamp(0.0, 1.0);

        MatchAssessment { score, recommendation: recommendation_for(score) }
    }
}

fn recommendation_for(score: f64) -> Recommendation {
    if score >= 0.8 {
        Recommendation::Yes
    } else if score >= 0.55 {
        Recommendation::Maybe
    } else {
        Recommendation::No
    }
}

fn score_skills(profile: &CandidateProfile, record: &JobRecord) -> f64 {
    if profile.skills.is_empty() {
        return 0.5;
    }
    let job_text = format!(
        "{} {}",
        record.title,
        record.description.as_deref().unwrap_or("")
    )
    .to_lowercase();

    let matching = profile
        .skills
        .iter()
        .filter(|skill| job_text.contains(&skill.to_lowercase()))
        .count();

    let mut ratio = matching as f64 / profile.skills.len() as f64;
    if matching >= 5 {
        ratio = (ratio * 1.2).min(1.0);
    }
    ratio
}

fn score_title(profile: &CandidateProfile, record: &JobRecord) -> f64 {
    let title = record.title.to_lowercase();

    for role in &profile.preferred_roles {
        if fuzzy_match(&role.to_lowercase(), &title) {
            return 1.0;
        }
    }
    if let Some(recent) = profile.experience.first() {
        if fuzzy_match(&recent.title.to_lowercase(), &title) {
            return 0.9;
        }
    }
    0.3
}

fn score_location(profile: &CandidateProfile, record: &JobRecord) -> f64 {
    match record.work_arrangement {
        WorkArrangement::Remote => return 1.0,
        WorkArrangement::Hybrid => return 0.8,
        _ => {}
    }
    if !profile.location.is_empty() && !record.location.is_empty() {
        let job_loc = record.location.to_lowercase();
        let same_area = profile
            .location
            .to_lowercase()
            .split(',')
            .map(str::trim)
            .any(|part| !part.is_empty() && job_loc.contains(part));
        if same_area {
            return 0.9;
        }
    }
    0.3
}

fn score_experience(profile: &CandidateProfile) -> f64 {
    match profile.experience.len() {
        n if n >= 5 => 0.9,
        n if n >= 3 => 0.8,
        n if n >= 1 => 0.6,
        _ => 0.3,
    }
}

fn score_education(profile: &CandidateProfile) -> f64 {
    if profile.education.is_empty() {
        return 0.5;
    }
    for edu in &profile.education {
        let degree = edu.degree.to_lowercase();
        if ["master", "phd", "doctorate", "mba"].iter().any(|d| degree.contains(d)) {
            return 1.0;
        }
        if ["bachelor", "b.s.", "b.a."].iter().any(|d| degree.contains(d)) {
            return 0.8;
        }
    }
    0.6
}

fn fuzzy_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    strsim::jaro_winkler(a, b) >= 0.85
}

// --- Anthropic API scorer ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
/// Huge descriptions are cut before prompting; the head carries the
/// requirements in practice.
const MAX_PROMPT_DESCRIPTION: usize = 50_000;

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

pub struct AnthropicScorer {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicScorer {
    pub fn new(api_key: String) -> Self {
        AnthropicScorer { api_key, client: reqwest::Client::new() }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: ANTHROPIC_MODEL.to_string(),
            max_tokens: 512,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API request failed with status {status}: {error_text}"));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .context("failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("no content in Anthropic API response"))
    }
}

impl Scorer for AnthropicScorer {
    async fn assess(&self, profile: &CandidateProfile, record: &JobRecord) -> MatchAssessment {
        let prompt = build_prompt(profile, record);
        match self.complete(&prompt).await {
            Ok(response) => parse_assessment(&response).unwrap_or_else(|| {
                warn!("Could not parse scorer response for {}", record.id);
                MatchAssessment::neutral()
            }),
            Err(e) => {
                warn!("Scoring failed for {}: {e:#}", record.id);
                MatchAssessment::neutral()
            }
        }
    }
}

fn build_prompt(profile: &CandidateProfile, record: &JobRecord) -> String {
    let mut description = record.description.as_deref().unwrap_or("").to_string();
    if description.len() > MAX_PROMPT_DESCRIPTION {
        let mut end = MAX_PROMPT_DESCRIPTION;
        while end > 0 && !description.is_char_boundary(end) {
            end -= 1;
        }
        description.truncate(end);
    }

    format!(
        "Rate how well this candidate matches the job posting.\n\
        Return EXACTLY in this format with no other text:\n\
        SCORE: <number 0-100>\n\
        RECOMMENDATION: <yes|no|maybe>\n\n\
        Candidate skills: {}\n\
        Preferred roles: {}\n\
        Candidate location: {}\n\n\
        Job Title: {}\n\
        Company: {}\n\
        Location: {} ({})\n\
        Description:\n{}",
        profile.skills.join(", "),
        profile.preferred_roles.join(", "),
        profile.location,
        record.title,
        record.company,
        record.location,
        record.work_arrangement.as_str(),
        description,
    )
}

fn parse_assessment(response: &str) -> Option<MatchAssessment> {
    let mut score = None;
    let mut recommendation = None;

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("SCORE:") {
            score = rest.trim().parse::<f64>().ok().map(|s| (s / 100.0).clamp(0.0, 1.0));
        } else if let Some(rest) = line.strip_prefix("RECOMMENDATION:") {
            recommendation = match rest.trim().to_lowercase().as_str() {
                "yes" => Some(Recommendation::Yes),
                "no" => Some(Recommendation::No),
                "maybe" => Some(Recommendation::Maybe),
                _ => None,
            };
        }
    }

    Some(MatchAssessment { score: score?, recommendation: recommendation? })
}
