use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Structured candidate profile, produced upstream by resume parsing.
/// Opaque read-only input to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub preferred_roles: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experience {
    pub title: String,
    #[serde(default)]
    pub company: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    #[serde(default)]
    pub school: String,
}

impl CandidateProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse profile file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_json() {
        let raw = r#"{
            "name": "Sam Rivera",
            "location": "San Jose, CA",
            "skills": ["Rust", "SQL", "Kubernetes"],
            "preferred_roles": ["Backend Engineer"],
            "experience": [{"title": "Software Engineer", "company": "Initech"}],
            "education": [{"degree": "B.S. Computer Science"}]
        }"#;
        let profile: CandidateProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.skills.len(), 3);
        assert_eq!(profile.experience[0].title, "Software Engineer");
    }

    #[test]
    fn test_missing_fields_default() {
        let profile: CandidateProfile = serde_json::from_str(r#"{"name": "A"}"#).unwrap();
        assert!(profile.skills.is_empty());
        assert!(profile.preferred_roles.is_empty());
    }
}
