//! # Stepwise Models
//!
//! Core value types shared across the solving pipeline: subjects,
//! solution steps, and the assembled solution payload. These are plain
//! data with no shared mutable state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subjects the tutor can answer questions about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
    Biology,
}

impl Subject {
    /// Get all supported subjects
    pub fn all() -> Vec<Subject> {
        vec![
            Subject::Physics,
            Subject::Chemistry,
            Subject::Mathematics,
            Subject::Biology,
        ]
    }

    /// Canonical lowercase name, as stored and returned by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Mathematics => "mathematics",
            Subject::Biology => "biology",
        }
    }
}

impl FromStr for Subject {
    type Err = ();

    /// Case-insensitive parse; anything outside the four subjects is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "physics" => Ok(Subject::Physics),
            "chemistry" => Ok(Subject::Chemistry),
            "mathematics" => Ok(Subject::Mathematics),
            "biology" => Ok(Subject::Biology),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming question submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Opaque identity of the asking user
    pub user_id: String,
    /// The question text
    pub query: String,
    /// Raw subject string, validated and normalized by the pipeline
    pub subject: String,
}

impl SolveRequest {
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            subject: subject.into(),
        }
    }
}

/// One ordered unit of a structured solution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    /// 1-based step number; preserves upstream numbering, which may skip
    pub step: u32,
    /// Cleaned step text, markup stripped
    pub text: String,
    /// Optional short concept label (kept for the history schema and UI)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

impl Step {
    pub fn new(step: u32, text: impl Into<String>) -> Self {
        Self {
            step,
            text: text.into(),
            concept: None,
        }
    }
}

/// A structured solution recovered from raw completion text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Solution {
    /// Ordered steps, never empty
    pub steps: Vec<Step>,
    /// Extracted final answer, or the sentinel phrase when none was found
    pub final_answer: String,
    /// The full cleaned completion text
    pub explanation: String,
}

/// A successfully solved request, as returned by the orchestrator
#[derive(Debug, Clone)]
pub struct Solved {
    pub solution: Solution,
    pub subject: Subject,
    /// Whether this response was served from the cache
    pub cached: bool,
    /// Wall-clock time spent handling the request
    pub response_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parse_case_insensitive() {
        assert_eq!("Physics".parse::<Subject>(), Ok(Subject::Physics));
        assert_eq!("CHEMISTRY".parse::<Subject>(), Ok(Subject::Chemistry));
        assert_eq!("mathematics".parse::<Subject>(), Ok(Subject::Mathematics));
        assert_eq!(" biology ".parse::<Subject>(), Ok(Subject::Biology));
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn test_subject_serializes_lowercase() {
        let json = serde_json::to_string(&Subject::Physics).unwrap();
        assert_eq!(json, "\"physics\"");
    }

    #[test]
    fn test_step_concept_omitted_when_absent() {
        let json = serde_json::to_string(&Step::new(1, "Apply F=ma")).unwrap();
        assert!(!json.contains("concept"));
    }

    #[test]
    fn test_all_subjects() {
        assert_eq!(Subject::all().len(), 4);
    }
}
