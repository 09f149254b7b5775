use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// One answered question, produced by the external evaluation step.
/// Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEvent {
    pub user_id: String,
    pub skill_id: String,
    pub question_id: String,
    pub is_correct: bool,
    pub points_earned: f64,
    pub difficulty_level: u8,
    pub answered_at: DateTime<Utc>,
}

/// Population estimate of the true proficiency, scaled 0-100.
/// Not a point bound: the score itself may fall outside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

/// One per (user, skill). Created on the first response, mutated in place on
/// every subsequent aggregation (id preserved), never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyRecord {
    pub id: String,
    pub user_id: String,
    pub skill_id: String,
    pub score: f64,
    pub confidence_interval: ConfidenceInterval,
    pub mastery_level: u8,
    pub is_strength: bool,
    pub is_weakness: bool,
    pub benchmark_percentile: u8,
    pub score_history: Vec<f64>,
    pub last_updated: DateTime<Utc>,
}

/// One per (user, skill): current difficulty plus the sliding outcome window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    pub user_id: String,
    pub skill_id: String,
    pub current_difficulty: u8,
    pub window: VecDeque<bool>,
}

impl DifficultyState {
    pub fn new(user_id: &str, skill_id: &str, difficulty: u8) -> Self {
        Self {
            user_id: user_id.to_string(),
            skill_id: skill_id.to_string(),
            current_difficulty: difficulty,
            window: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Reset,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Reset => "reset",
        }
    }
}

/// One row of the append-only repetition audit trail. A finalized entry only
/// ever has its status and rating stamped; its parameters stay untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionScheduleEntry {
    pub id: String,
    pub user_id: String,
    pub skill_id: String,
    pub repetition_number: u32,
    pub easiness_factor: f64,
    pub interval_days: f64,
    pub scheduled_date: DateTime<Utc>,
    pub status: ScheduleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Recall quality on the 0-5 SM-2 scale, validated at construction so an
/// out-of-range rating can never reach the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceRating(u8);

impl PerformanceRating {
    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_lapse(&self) -> bool {
        self.0 < 3
    }
}

impl TryFrom<u8> for PerformanceRating {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 5 {
            return Err(EngineError::InvalidRating(value));
        }
        Ok(Self(value))
    }
}

/// Skill metadata from the content store. Used for grouping and labeling
/// only, never for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    pub id: String,
    pub name: String,
    pub domain_id: String,
}

/// Peer-selection criteria: same sector, optionally same role and an
/// experience band of +/- 2 years around the given value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortCriteria {
    pub sector_id: String,
    pub role_id: Option<String>,
    pub years_experience: Option<u32>,
}

impl CohortCriteria {
    /// Fallback criteria when the exact cohort comes back empty: sector only.
    pub fn broadened(&self) -> Self {
        Self {
            sector_id: self.sector_id.clone(),
            role_id: None,
            years_experience: None,
        }
    }

    pub fn is_broadened(&self) -> bool {
        self.role_id.is_none() && self.years_experience.is_none()
    }
}

/// A candidate question from the content store, tagged with its difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub id: String,
    pub difficulty: u8,
}

pub(crate) fn validate_difficulty(difficulty: u8) -> Result<u8, EngineError> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        return Err(EngineError::InvalidDifficulty(difficulty));
    }
    Ok(difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(PerformanceRating::try_from(0).is_ok());
        assert!(PerformanceRating::try_from(5).is_ok());
        assert!(matches!(
            PerformanceRating::try_from(6),
            Err(EngineError::InvalidRating(6))
        ));
    }

    #[test]
    fn test_lapse_threshold() {
        assert!(PerformanceRating::try_from(2).unwrap().is_lapse());
        assert!(!PerformanceRating::try_from(3).unwrap().is_lapse());
    }

    #[test]
    fn test_broadened_criteria_drop_role_and_experience() {
        let criteria = CohortCriteria {
            sector_id: "finance".to_string(),
            role_id: Some("analyst".to_string()),
            years_experience: Some(4),
        };
        let broad = criteria.broadened();
        assert_eq!(broad.sector_id, "finance");
        assert!(broad.is_broadened());
        assert!(!criteria.is_broadened());
    }

    #[test]
    fn test_validate_difficulty_range() {
        assert!(validate_difficulty(0).is_err());
        assert!(validate_difficulty(1).is_ok());
        assert!(validate_difficulty(5).is_ok());
        assert!(validate_difficulty(6).is_err());
    }

    #[test]
    fn test_schedule_entry_serializes_camel_case() {
        let entry = RepetitionScheduleEntry {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            skill_id: "s1".to_string(),
            repetition_number: 1,
            easiness_factor: 2.5,
            interval_days: 1.0,
            scheduled_date: Utc::now(),
            status: ScheduleStatus::Scheduled,
            performance_rating: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["repetitionNumber"], 1);
        assert_eq!(value["status"], "scheduled");
        // Unrated entries omit the field entirely.
        assert!(value.get("performanceRating").is_none());
    }
}
