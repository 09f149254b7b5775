//! Response Aggregator: reduces raw response events into per-skill
//! correctness and point sequences for the downstream components.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ResponseEvent;

/// Reduced view of one (user, skill) response history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAggregate {
    pub correct_count: u32,
    pub total_count: u32,
    pub points_earned: f64,
}

impl SkillAggregate {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn score_percentage(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.correct_count) / f64::from(self.total_count)
    }
}

/// Reduce a response history to its aggregate triple.
pub fn aggregate(events: &[ResponseEvent]) -> SkillAggregate {
    events.iter().fold(SkillAggregate::default(), |mut acc, event| {
        acc.total_count += 1;
        if event.is_correct {
            acc.correct_count += 1;
        }
        acc.points_earned += event.points_earned;
        acc
    })
}

/// Group a mixed event stream by skill. Each skill's events keep their
/// arrival order.
pub fn aggregate_by_skill(events: &[ResponseEvent]) -> HashMap<String, SkillAggregate> {
    let mut out: HashMap<String, SkillAggregate> = HashMap::new();
    for event in events {
        let entry = out.entry(event.skill_id.clone()).or_default();
        entry.total_count += 1;
        if event.is_correct {
            entry.correct_count += 1;
        }
        entry.points_earned += event.points_earned;
    }
    out
}

/// Chronological correctness sequence. The difficulty window is
/// order-sensitive, so events are sorted by answer time before reduction.
pub fn outcome_sequence(events: &[ResponseEvent]) -> Vec<bool> {
    let mut ordered: Vec<&ResponseEvent> = events.iter().collect();
    ordered.sort_by_key(|event| event.answered_at);
    ordered.iter().map(|event| event.is_correct).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn event(skill: &str, correct: bool, points: f64, offset_min: i64) -> ResponseEvent {
        ResponseEvent {
            user_id: "u1".to_string(),
            skill_id: skill.to_string(),
            question_id: format!("q{offset_min}"),
            is_correct: correct,
            points_earned: points,
            difficulty_level: 3,
            answered_at: Utc::now() + Duration::minutes(offset_min),
        }
    }

    #[test]
    fn test_aggregate_counts_and_points() {
        let events = vec![
            event("s1", true, 10.0, 0),
            event("s1", false, 0.0, 1),
            event("s1", true, 5.0, 2),
        ];
        let agg = aggregate(&events);
        assert_eq!(agg.correct_count, 2);
        assert_eq!(agg.total_count, 3);
        assert!((agg.points_earned - 15.0).abs() < f64::EPSILON);
        assert!((agg.score_percentage() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_aggregate() {
        let agg = aggregate(&[]);
        assert!(agg.is_empty());
        assert_eq!(agg.score_percentage(), 0.0);
    }

    #[test]
    fn test_group_by_skill() {
        let events = vec![
            event("s1", true, 10.0, 0),
            event("s2", false, 0.0, 1),
            event("s1", false, 0.0, 2),
        ];
        let grouped = aggregate_by_skill(&events);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["s1"].total_count, 2);
        assert_eq!(grouped["s2"].correct_count, 0);
    }

    #[test]
    fn test_outcome_sequence_sorted_by_time() {
        // Deliberately out of order.
        let events = vec![
            event("s1", false, 0.0, 5),
            event("s1", true, 10.0, 1),
            event("s1", true, 10.0, 3),
        ];
        assert_eq!(outcome_sequence(&events), vec![true, true, false]);
    }
}
