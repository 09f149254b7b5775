//! Proficiency Estimator: turns a response aggregate into a scored,
//! confidence-bounded mastery record for one (user, skill).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::aggregate::SkillAggregate;
use crate::benchmark::NEUTRAL_PERCENTILE;
use crate::error::EngineError;
use crate::types::{ConfidenceInterval, ProficiencyRecord};

/// Two-sided 95% z value.
const WILSON_Z: f64 = 1.959964;
/// Minimum sample size before the Wilson interval is meaningful.
const WILSON_MIN_SAMPLES: u32 = 5;
/// Half-width of the deliberately wide fallback band for small samples.
const FALLBACK_MARGIN: f64 = 20.0;

const STRENGTH_THRESHOLD: f64 = 80.0;
const WEAKNESS_THRESHOLD: f64 = 60.0;

pub fn mastery_level(score: f64) -> u8 {
    if score >= 95.0 {
        5
    } else if score >= 85.0 {
        4
    } else if score >= 70.0 {
        3
    } else if score >= 50.0 {
        2
    } else {
        1
    }
}

/// Wilson score interval for a binomial proportion, scaled to 0-100.
/// More reliable than the normal approximation at small sample sizes.
pub fn wilson_interval(correct: u32, total: u32) -> ConfidenceInterval {
    let n = f64::from(total);
    let p_hat = f64::from(correct) / n;
    let z = WILSON_Z;

    let denom = 1.0 + z * z / n;
    let center = p_hat + z * z / (2.0 * n);
    let margin = z * ((p_hat * (1.0 - p_hat) + z * z / (4.0 * n)) / n).sqrt();

    // At p = 0 and p = 1 center and margin are mathematically equal, but
    // floating-point evaluation can land a few ulps outside the scale.
    ConfidenceInterval {
        low: ((center - margin) / denom * 100.0).max(0.0),
        high: ((center + margin) / denom * 100.0).min(100.0),
    }
}

/// Wide band used below the Wilson sample minimum. A design choice to signal
/// low confidence, not a statistical guarantee.
pub fn fallback_interval(score: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        low: (score - FALLBACK_MARGIN).max(0.0),
        high: (score + FALLBACK_MARGIN).min(100.0),
    }
}

pub fn confidence_interval(aggregate: &SkillAggregate) -> ConfidenceInterval {
    if aggregate.total_count >= WILSON_MIN_SAMPLES {
        wilson_interval(aggregate.correct_count, aggregate.total_count)
    } else {
        fallback_interval(aggregate.score_percentage())
    }
}

/// Recompute the proficiency record from the current aggregate. Upsert
/// semantics: an existing record is mutated in place (id and benchmark
/// percentile preserved, history appended); otherwise a new one is created.
pub fn estimate(
    user_id: &str,
    skill_id: &str,
    aggregate: &SkillAggregate,
    existing: Option<ProficiencyRecord>,
    now: DateTime<Utc>,
) -> Result<ProficiencyRecord, EngineError> {
    if aggregate.is_empty() {
        return Err(EngineError::InsufficientData {
            user_id: user_id.to_string(),
            skill_id: skill_id.to_string(),
        });
    }

    let score = aggregate.score_percentage();
    let interval = confidence_interval(aggregate);
    let level = mastery_level(score);
    let is_strength = score >= STRENGTH_THRESHOLD;
    let is_weakness = score <= WEAKNESS_THRESHOLD;

    let record = match existing {
        Some(mut record) => {
            record.score = score;
            record.confidence_interval = interval;
            record.mastery_level = level;
            record.is_strength = is_strength;
            record.is_weakness = is_weakness;
            record.score_history.push(score);
            record.last_updated = now;
            record
        }
        None => ProficiencyRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            skill_id: skill_id.to_string(),
            score,
            confidence_interval: interval,
            mastery_level: level,
            is_strength,
            is_weakness,
            benchmark_percentile: NEUTRAL_PERCENTILE,
            score_history: vec![score],
            last_updated: now,
        },
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(correct: u32, total: u32) -> SkillAggregate {
        SkillAggregate {
            correct_count: correct,
            total_count: total,
            points_earned: 0.0,
        }
    }

    #[test]
    fn test_mastery_buckets() {
        assert_eq!(mastery_level(100.0), 5);
        assert_eq!(mastery_level(95.0), 5);
        assert_eq!(mastery_level(94.9), 4);
        assert_eq!(mastery_level(85.0), 4);
        assert_eq!(mastery_level(70.0), 3);
        assert_eq!(mastery_level(50.0), 2);
        assert_eq!(mastery_level(49.9), 1);
        assert_eq!(mastery_level(0.0), 1);
    }

    #[test]
    fn test_wilson_interval_brackets_proportion() {
        let interval = wilson_interval(8, 10);
        assert!(interval.low > 0.0 && interval.low < 80.0);
        assert!(interval.high > 80.0 && interval.high < 100.0);
    }

    #[test]
    fn test_wilson_interval_extremes_stay_in_range() {
        let all_correct = wilson_interval(10, 10);
        assert!(all_correct.low >= 0.0);
        assert!(all_correct.high <= 100.0);

        let none_correct = wilson_interval(0, 10);
        assert!(none_correct.low >= 0.0);
        assert!(none_correct.high <= 100.0);
    }

    // The degenerate proportions land exactly on the scale edge; make sure
    // rounding never pushes them past it at any sample size.
    #[test]
    fn test_wilson_interval_edges_never_leave_scale() {
        for total in 5..200 {
            let none_correct = wilson_interval(0, total);
            assert!(
                none_correct.low >= 0.0,
                "low bound {} below scale at n={total}",
                none_correct.low
            );
            let all_correct = wilson_interval(total, total);
            assert!(
                all_correct.high <= 100.0,
                "high bound {} above scale at n={total}",
                all_correct.high
            );
            assert!(none_correct.low <= none_correct.high);
            assert!(all_correct.low <= all_correct.high);
        }
    }

    #[test]
    fn test_fallback_interval_below_sample_minimum() {
        let interval = confidence_interval(&agg(2, 4));
        assert!((interval.low - 30.0).abs() < 1e-9);
        assert!((interval.high - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_interval_clamped_to_scale() {
        let low_score = fallback_interval(10.0);
        assert_eq!(low_score.low, 0.0);
        let high_score = fallback_interval(95.0);
        assert_eq!(high_score.high, 100.0);
    }

    #[test]
    fn test_estimate_rejects_empty_aggregate() {
        let result = estimate("u1", "s1", &agg(0, 0), None, Utc::now());
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }

    // 3 correct of 20 -> 15%, level 1, weakness.
    #[test]
    fn test_low_scorer_flagged_as_weakness() {
        let record = estimate("u1", "s1", &agg(3, 20), None, Utc::now()).unwrap();
        assert!((record.score - 15.0).abs() < 1e-9);
        assert_eq!(record.mastery_level, 1);
        assert!(record.is_weakness);
        assert!(!record.is_strength);
    }

    #[test]
    fn test_strength_and_weakness_mutually_exclusive() {
        for correct in 0..=20 {
            let record = estimate("u1", "s1", &agg(correct, 20), None, Utc::now()).unwrap();
            assert!(!(record.is_strength && record.is_weakness));
        }
    }

    #[test]
    fn test_neither_flag_in_middle_band() {
        // 14/20 = 70%: neither strength (>=80) nor weakness (<=60).
        let record = estimate("u1", "s1", &agg(14, 20), None, Utc::now()).unwrap();
        assert!(!record.is_strength);
        assert!(!record.is_weakness);
    }

    #[test]
    fn test_upsert_preserves_id_and_appends_history() {
        let first = estimate("u1", "s1", &agg(4, 5), None, Utc::now()).unwrap();
        let id = first.id.clone();
        let benchmark = first.benchmark_percentile;

        let second = estimate("u1", "s1", &agg(9, 10), Some(first), Utc::now()).unwrap();
        assert_eq!(second.id, id);
        assert_eq!(second.benchmark_percentile, benchmark);
        assert_eq!(second.score_history.len(), 2);
        assert!((second.score_history[1] - 90.0).abs() < 1e-9);
    }
}
