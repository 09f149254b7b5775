//! Spaced Repetition Scheduler: SuperMemo-2 interval growth with an
//! easiness-factor floor, lapse resets, and a per-difficulty scaling of the
//! multiplicative branch. Every scheduling decision appends a new entry;
//! prior entries are only ever finalized, never rewritten.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PerformanceRating, RepetitionScheduleEntry, ScheduleStatus};

pub const INITIAL_EASINESS: f64 = 2.5;
/// SM-2 floor: keeps intervals growing even for chronically hard material.
pub const MIN_EASINESS: f64 = 1.3;
const FIRST_INTERVAL_DAYS: f64 = 1.0;
const SECOND_INTERVAL_DAYS: f64 = 6.0;
/// Harder new material (difficulty 4-5) comes back after 12 hours.
const HARD_INITIAL_INTERVAL_DAYS: f64 = 0.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Parameters of the next review, before it is materialized as an entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextReview {
    pub repetition_number: u32,
    pub easiness_factor: f64,
    pub interval_days: f64,
    /// True when poor recall restarted the schedule from the beginning.
    pub is_reset: bool,
}

/// SuperMemo-2 easiness update, floored at 1.3.
pub fn update_easiness(easiness: f64, rating: PerformanceRating) -> f64 {
    let q = f64::from(rating.value());
    let updated = easiness + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
    updated.max(MIN_EASINESS)
}

/// Initial interval for a brand-new item is difficulty-dependent.
pub fn initial_interval(difficulty: u8) -> f64 {
    if difficulty >= 4 {
        HARD_INITIAL_INTERVAL_DAYS
    } else {
        FIRST_INTERVAL_DAYS
    }
}

/// Maps difficulty 1 -> 1.0 down to difficulty 5 -> 0.6: harder material is
/// reviewed sooner relative to its raw SM-2 interval.
pub fn difficulty_factor(difficulty: u8) -> f64 {
    1.0 - f64::from(difficulty.saturating_sub(1)) * 0.1
}

/// Schedule for an item with no prior entry.
pub fn new_item(difficulty: u8) -> NextReview {
    NextReview {
        repetition_number: 1,
        easiness_factor: INITIAL_EASINESS,
        interval_days: initial_interval(difficulty),
        is_reset: false,
    }
}

/// Schedule the next review after a completed repetition. Ratings below 3
/// reset the sequence; the fixed intervals cover the advances to repetition
/// 2 (1 day) and 3 (6 days), after which growth is multiplicative.
pub fn next_review(
    previous: &RepetitionScheduleEntry,
    rating: PerformanceRating,
    difficulty: u8,
) -> NextReview {
    let easiness = update_easiness(previous.easiness_factor, rating);

    if rating.is_lapse() {
        return NextReview {
            repetition_number: 1,
            easiness_factor: easiness,
            interval_days: FIRST_INTERVAL_DAYS,
            is_reset: true,
        };
    }

    let repetition_number = previous.repetition_number + 1;
    let interval_days = match repetition_number {
        0 | 1 | 2 => FIRST_INTERVAL_DAYS,
        3 => SECOND_INTERVAL_DAYS,
        _ => {
            let raw = previous.interval_days * easiness * difficulty_factor(difficulty);
            raw.round().max(1.0)
        }
    };

    NextReview {
        repetition_number,
        easiness_factor: easiness,
        interval_days,
        is_reset: false,
    }
}

pub fn interval_duration(days: f64) -> Duration {
    Duration::milliseconds((days * MILLIS_PER_DAY) as i64)
}

/// Materialize a review as a fresh scheduled entry.
pub fn build_entry(
    user_id: &str,
    skill_id: &str,
    review: &NextReview,
    now: DateTime<Utc>,
) -> RepetitionScheduleEntry {
    RepetitionScheduleEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        skill_id: skill_id.to_string(),
        repetition_number: review.repetition_number,
        easiness_factor: review.easiness_factor,
        interval_days: review.interval_days,
        scheduled_date: now + interval_duration(review.interval_days),
        status: ScheduleStatus::Scheduled,
        performance_rating: None,
        created_at: now,
    }
}
