//! Engine facade: one read-modify-write per operation over the injected
//! persistence seam and the read-only collaborators. Components stay
//! independent; they only share the aggregator's output contract.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::benchmark::{self, PeerComparison};
use crate::config::EngineConfig;
use crate::difficulty::{self, DifficultyDecision};
use crate::error::{EngineError, StoreError};
use crate::proficiency;
use crate::scheduler;
use crate::store::EngineStore;
use crate::types::{
    validate_difficulty, CohortCriteria, DifficultyState, PerformanceRating, ProficiencyRecord,
    QuestionRef, RepetitionScheduleEntry, ResponseEvent, ScheduleStatus, SkillInfo,
};

/// Append-only record of answered questions. The engine only reads it.
pub trait ResponseLog: Send + Sync {
    fn responses(&self, user_id: &str, skill_id: &str)
        -> Result<Vec<ResponseEvent>, StoreError>;
}

/// Skill and domain metadata from the content store. Grouping and labeling
/// only, never scoring input.
pub trait SkillCatalog: Send + Sync {
    fn skill(&self, skill_id: &str) -> Option<SkillInfo>;
}

/// Peer lookup for benchmarking, backed by an external profile service.
pub trait CohortProvider: Send + Sync {
    fn peers(&self, user_id: &str, criteria: &CohortCriteria) -> Vec<String>;
}

pub struct MasteryEngine {
    config: EngineConfig,
    store: Arc<dyn EngineStore>,
    response_log: Arc<dyn ResponseLog>,
    catalog: Arc<dyn SkillCatalog>,
    cohorts: Arc<dyn CohortProvider>,
}

impl MasteryEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn EngineStore>,
        response_log: Arc<dyn ResponseLog>,
        catalog: Arc<dyn SkillCatalog>,
        cohorts: Arc<dyn CohortProvider>,
    ) -> Self {
        Self {
            config,
            store,
            response_log,
            catalog,
            cohorts,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recompute the proficiency record for one (user, skill) from the full
    /// response history and upsert it.
    pub fn estimate_proficiency(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<ProficiencyRecord, EngineError> {
        if self.catalog.skill(skill_id).is_none() {
            return Err(EngineError::UnknownSkill(skill_id.to_string()));
        }

        let events = self.response_log.responses(user_id, skill_id)?;
        let aggregate = aggregate::aggregate(&events);
        let existing = self.store.proficiency(user_id, skill_id)?;
        let record = proficiency::estimate(user_id, skill_id, &aggregate, existing, Utc::now())?;
        self.store.upsert_proficiency(&record)?;

        info!(
            user_id,
            skill_id,
            score = record.score,
            mastery_level = record.mastery_level,
            "proficiency updated"
        );
        Ok(record)
    }

    /// Benchmark a user against a peer cohort. Degrades through a broader
    /// cohort to a neutral result; never fails for lack of peers.
    pub fn compare_to_peers(
        &self,
        user_id: &str,
        criteria: &CohortCriteria,
    ) -> Result<PeerComparison, EngineError> {
        let user_records = self.store.proficiencies_for_user(user_id)?;
        if user_records.is_empty() {
            debug!(user_id, "no proficiency records yet; skipping comparison");
            return Ok(PeerComparison::insufficient_data());
        }

        let peer_records = self.cohort_records(user_id, criteria)?;
        if peer_records.is_empty() {
            warn!(user_id, "no peer data after cohort fallback");
            return Ok(PeerComparison::insufficient_data());
        }

        let skills: HashMap<String, SkillInfo> = user_records
            .iter()
            .filter_map(|record| {
                self.catalog
                    .skill(&record.skill_id)
                    .map(|info| (record.skill_id.clone(), info))
            })
            .collect();

        let comparison = benchmark::compare(&user_records, &peer_records, &skills);

        // Successful comparisons land back on the stored records.
        for skill_comparison in &comparison.skills {
            if let Some(record) = user_records
                .iter()
                .find(|record| record.skill_id == skill_comparison.skill_id)
            {
                let mut updated = record.clone();
                updated.benchmark_percentile = skill_comparison.percentile;
                self.store.upsert_proficiency(&updated)?;
            }
        }

        info!(
            user_id,
            percentile = comparison.percentile,
            peer_count = comparison.peer_count,
            "peer comparison computed"
        );
        Ok(comparison)
    }

    fn cohort_records(
        &self,
        user_id: &str,
        criteria: &CohortCriteria,
    ) -> Result<Vec<Vec<ProficiencyRecord>>, EngineError> {
        let mut peer_ids = self.cohorts.peers(user_id, criteria);
        peer_ids.retain(|peer| peer != user_id);

        if peer_ids.is_empty() && !criteria.is_broadened() {
            debug!(user_id, "exact cohort empty; broadening to sector only");
            peer_ids = self.cohorts.peers(user_id, &criteria.broadened());
            peer_ids.retain(|peer| peer != user_id);
        }

        let mut records = Vec::with_capacity(peer_ids.len());
        for peer in &peer_ids {
            let peer_records = self.store.proficiencies_for_user(peer)?;
            if !peer_records.is_empty() {
                records.push(peer_records);
            }
        }
        Ok(records)
    }

    /// Fold the latest outcome into the sliding window and return the next
    /// practice difficulty.
    pub fn next_difficulty(
        &self,
        user_id: &str,
        skill_id: &str,
        latest_outcome: bool,
    ) -> Result<DifficultyDecision, EngineError> {
        let mut state = self
            .store
            .difficulty_state(user_id, skill_id)?
            .unwrap_or_else(|| {
                DifficultyState::new(user_id, skill_id, self.config.default_difficulty)
            });

        let decision = difficulty::transition(&mut state, latest_outcome, &self.config);
        self.store.upsert_difficulty_state(&state)?;
        Ok(decision)
    }

    /// Pick up to `count` questions for a target difficulty from a tagged
    /// candidate pool.
    pub fn select_questions(
        &self,
        pool: &[QuestionRef],
        target_difficulty: u8,
        count: usize,
    ) -> Result<Vec<QuestionRef>, EngineError> {
        validate_difficulty(target_difficulty)?;
        Ok(difficulty::select_questions(pool, target_difficulty, count))
    }

    /// Schedule the next spaced review. With a rating and a prior entry this
    /// finalizes the prior entry (completed, or reset on a lapse) and
    /// appends the successor; otherwise it starts a fresh sequence. All
    /// inputs are validated before any write.
    pub fn schedule_repetition(
        &self,
        user_id: &str,
        skill_id: &str,
        difficulty: u8,
        performance_rating: Option<u8>,
    ) -> Result<RepetitionScheduleEntry, EngineError> {
        validate_difficulty(difficulty)?;
        let rating = performance_rating
            .map(PerformanceRating::try_from)
            .transpose()?;

        let previous = self.store.latest_schedule_entry(user_id, skill_id)?;
        let now = Utc::now();

        let entry = match (previous, rating) {
            (Some(previous), Some(rating)) => {
                let review = scheduler::next_review(&previous, rating, difficulty);
                let final_status = if review.is_reset {
                    ScheduleStatus::Reset
                } else {
                    ScheduleStatus::Completed
                };
                self.store.finalize_schedule_entry(
                    &previous.id,
                    final_status,
                    Some(rating.value()),
                )?;

                let entry = scheduler::build_entry(user_id, skill_id, &review, now);
                self.store.append_schedule_entry(&entry)?;
                info!(
                    user_id,
                    skill_id,
                    repetition = entry.repetition_number,
                    interval_days = entry.interval_days,
                    easiness = entry.easiness_factor,
                    reset = review.is_reset,
                    "repetition scheduled"
                );
                entry
            }
            // No prior entry, or no rating to apply: start a fresh sequence
            // from the difficulty-based initial interval.
            (_, _) => {
                let review = scheduler::new_item(difficulty);
                let entry = scheduler::build_entry(user_id, skill_id, &review, now);
                self.store.append_schedule_entry(&entry)?;
                info!(
                    user_id,
                    skill_id,
                    interval_days = entry.interval_days,
                    "initial repetition scheduled"
                );
                entry
            }
        };

        Ok(entry)
    }

    /// All scheduled entries due now for a user, oldest due first.
    pub fn due_repetitions(
        &self,
        user_id: &str,
    ) -> Result<Vec<RepetitionScheduleEntry>, EngineError> {
        Ok(self.store.due_schedule_entries(user_id, Utc::now())?)
    }
}
