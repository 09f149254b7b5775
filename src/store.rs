//! Persistence seam. The engine owns no state across invocations; every
//! record lives behind this trait so that difficulty and scheduling
//! decisions are reproducible from stored state alone. Real backends must
//! provide at-most-one-writer-at-a-time per (user, skill); the in-memory
//! reference implementation gets that from whole-map write locks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::types::{DifficultyState, ProficiencyRecord, RepetitionScheduleEntry, ScheduleStatus};

pub trait EngineStore: Send + Sync {
    fn proficiency(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<ProficiencyRecord>, StoreError>;

    fn upsert_proficiency(&self, record: &ProficiencyRecord) -> Result<(), StoreError>;

    fn proficiencies_for_user(&self, user_id: &str) -> Result<Vec<ProficiencyRecord>, StoreError>;

    fn difficulty_state(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<DifficultyState>, StoreError>;

    fn upsert_difficulty_state(&self, state: &DifficultyState) -> Result<(), StoreError>;

    /// Most recently appended entry for the pair, across resets.
    fn latest_schedule_entry(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<RepetitionScheduleEntry>, StoreError>;

    fn append_schedule_entry(&self, entry: &RepetitionScheduleEntry) -> Result<(), StoreError>;

    /// Stamp a final status (and rating) on an entry. The only mutation a
    /// schedule entry ever sees; its parameters stay as appended.
    fn finalize_schedule_entry(
        &self,
        entry_id: &str,
        status: ScheduleStatus,
        rating: Option<u8>,
    ) -> Result<(), StoreError>;

    fn schedule_entries(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Vec<RepetitionScheduleEntry>, StoreError>;

    /// Scheduled entries due at `now`, oldest due first. The ordering is
    /// load-bearing: it sets review priority under backlog.
    fn due_schedule_entries(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RepetitionScheduleEntry>, StoreError>;
}

type PairKey = (String, String);

/// In-memory reference store, primarily for tests and single-process use.
#[derive(Default)]
pub struct MemoryStore {
    proficiencies: RwLock<HashMap<PairKey, ProficiencyRecord>>,
    difficulty_states: RwLock<HashMap<PairKey, DifficultyState>>,
    schedule_entries: RwLock<Vec<RepetitionScheduleEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: &str, skill_id: &str) -> PairKey {
        (user_id.to_string(), skill_id.to_string())
    }
}

impl EngineStore for MemoryStore {
    fn proficiency(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<ProficiencyRecord>, StoreError> {
        Ok(self
            .proficiencies
            .read()
            .get(&Self::key(user_id, skill_id))
            .cloned())
    }

    fn upsert_proficiency(&self, record: &ProficiencyRecord) -> Result<(), StoreError> {
        self.proficiencies
            .write()
            .insert(Self::key(&record.user_id, &record.skill_id), record.clone());
        Ok(())
    }

    fn proficiencies_for_user(&self, user_id: &str) -> Result<Vec<ProficiencyRecord>, StoreError> {
        let mut records: Vec<ProficiencyRecord> = self
            .proficiencies
            .read()
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.skill_id.cmp(&b.skill_id));
        Ok(records)
    }

    fn difficulty_state(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<DifficultyState>, StoreError> {
        Ok(self
            .difficulty_states
            .read()
            .get(&Self::key(user_id, skill_id))
            .cloned())
    }

    fn upsert_difficulty_state(&self, state: &DifficultyState) -> Result<(), StoreError> {
        self.difficulty_states
            .write()
            .insert(Self::key(&state.user_id, &state.skill_id), state.clone());
        Ok(())
    }

    fn latest_schedule_entry(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Option<RepetitionScheduleEntry>, StoreError> {
        Ok(self
            .schedule_entries
            .read()
            .iter()
            .rev()
            .find(|entry| entry.user_id == user_id && entry.skill_id == skill_id)
            .cloned())
    }

    fn append_schedule_entry(&self, entry: &RepetitionScheduleEntry) -> Result<(), StoreError> {
        self.schedule_entries.write().push(entry.clone());
        Ok(())
    }

    fn finalize_schedule_entry(
        &self,
        entry_id: &str,
        status: ScheduleStatus,
        rating: Option<u8>,
    ) -> Result<(), StoreError> {
        let mut entries = self.schedule_entries.write();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| StoreError::EntryNotFound(entry_id.to_string()))?;
        entry.status = status;
        entry.performance_rating = rating;
        Ok(())
    }

    fn schedule_entries(
        &self,
        user_id: &str,
        skill_id: &str,
    ) -> Result<Vec<RepetitionScheduleEntry>, StoreError> {
        Ok(self
            .schedule_entries
            .read()
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.skill_id == skill_id)
            .cloned()
            .collect())
    }

    fn due_schedule_entries(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RepetitionScheduleEntry>, StoreError> {
        let mut due: Vec<RepetitionScheduleEntry> = self
            .schedule_entries
            .read()
            .iter()
            .filter(|entry| {
                entry.user_id == user_id
                    && entry.status == ScheduleStatus::Scheduled
                    && entry.scheduled_date <= now
            })
            .cloned()
            .collect();
        due.sort_by_key(|entry| entry.scheduled_date);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::types::ConfidenceInterval;

    fn record(user: &str, skill: &str) -> ProficiencyRecord {
        ProficiencyRecord {
            id: format!("{user}-{skill}"),
            user_id: user.to_string(),
            skill_id: skill.to_string(),
            score: 50.0,
            confidence_interval: ConfidenceInterval { low: 30.0, high: 70.0 },
            mastery_level: 2,
            is_strength: false,
            is_weakness: true,
            benchmark_percentile: 50,
            score_history: vec![50.0],
            last_updated: Utc::now(),
        }
    }

    fn entry(id: &str, user: &str, skill: &str, due_in_hours: i64) -> RepetitionScheduleEntry {
        let now = Utc::now();
        RepetitionScheduleEntry {
            id: id.to_string(),
            user_id: user.to_string(),
            skill_id: skill.to_string(),
            repetition_number: 1,
            easiness_factor: 2.5,
            interval_days: 1.0,
            scheduled_date: now + Duration::hours(due_in_hours),
            status: ScheduleStatus::Scheduled,
            performance_rating: None,
            created_at: now,
        }
    }

    #[test]
    fn test_proficiency_upsert_replaces_by_pair() {
        let store = MemoryStore::new();
        store.upsert_proficiency(&record("u1", "s1")).unwrap();
        let mut updated = record("u1", "s1");
        updated.score = 80.0;
        store.upsert_proficiency(&updated).unwrap();

        let fetched = store.proficiency("u1", "s1").unwrap().unwrap();
        assert!((fetched.score - 80.0).abs() < 1e-9);
        assert_eq!(store.proficiencies_for_user("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_latest_entry_is_most_recently_appended() {
        let store = MemoryStore::new();
        store.append_schedule_entry(&entry("e1", "u1", "s1", -5)).unwrap();
        store.append_schedule_entry(&entry("e2", "u1", "s1", 5)).unwrap();
        store.append_schedule_entry(&entry("e3", "u1", "s2", 1)).unwrap();

        let latest = store.latest_schedule_entry("u1", "s1").unwrap().unwrap();
        assert_eq!(latest.id, "e2");
    }

    #[test]
    fn test_due_entries_filtered_and_ordered() {
        let store = MemoryStore::new();
        store.append_schedule_entry(&entry("recent", "u1", "s1", -1)).unwrap();
        store.append_schedule_entry(&entry("oldest", "u1", "s2", -48)).unwrap();
        store.append_schedule_entry(&entry("future", "u1", "s3", 48)).unwrap();
        store.append_schedule_entry(&entry("done", "u1", "s4", -72)).unwrap();
        store
            .finalize_schedule_entry("done", ScheduleStatus::Completed, Some(4))
            .unwrap();

        let due = store.due_schedule_entries("u1", Utc::now()).unwrap();
        let ids: Vec<&str> = due.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["oldest", "recent"]);
    }

    #[test]
    fn test_finalize_missing_entry_errors() {
        let store = MemoryStore::new();
        let result = store.finalize_schedule_entry("ghost", ScheduleStatus::Completed, None);
        assert!(matches!(result, Err(StoreError::EntryNotFound(_))));
    }

    #[test]
    fn test_finalize_keeps_parameters() {
        let store = MemoryStore::new();
        store.append_schedule_entry(&entry("e1", "u1", "s1", -1)).unwrap();
        store
            .finalize_schedule_entry("e1", ScheduleStatus::Reset, Some(1))
            .unwrap();

        let entries = store.schedule_entries("u1", "s1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ScheduleStatus::Reset);
        assert_eq!(entries[0].performance_rating, Some(1));
        assert_eq!(entries[0].repetition_number, 1);
        assert!((entries[0].easiness_factor - 2.5).abs() < 1e-9);
    }
}
