use thiserror::Error;

/// Failures at the persistence seam. The in-memory store never raises one,
/// but the trait contract keeps room for real backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("schedule entry not found: {0}")]
    EntryNotFound(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// No responses recorded yet. Recoverable: the caller skips scoring.
    #[error("no responses recorded for user {user_id}, skill {skill_id}")]
    InsufficientData { user_id: String, skill_id: String },

    /// Skill id not resolvable by the catalog. Caller-side bug, surfaced loudly.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// Performance rating outside 0-5. Rejected before any state mutation.
    #[error("performance rating {0} outside the 0-5 range")]
    InvalidRating(u8),

    /// Difficulty outside 1-5. Same policy as ratings: no partial writes.
    #[error("difficulty level {0} outside the 1-5 range")]
    InvalidDifficulty(u8),

    #[error(transparent)]
    Store(#[from] StoreError),
}
