pub mod aggregate;
pub mod benchmark;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod logging;
pub mod proficiency;
pub mod scheduler;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{CohortProvider, MasteryEngine, ResponseLog, SkillCatalog};
pub use error::{EngineError, StoreError};
pub use store::{EngineStore, MemoryStore};
pub use types::*;
