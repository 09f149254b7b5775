//! Difficulty Adaptation Controller: a bounded walk on difficulty levels
//! [1,5] driven by a sliding window of recent outcomes, with hysteresis
//! between the success and struggle thresholds. Also owns tiered question
//! selection for a target difficulty.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::types::{DifficultyState, QuestionRef, MAX_DIFFICULTY, MIN_DIFFICULTY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyDecision {
    pub difficulty: u8,
    pub changed: bool,
}

pub fn success_rate(window: &std::collections::VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let correct = window.iter().filter(|outcome| **outcome).count();
    correct as f64 / window.len() as f64
}

/// Next difficulty for the current window, without mutating state. An empty
/// window holds: no data, no change.
pub fn evaluate(state: &DifficultyState, config: &EngineConfig) -> u8 {
    if state.window.is_empty() {
        return state.current_difficulty;
    }

    let rate = success_rate(&state.window);
    if rate >= config.success_threshold && state.current_difficulty < MAX_DIFFICULTY {
        state.current_difficulty + 1
    } else if rate <= config.struggle_threshold && state.current_difficulty > MIN_DIFFICULTY {
        state.current_difficulty - 1
    } else {
        state.current_difficulty
    }
}

/// Push the latest outcome onto the window (evicting the oldest beyond the
/// configured size) and re-evaluate. Difficulty moves by at most one step.
pub fn transition(
    state: &mut DifficultyState,
    outcome: bool,
    config: &EngineConfig,
) -> DifficultyDecision {
    state.window.push_back(outcome);
    while state.window.len() > config.window_size {
        state.window.pop_front();
    }

    let next = evaluate(state, config);
    let changed = next != state.current_difficulty;
    if changed {
        debug!(
            user_id = %state.user_id,
            skill_id = %state.skill_id,
            from = state.current_difficulty,
            to = next,
            rate = success_rate(&state.window),
            "difficulty adjusted"
        );
    }
    state.current_difficulty = next;

    DifficultyDecision {
        difficulty: next,
        changed,
    }
}

/// Select up to `count` questions for a target difficulty: exact matches
/// first, then adjacent (+/- 1) difficulties, then anything left. The pool
/// is shuffled first so repeated sessions do not replay the same items.
pub fn select_questions(pool: &[QuestionRef], target: u8, count: usize) -> Vec<QuestionRef> {
    let mut shuffled: Vec<QuestionRef> = pool.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());

    let mut selected: Vec<QuestionRef> = Vec::with_capacity(count);

    for question in &shuffled {
        if selected.len() >= count {
            return selected;
        }
        if question.difficulty == target {
            selected.push(question.clone());
        }
    }

    for question in &shuffled {
        if selected.len() >= count {
            return selected;
        }
        let gap = question.difficulty.abs_diff(target);
        if gap == 1 && !selected.iter().any(|q| q.id == question.id) {
            selected.push(question.clone());
        }
    }

    for question in &shuffled {
        if selected.len() >= count {
            break;
        }
        if !selected.iter().any(|q| q.id == question.id) {
            selected.push(question.clone());
        }
    }

    selected
}
