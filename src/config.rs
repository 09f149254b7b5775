/// Engine configuration. Defaults match the tuned values of the difficulty
/// controller and can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of recent outcomes considered for a difficulty decision.
    pub window_size: usize,
    /// Success rate at or above which difficulty steps up.
    pub success_threshold: f64,
    /// Success rate at or below which difficulty steps down.
    pub struggle_threshold: f64,
    /// Starting difficulty for a skill with no recorded state.
    pub default_difficulty: u8,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            success_threshold: 0.8,
            struggle_threshold: 0.4,
            default_difficulty: 3,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let window_size = std::env::var("ENGINE_WINDOW_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(defaults.window_size);

        let success_threshold = std::env::var("ENGINE_SUCCESS_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(defaults.success_threshold);

        let struggle_threshold = std::env::var("ENGINE_STRUGGLE_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(defaults.struggle_threshold);

        let default_difficulty = std::env::var("ENGINE_DEFAULT_DIFFICULTY")
            .ok()
            .and_then(|value| value.parse::<u8>().ok())
            .filter(|level| (1..=5).contains(level))
            .unwrap_or(defaults.default_difficulty);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        // Overlapping thresholds would make the controller oscillate; fall
        // back to the defaults rather than accept an unstable pair.
        let (success_threshold, struggle_threshold) = if struggle_threshold >= success_threshold {
            (0.8, 0.4)
        } else {
            (success_threshold, struggle_threshold)
        };

        Self {
            window_size,
            success_threshold,
            struggle_threshold,
            default_difficulty,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.window_size, 5);
        assert_eq!(config.default_difficulty, 3);
        assert!(config.struggle_threshold < config.success_threshold);
    }
}
