const LOGGER_NAME_ENV: &str = "LOGGER_NAME";
const LOGGER_LEVEL_ENV: &str = "LOGGER_LEVEL";
const DEFAULT_LOGGER_NAME: &str = "commander_demo";
const DEFAULT_LOGGER_LEVEL: &str = "INFO";

/// Shared state for every demo command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub logger_name: String,
    pub logger_level: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            logger_name: lookup(LOGGER_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_LOGGER_NAME.to_string()),
            logger_level: lookup(LOGGER_LEVEL_ENV)
                .unwrap_or_else(|| DEFAULT_LOGGER_LEVEL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let settings = Settings::from_env_with(|_| None);
        assert_eq!(settings.logger_name, "commander_demo");
        assert_eq!(settings.logger_level, "INFO");
    }

    #[test]
    fn test_reads_env() {
        let settings = Settings::from_env_with(|key| match key {
            "LOGGER_NAME" => Some("custom".to_string()),
            "LOGGER_LEVEL" => Some("DEBUG".to_string()),
            _ => None,
        });
        assert_eq!(settings.logger_name, "custom");
        assert_eq!(settings.logger_level, "DEBUG");
    }
}
