use std::str::FromStr;

use commander::{async_trait, CommandError, Provider, Resolver};
use tracing::Level;

use super::settings::Settings;

/// A named logger with its own threshold, emitting through `tracing`.
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    level: Level,
}

impl Logger {
    pub fn new(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn info(&self, message: &str) {
        if self.enabled(Level::INFO) {
            tracing::info!(logger = %self.name, "{message}");
        }
    }

    pub fn debug(&self, message: &str) {
        if self.enabled(Level::DEBUG) {
            tracing::debug!(logger = %self.name, "{message}");
        }
    }
}

/// Builds the demo [`Logger`] from the shared settings.
pub struct GetLogger;

#[async_trait]
impl Provider<Settings> for GetLogger {
    type Output = Logger;

    async fn provide(&self, resolver: &Resolver<'_, Settings>) -> Result<Logger, CommandError> {
        let settings = resolver.state();
        let level = Level::from_str(&settings.logger_level).map_err(|_| {
            CommandError::argument(
                "LOGGER_LEVEL",
                format!("unknown level '{}'", settings.logger_level),
            )
        })?;
        Ok(Logger::new(settings.logger_name.clone(), level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let logger = Logger::new("demo", Level::INFO);
        assert!(logger.enabled(Level::ERROR));
        assert!(logger.enabled(Level::INFO));
        assert!(!logger.enabled(Level::DEBUG));
        assert_eq!(logger.name, "demo");
    }
}
