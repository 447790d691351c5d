use serde::Deserialize;

/// Title that keeps a router's commands in the default help group.
pub const DEFAULT_TITLE: &str = "commander";
const DEFAULT_VERSION: &str = "unknown";
const DEFAULT_COMMAND: &str = "-h";

const DEBUG_ENV: &str = "COMMANDER_DEBUG";
const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub description: String,
    pub version: String,
    pub default_exit_code: i32,
    pub default_command: String,
    /// Applied to commands that do not set their own flag.
    pub deprecated: bool,
    pub color: bool,
    pub debug: bool,
    /// Return the raw handler outcome instead of the exit code.
    pub override_return: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            version: DEFAULT_VERSION.to_string(),
            default_exit_code: 0,
            default_command: DEFAULT_COMMAND.to_string(),
            deprecated: false,
            color: true,
            debug: false,
            override_return: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults adjusted by `COMMANDER_DEBUG` and `NO_COLOR`.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(DEBUG_ENV) {
            config.debug = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            config.color = false;
        }
        config
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_default_exit_code(mut self, code: i32) -> Self {
        self.default_exit_code = code;
        self
    }

    pub fn with_default_command(mut self, name: impl Into<String>) -> Self {
        self.default_command = name.into();
        self
    }

    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_override_return(mut self, override_return: bool) -> Self {
        self.override_return = override_return;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.title, DEFAULT_TITLE);
        assert_eq!(config.version, "unknown");
        assert_eq!(config.default_command, "-h");
        assert_eq!(config.default_exit_code, 0);
        assert!(config.color);
        assert!(!config.override_return);
    }

    #[test]
    fn test_builder_pattern() {
        let config = AppConfig::default()
            .with_title("app")
            .with_version("1.2.3")
            .with_default_exit_code(4)
            .with_default_command("greet:to")
            .with_deprecated(true);

        assert_eq!(config.title, "app");
        assert_eq!(config.version, "1.2.3");
        assert_eq!(config.default_exit_code, 4);
        assert_eq!(config.default_command, "greet:to");
        assert!(config.deprecated);
    }

    #[test]
    fn test_from_env_reads_debug_and_no_color() {
        let lookup = env(&[("COMMANDER_DEBUG", "true"), ("NO_COLOR", "1")]);
        let config = AppConfig::from_env_with(lookup);
        assert!(config.debug);
        assert!(!config.color);
    }

    #[test]
    fn test_empty_no_color_keeps_color() {
        let lookup = env(&[("NO_COLOR", ""), ("COMMANDER_DEBUG", "0")]);
        let config = AppConfig::from_env_with(lookup);
        assert!(config.color);
        assert!(!config.debug);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"title": "app", "override_return": true}"#).unwrap();
        assert_eq!(config.title, "app");
        assert!(config.override_return);
        assert_eq!(config.version, "unknown");
    }
}
