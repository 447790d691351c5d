//! Dispatch errors and their routing taxonomy.
//!
//! Every failure inside the dispatch pipeline is a [`CommandError`]. Its
//! [`ErrorKind`] decides which exception handler receives it: the exact kind
//! first, then each ancestor up to [`ErrorKind::Any`]. Exit codes for errors
//! that escape all handlers follow BSD sysexits.h.

use std::io;

use thiserror::Error;

/// Exit codes based on BSD sysexits.h
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    /// Parser usage failures, matching clap's own status.
    pub const PARSE_ERROR: i32 = 2;
    pub const USAGE: i32 = 64; // EX_USAGE: command line usage error
    pub const SOFTWARE: i32 = 70; // EX_SOFTWARE: internal software error
    pub const IOERR: i32 = 74; // EX_IOERR: input/output error
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Missing command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("No provider registered for dependency '{0}'")]
    MissingProvider(&'static str),

    #[error("Dependency '{0}' was not declared by the command")]
    UndeclaredDependency(&'static str),

    #[error("Shared state is not available: {0}")]
    StateUnavailable(String),

    #[error("Invalid argument '{name}': {reason}")]
    Argument { name: String, reason: String },

    #[error("Value error: {0}")]
    Value(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    #[error("Exit requested with status {0}")]
    Exit(i32),

    #[error("Interrupted by signal")]
    Interrupted,
}

/// Fieldless discriminant of [`CommandError`], arranged as a small tree.
///
/// ```text
/// Any
/// ├── Dispatch: UnknownCommand, Dependency, State
/// ├── Runtime:  Argument, Value, Io, Other
/// └── Usage, Exit, Interrupted (never routed to handlers)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Any,
    Dispatch,
    Runtime,
    UnknownCommand,
    Dependency,
    State,
    Argument,
    Value,
    Io,
    Other,
    Usage,
    Exit,
    Interrupted,
}

impl ErrorKind {
    pub fn parent(self) -> Option<ErrorKind> {
        match self {
            ErrorKind::Any => None,
            ErrorKind::Dispatch | ErrorKind::Runtime => Some(ErrorKind::Any),
            ErrorKind::UnknownCommand | ErrorKind::Dependency | ErrorKind::State => {
                Some(ErrorKind::Dispatch)
            }
            ErrorKind::Argument | ErrorKind::Value | ErrorKind::Io | ErrorKind::Other => {
                Some(ErrorKind::Runtime)
            }
            ErrorKind::Usage | ErrorKind::Exit | ErrorKind::Interrupted => Some(ErrorKind::Any),
        }
    }

    /// This kind followed by its ancestors, nearest first.
    pub fn lineage(self) -> impl Iterator<Item = ErrorKind> {
        std::iter::successors(Some(self), |kind| kind.parent())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Any => "any",
            ErrorKind::Dispatch => "dispatch",
            ErrorKind::Runtime => "runtime",
            ErrorKind::UnknownCommand => "unknown_command",
            ErrorKind::Dependency => "dependency",
            ErrorKind::State => "state",
            ErrorKind::Argument => "argument",
            ErrorKind::Value => "value",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
            ErrorKind::Usage => "usage",
            ErrorKind::Exit => "exit",
            ErrorKind::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CommandError {
    /// Wrap any error type as [`CommandError::Other`].
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CommandError::Other(Box::new(err))
    }

    pub fn value(message: impl Into<String>) -> Self {
        CommandError::Value(message.into())
    }

    pub fn argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CommandError::Argument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            CommandError::Usage(_) => ErrorKind::Usage,
            CommandError::MissingProvider(_) | CommandError::UndeclaredDependency(_) => {
                ErrorKind::Dependency
            }
            CommandError::StateUnavailable(_) => ErrorKind::State,
            CommandError::Argument { .. } => ErrorKind::Argument,
            CommandError::Value(_) => ErrorKind::Value,
            CommandError::Io(_) => ErrorKind::Io,
            CommandError::Other(_) => ErrorKind::Other,
            CommandError::Exit(_) => ErrorKind::Exit,
            CommandError::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Whether exception handlers may intercept this error.
    ///
    /// Usage errors, explicit exits and interrupts always reach the caller.
    pub fn is_routable(&self) -> bool {
        !matches!(
            self,
            CommandError::Usage(_) | CommandError::Exit(_) | CommandError::Interrupted
        )
    }

    /// Converts to a process exit status for errors that escaped every handler.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Usage(err) => err.exit_code(),
            CommandError::Exit(code) => *code,
            CommandError::Interrupted => exit_codes::SUCCESS,
            CommandError::UnknownCommand(_) => exit_codes::USAGE,
            CommandError::MissingProvider(_)
            | CommandError::UndeclaredDependency(_)
            | CommandError::StateUnavailable(_) => exit_codes::SOFTWARE,
            CommandError::Io(_) => exit_codes::IOERR,
            CommandError::Argument { .. } | CommandError::Value(_) | CommandError::Other(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CommandError::UnknownCommand(_) => {
                Some("Run with --help to list the available commands.".to_string())
            }
            CommandError::MissingProvider(name) => Some(format!(
                "Register the provider with Application::provide({name}) before dispatching."
            )),
            CommandError::UndeclaredDependency(name) => Some(format!(
                "Declare the dependency on the command with .depends::<{name}>()."
            )),
            CommandError::StateUnavailable(_) => Some(
                "Configure shared state with Application::with_state or with_state_factory."
                    .to_string(),
            ),
            CommandError::Argument { .. } => {
                Some("Run '<command> --help' to see the accepted arguments.".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_error_lineage() {
        let lineage: Vec<_> = ErrorKind::Value.lineage().collect();
        assert_eq!(
            lineage,
            vec![ErrorKind::Value, ErrorKind::Runtime, ErrorKind::Any]
        );
    }

    #[test]
    fn test_unknown_command_lineage_goes_through_dispatch() {
        let lineage: Vec<_> = ErrorKind::UnknownCommand.lineage().collect();
        assert_eq!(
            lineage,
            vec![
                ErrorKind::UnknownCommand,
                ErrorKind::Dispatch,
                ErrorKind::Any
            ]
        );
    }

    #[test]
    fn test_any_has_no_parent() {
        assert_eq!(ErrorKind::Any.parent(), None);
        assert_eq!(ErrorKind::Any.lineage().count(), 1);
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            CommandError::UnknownCommand("x".into()).kind(),
            ErrorKind::UnknownCommand
        );
        assert_eq!(
            CommandError::MissingProvider("GetEnvs").kind(),
            ErrorKind::Dependency
        );
        assert_eq!(
            CommandError::from(io::Error::other("disk")).kind(),
            ErrorKind::Io
        );
        assert_eq!(CommandError::value("bad").kind(), ErrorKind::Value);
    }

    #[test]
    fn test_routable() {
        assert!(CommandError::value("bad").is_routable());
        assert!(CommandError::UnknownCommand("x".into()).is_routable());
        assert!(!CommandError::Exit(3).is_routable());
        assert!(!CommandError::Interrupted.is_routable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandError::UnknownCommand("x".into()).exit_code(), 64);
        assert_eq!(CommandError::MissingProvider("P").exit_code(), 70);
        assert_eq!(CommandError::from(io::Error::other("x")).exit_code(), 74);
        assert_eq!(CommandError::Exit(9).exit_code(), 9);
        assert_eq!(CommandError::Interrupted.exit_code(), 0);
        assert_eq!(CommandError::value("x").exit_code(), 1);
    }

    #[test]
    fn test_unknown_command_message_and_suggestion() {
        let err = CommandError::UnknownCommand("nope".into());
        assert_eq!(err.to_string(), "Missing command: nope");
        assert!(err.suggestion().unwrap_or_default().contains("--help"));
    }

    #[test]
    fn test_other_wraps_source() {
        let err = CommandError::other(io::Error::other("boom"));
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.to_string(), "boom");
    }
}
