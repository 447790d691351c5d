//! Tracing setup for commander applications.

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_FILE_ENV: &str = "COMMANDER_LOG";
const LOG_FORMAT_ENV: &str = "COMMANDER_LOG_FORMAT";
const LOG_STREAM_ENV: &str = "COMMANDER_LOG_STREAM";

/// Keeps the non-blocking file writer alive. Drop it last.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self { _guard: None }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `default_level`.
///
/// A second call is a no-op and returns a disabled guard.
pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let lookup = |key: &str| std::env::var(key).ok();
    let log_format = log_format_from(lookup);
    let log_stream = log_stream_from(lookup);
    let (writer, guard, ansi) = match log_file_path_from(lookup) {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to open log file {}: {}",
                    path.display(),
                    err
                );
                (
                    BoxMakeWriter::new(std::io::stderr),
                    None,
                    std::io::stderr().is_terminal(),
                )
            }
        },
        None => match log_stream {
            LogStream::Stdout => (
                BoxMakeWriter::new(std::io::stdout),
                None,
                std::io::stdout().is_terminal(),
            ),
            LogStream::Stderr => (
                BoxMakeWriter::new(std::io::stderr),
                None,
                std::io::stderr().is_terminal(),
            ),
        },
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match log_format {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .json()
                .with_writer(writer)
                .finish(),
        ),
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer)
                .finish(),
        ),
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return TelemetryGuard::disabled();
    }

    TelemetryGuard { _guard: guard }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogStream {
    Stderr,
    Stdout,
}

fn log_file_path_from<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(LOG_FILE_ENV)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

fn normalized<F>(lookup: F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|value| value.trim().to_lowercase())
}

fn log_format_from<F>(lookup: F) -> LogFormat
where
    F: Fn(&str) -> Option<String>,
{
    match normalized(lookup, LOG_FORMAT_ENV).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn log_stream_from<F>(lookup: F) -> LogStream
where
    F: Fn(&str) -> Option<String>,
{
    match normalized(lookup, LOG_STREAM_ENV).as_deref() {
        Some("stdout") => LogStream::Stdout,
        _ => LogStream::Stderr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(
            log_format_from(env(&[(LOG_FORMAT_ENV, "JSON ")])),
            LogFormat::Json
        );
        assert_eq!(
            log_format_from(env(&[(LOG_FORMAT_ENV, "text")])),
            LogFormat::Text
        );
    }

    #[test]
    fn test_log_stream_parsing() {
        assert_eq!(
            log_stream_from(env(&[(LOG_STREAM_ENV, "stdout")])),
            LogStream::Stdout
        );
        assert_eq!(
            log_stream_from(env(&[(LOG_STREAM_ENV, "stderr")])),
            LogStream::Stderr
        );
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(log_format_from(env(&[])), LogFormat::Text);
        assert_eq!(log_stream_from(env(&[])), LogStream::Stderr);
        assert_eq!(log_file_path_from(env(&[])), None);
    }

    #[test]
    fn test_blank_log_file_is_ignored() {
        assert_eq!(log_file_path_from(env(&[(LOG_FILE_ENV, "  ")])), None);
        assert_eq!(
            log_file_path_from(env(&[(LOG_FILE_ENV, "/tmp/commander.log")])),
            Some(PathBuf::from("/tmp/commander.log"))
        );
    }
}
