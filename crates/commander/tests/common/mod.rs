#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use commander::{async_trait, CommandError, Provider, Resolver};

/// The demo binary with deterministic output: no colors, default logging.
pub fn commander_demo_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("commander-demo"));
    cmd.env_remove("RUST_LOG")
        .env_remove("COMMANDER_DEBUG")
        .env_remove("COMMANDER_LOG")
        .env_remove("LOGGER_LEVEL")
        .env("NO_COLOR", "1");
    cmd
}

pub fn argv(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|a| a.to_string()).collect()
}

/// Shared state recording what ran, in order.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
    pub provided: AtomicUsize,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn provided(&self) -> usize {
        self.provided.load(Ordering::SeqCst)
    }
}

pub type SharedJournal = Arc<Journal>;

/// Counts how many times it was asked to build a value.
pub struct Counter;

#[async_trait]
impl Provider<SharedJournal> for Counter {
    type Output = usize;

    async fn provide(&self, resolver: &Resolver<'_, SharedJournal>) -> Result<usize, CommandError> {
        Ok(resolver.state().provided.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
