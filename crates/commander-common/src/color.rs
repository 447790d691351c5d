//! ANSI color helpers.
//!
//! Colors are enabled by default and can be switched off process-wide with
//! [`init`] (the `--no-color` style switch) or the `NO_COLOR` environment
//! variable.

use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_DISABLED: AtomicBool = AtomicBool::new(false);

const YELLOW: &str = "\x1b[93m";
const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[00m";

/// Disable colors when `no_color` is set or `NO_COLOR` is present.
pub fn init(no_color: bool) {
    let disabled = no_color || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    COLOR_DISABLED.store(disabled, Ordering::Relaxed);
}

pub fn is_disabled() -> bool {
    COLOR_DISABLED.load(Ordering::Relaxed)
}

pub struct Colors;

impl Colors {
    /// Section headers ("Available commands:", router titles, usage prefix).
    pub fn header(text: &str) -> String {
        paint(text, YELLOW)
    }

    /// Command names in listings.
    pub fn command(text: &str) -> String {
        paint(text, GREEN)
    }

    pub fn success(text: &str) -> String {
        paint(text, GREEN)
    }

    pub fn error(text: &str) -> String {
        paint(text, RED)
    }

    pub fn dim(text: &str) -> String {
        paint(text, DIM)
    }

    pub fn bold(text: &str) -> String {
        paint(text, BOLD)
    }

    /// Like [`Colors::header`] but also gated on a caller preference.
    ///
    /// Used by renderers that carry their own color setting.
    pub fn header_if(text: &str, enabled: bool) -> String {
        paint_if(text, YELLOW, enabled && !is_disabled())
    }

    pub fn command_if(text: &str, enabled: bool) -> String {
        paint_if(text, GREEN, enabled && !is_disabled())
    }
}

fn paint(text: &str, code: &str) -> String {
    paint_if(text, code, !is_disabled())
}

fn paint_if(text: &str, code: &str, enabled: bool) -> String {
    if enabled {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}
