//! Command registry and per-command parsers.

use std::collections::HashMap;
use std::sync::Arc;

use clap::builder::styling::{AnsiColor, Styles};
use clap::ColorChoice;
use tracing::debug;

use crate::command::Command;
use crate::kwargs::Kwargs;

/// A command as stored by an application.
pub struct RegisteredCommand<S> {
    command: Arc<Command<S>>,
    deprecated: bool,
    parser: clap::Command,
}

impl<S> Clone for RegisteredCommand<S> {
    fn clone(&self) -> Self {
        Self {
            command: Arc::clone(&self.command),
            deprecated: self.deprecated,
            parser: self.parser.clone(),
        }
    }
}

impl<S> RegisteredCommand<S> {
    pub fn command(&self) -> &Arc<Command<S>> {
        &self.command
    }

    /// Effective flag after inheriting the application default.
    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn parser(&self) -> &clap::Command {
        &self.parser
    }

    /// Parse raw tokens into kwargs with this command's parser.
    ///
    /// Arguments sharing a destination fold into one entry: the last one
    /// given on the command line in declaration order, else the first
    /// declared one's default.
    pub fn parse(&self, tokens: &[String]) -> Result<Kwargs, clap::Error> {
        let matches = self.parser.clone().try_get_matches_from(tokens)?;
        let mut kwargs = Kwargs::new();
        for (arg, id) in self.command.arguments().zip(argument_ids(&self.command)) {
            let destination = arg.destination();
            if arg.given_as(&matches, &id) {
                kwargs.insert(destination, arg.extract_as(&matches, &id));
            } else if !kwargs.contains(&destination) {
                kwargs.insert(destination, arg.extract_as(&matches, &id));
            }
        }
        Ok(kwargs)
    }
}

/// Parser ids for the command's arguments, in `Command::arguments` order.
///
/// The destination is the id unless several arguments share it.
fn argument_ids<S>(command: &Command<S>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for arg in command.arguments() {
        *seen.entry(arg.destination()).or_default() += 1;
    }
    command
        .arguments()
        .enumerate()
        .map(|(index, arg)| {
            let destination = arg.destination();
            if seen.get(&destination).copied().unwrap_or(0) > 1 {
                format!("{destination}#{index}")
            } else {
                destination
            }
        })
        .collect()
}

fn styles(color: bool) -> Styles {
    if color {
        Styles::styled()
            .header(AnsiColor::BrightYellow.on_default())
            .usage(AnsiColor::BrightYellow.on_default())
            .literal(AnsiColor::BrightGreen.on_default())
            .placeholder(AnsiColor::BrightGreen.on_default())
    } else {
        Styles::plain()
    }
}

pub(crate) fn build_parser<S>(command: &Command<S>, color: bool) -> clap::Command {
    let mut parser = clap::Command::new(command.name().to_string())
        .no_binary_name(true)
        .disable_version_flag(true)
        .styles(styles(color))
        .color(if color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        });
    if let Some(description) = command.description_text() {
        parser = parser.about(description.to_string());
    }
    if let Some(usage) = command.usage_text() {
        parser = parser.override_usage(usage.to_string());
    }
    for (argument, id) in command.arguments().zip(argument_ids(command)) {
        parser = parser.arg(argument.to_arg_as(id));
    }
    parser
}

/// Commands by name, in registration order.
pub struct CommandRegistry<S> {
    order: Vec<String>,
    entries: HashMap<String, RegisteredCommand<S>>,
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<S> CommandRegistry<S> {
    /// Store `command` and build its parser. An existing name is replaced.
    pub fn register(&mut self, command: Command<S>, default_deprecated: bool, color: bool) {
        let deprecated = command.deprecated_flag().unwrap_or(default_deprecated);
        let parser = build_parser(&command, color);
        let name = command.name().to_string();
        debug!(command = %name, deprecated, "Registering command");
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.insert(
            name,
            RegisteredCommand {
                command: Arc::new(command),
                deprecated,
                parser,
            },
        );
    }

    pub fn resolve(&self, name: &str) -> Option<&RegisteredCommand<S>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Copy every entry of `other` whose name is not taken yet.
    ///
    /// Commands without their own deprecated flag take `default_deprecated`.
    /// Returns the names that were added, in `other`'s order.
    pub fn merge(&mut self, other: &CommandRegistry<S>, default_deprecated: bool) -> Vec<String> {
        let mut added = Vec::new();
        for name in &other.order {
            if self.entries.contains_key(name) {
                continue;
            }
            let Some(entry) = other.entries.get(name) else {
                continue;
            };
            let mut entry = entry.clone();
            if entry.command.deprecated_flag().is_none() {
                entry.deprecated = default_deprecated;
            }
            self.order.push(name.clone());
            self.entries.insert(name.clone(), entry);
            added.push(name.clone());
        }
        added
    }

    /// Rebuild every parser for a new color setting.
    pub fn recolor(&mut self, color: bool) {
        for entry in self.entries.values_mut() {
            entry.parser = build_parser(&entry.command, color);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCommand<S>> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
