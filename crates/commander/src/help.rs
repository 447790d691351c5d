//! The composed help page shown by `-h` and `--help`.

use std::fmt::Write;

use commander_common::Colors;

use crate::config::DEFAULT_TITLE;

pub const BUILTIN_COMMANDS: [&str; 4] = ["-h", "--help", "-v", "--version"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_COMMANDS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HelpEntry {
    name: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HelpGroup {
    title: String,
    entries: Vec<HelpEntry>,
}

/// Command listing grouped by the router each command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    title: String,
    description: String,
    color: bool,
    default_group: Vec<HelpEntry>,
    routers: Vec<HelpGroup>,
}

impl HelpPage {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: bool) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            default_group: Vec::new(),
            routers: Vec::new(),
        }
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// List a command under `group`, or under the default group when `group`
    /// is `None` or the default title. Re-adding a name updates it in place.
    pub fn add(&mut self, group: Option<&str>, name: &str, description: Option<&str>) {
        if is_builtin(name) {
            return;
        }
        let entry = HelpEntry {
            name: name.to_string(),
            description: description.unwrap_or_default().to_string(),
        };
        if let Some(existing) = self.entry_mut(name) {
            existing.description = entry.description;
            return;
        }
        match group.filter(|g| *g != DEFAULT_TITLE) {
            None => self.default_group.push(entry),
            Some(title) => match self.routers.iter_mut().find(|g| g.title == title) {
                Some(group) => group.entries.push(entry),
                None => self.routers.push(HelpGroup {
                    title: title.to_string(),
                    entries: vec![entry],
                }),
            },
        }
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut HelpEntry> {
        self.default_group
            .iter_mut()
            .chain(self.routers.iter_mut().flat_map(|g| g.entries.iter_mut()))
            .find(|e| e.name == name)
    }

    fn width(&self) -> usize {
        self.default_group
            .iter()
            .chain(self.routers.iter().flat_map(|g| g.entries.iter()))
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0)
            + 2
    }

    fn write_entries(&self, out: &mut String, entries: &[HelpEntry], width: usize) {
        for entry in entries {
            let name = Colors::command_if(&entry.name, self.color);
            if entry.description.is_empty() {
                let _ = writeln!(out, "  {name}");
                continue;
            }
            let _ = writeln!(
                out,
                "  {}{}{}",
                name,
                " ".repeat(width - entry.name.len()),
                entry.description
            );
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}{} [-h] [--version]",
            Colors::header_if("Usage: ", self.color),
            self.title
        );
        if !self.description.is_empty() {
            let _ = writeln!(out, "\n  {}", self.description);
        }

        let width = self.width();
        let _ = writeln!(out, "\n{}", Colors::header_if("Available commands:", self.color));
        self.write_entries(&mut out, &self.default_group, width);
        for group in &self.routers {
            let _ = writeln!(
                out,
                "{}",
                Colors::header_if(&format!(" {}", group.title), self.color)
            );
            self.write_entries(&mut out, &group.entries, width);
        }

        let _ = writeln!(out, "\n{}", Colors::header_if("Options:", self.color));
        out.push_str("  -h, --help     show this help message and exit\n");
        out.push_str("  -v, --version  show program's version number and exit\n");
        out
    }
}
