//! Argument specifications.
//!
//! A [`CommandArgument`] describes one positional or optional argument with
//! argparse-compatible semantics (action, nargs, const, default, type,
//! choices, required, help, metavar, dest) and is translated into a
//! [`clap::Arg`] for the command's dedicated parser.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use clap::builder::{BoolishValueParser, PossibleValuesParser, ValueParser};
use serde::Deserialize;
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Store,
    StoreTrue,
    StoreFalse,
    StoreConst,
    Append,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    Exactly(usize),
    /// `?`: zero or one value; a bare flag yields the const.
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
}

impl ValueType {
    fn parser(self) -> ValueParser {
        match self {
            ValueType::Str => ValueParser::string(),
            ValueType::Int => ValueParser::new(|s: &str| s.trim().parse::<i64>()),
            ValueType::Float => ValueParser::new(|s: &str| s.trim().parse::<f64>()),
            ValueType::Bool => ValueParser::new(BoolishValueParser::new()),
        }
    }

    /// Convert an already validated raw token.
    fn convert(self, raw: &str) -> Value {
        match self {
            ValueType::Str => Value::String(raw.to_string()),
            ValueType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            ValueType::Bool => parse_boolish(raw)
                .map(Value::Bool)
                .unwrap_or_else(|| Value::String(raw.to_string())),
        }
    }
}

fn parse_boolish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandArgument {
    flags: Vec<String>,
    action: Action,
    nargs: Option<Nargs>,
    constant: Option<Value>,
    default: Option<Value>,
    value_type: ValueType,
    choices: Vec<String>,
    required: Option<bool>,
    help: Option<String>,
    metavar: Option<String>,
    dest: Option<String>,
}

impl CommandArgument {
    /// `name_or_flag` is either a positional name (`"a"`) or a flag
    /// (`"--name"`, `"-n"`).
    pub fn new(name_or_flag: impl Into<String>) -> Self {
        Self {
            flags: vec![name_or_flag.into()],
            action: Action::default(),
            nargs: None,
            constant: None,
            default: None,
            value_type: ValueType::default(),
            choices: Vec::new(),
            required: None,
            help: None,
            metavar: None,
            dest: None,
        }
    }

    /// Add another spelling of an optional flag, e.g. `-n` for `--name`.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(value.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn choices<I, T>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.choices = choices.into_iter().map(|c| c.to_string()).collect();
        self
    }

    /// Only honored for optionals.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Only honored for optionals.
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn is_positional(&self) -> bool {
        !self.flags.first().is_some_and(|f| f.starts_with('-'))
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Key under which the parsed value is stored.
    pub fn destination(&self) -> String {
        if self.is_positional() {
            return self.flags.first().cloned().unwrap_or_default();
        }
        if let Some(dest) = &self.dest {
            return dest.clone();
        }
        let flag = self
            .flags
            .iter()
            .find(|f| f.starts_with("--"))
            .or_else(|| self.flags.first())
            .map(String::as_str)
            .unwrap_or_default();
        flag.trim_start_matches('-').replace('-', "_")
    }

    fn takes_values(&self) -> bool {
        matches!(self.action, Action::Store | Action::Append)
    }

    pub(crate) fn to_arg(&self) -> Arg {
        self.to_arg_as(self.destination())
    }

    /// Build the clap argument under parser id `id`.
    ///
    /// Arguments sharing a destination need distinct ids; the value name
    /// shown in usage stays the destination.
    pub(crate) fn to_arg_as(&self, id: String) -> Arg {
        let mut arg = Arg::new(id);

        if !self.is_positional() {
            let mut has_long = false;
            let mut has_short = false;
            for flag in &self.flags {
                if let Some(long) = flag.strip_prefix("--") {
                    arg = if has_long {
                        arg.visible_alias(long.to_string())
                    } else {
                        arg.long(long.to_string())
                    };
                    has_long = true;
                } else if let Some(short) = flag.strip_prefix('-') {
                    let mut chars = short.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => {
                            arg = if has_short {
                                arg.visible_short_alias(c)
                            } else {
                                arg.short(c)
                            };
                            has_short = true;
                        }
                        // Single-dash long names (`-foo`) are spelled `--foo`.
                        _ => {
                            arg = if has_long {
                                arg.visible_alias(short.to_string())
                            } else {
                                arg.long(short.to_string())
                            };
                            has_long = true;
                        }
                    }
                }
            }
        }

        arg = match self.action {
            Action::Store => arg.action(ArgAction::Set),
            Action::Append => arg.action(ArgAction::Append),
            Action::StoreTrue | Action::StoreConst => arg.action(ArgAction::SetTrue),
            Action::StoreFalse => arg.action(ArgAction::SetFalse),
            Action::Count => arg.action(ArgAction::Count),
        };

        if self.takes_values() {
            arg = match self.nargs {
                None => arg.num_args(1),
                Some(Nargs::Exactly(n)) => arg.num_args(n),
                Some(Nargs::Optional) => arg.num_args(0..=1),
                Some(Nargs::ZeroOrMore) => arg.num_args(0..),
                Some(Nargs::OneOrMore) => arg.num_args(1..),
            };
            arg = if self.choices.is_empty() {
                arg.value_parser(self.value_type.parser())
            } else {
                arg.value_parser(PossibleValuesParser::new(self.choices.clone()))
            };
            if matches!(self.value_type, ValueType::Int | ValueType::Float) {
                arg = arg.allow_negative_numbers(true);
            }
            arg = arg.value_name(
                self.metavar
                    .clone()
                    .unwrap_or_else(|| self.destination()),
            );
        }

        let required = if self.is_positional() {
            self.default.is_none()
                && !matches!(self.nargs, Some(Nargs::Optional | Nargs::ZeroOrMore))
        } else {
            self.required.unwrap_or(false)
        };
        arg = arg.required(required);

        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        arg
    }

    pub(crate) fn extract(&self, matches: &ArgMatches) -> Value {
        self.extract_as(matches, &self.destination())
    }

    /// Whether the user passed this argument on the command line.
    pub(crate) fn given_as(&self, matches: &ArgMatches, id: &str) -> bool {
        matches.value_source(id) == Some(ValueSource::CommandLine)
    }

    pub(crate) fn extract_as(&self, matches: &ArgMatches, id: &str) -> Value {
        let given = self.given_as(matches, id);
        let fallback = || self.default.clone().unwrap_or(Value::Null);

        match self.action {
            Action::StoreTrue if !given => self.default.clone().unwrap_or(Value::Bool(false)),
            Action::StoreTrue => Value::Bool(true),
            Action::StoreFalse if !given => self.default.clone().unwrap_or(Value::Bool(true)),
            Action::StoreFalse => Value::Bool(false),
            Action::StoreConst if !given => fallback(),
            Action::StoreConst => self.constant.clone().unwrap_or(Value::Null),
            Action::Count if !given => fallback(),
            Action::Count => Value::from(matches.get_count(id)),
            Action::Store
                if !given
                    && self.default.is_none()
                    && self.is_positional()
                    && self.nargs == Some(Nargs::ZeroOrMore) =>
            {
                Value::Array(Vec::new())
            }
            Action::Store | Action::Append if !given => fallback(),
            Action::Store | Action::Append => {
                let values: Vec<Value> = matches
                    .get_raw(id)
                    .map(|raw| {
                        raw.map(|v| self.value_type.convert(&v.to_string_lossy()))
                            .collect()
                    })
                    .unwrap_or_default();
                match (self.action, self.nargs) {
                    (Action::Append, _) => Value::Array(values),
                    (_, None) => values.into_iter().next().unwrap_or(Value::Null),
                    (_, Some(Nargs::Optional)) => values
                        .into_iter()
                        .next()
                        .or_else(|| self.constant.clone())
                        .unwrap_or(Value::Null),
                    (_, Some(_)) => Value::Array(values),
                }
            }
        }
    }
}

impl From<&str> for CommandArgument {
    fn from(name_or_flag: &str) -> Self {
        CommandArgument::new(name_or_flag)
    }
}
