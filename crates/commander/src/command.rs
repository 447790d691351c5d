//! Commands and their handlers.

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::argument::CommandArgument;
use crate::context::Context;
use crate::depends::{Provider, Scope};
use crate::error::CommandError;

/// What a handler returned.
///
/// Only [`Outcome::Exit`] with a status in `0..=255` replaces the
/// application's exit code; every other outcome leaves it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Exit(i64),
    Value(Value),
    Empty,
}

impl Outcome {
    /// The exit status this outcome sets, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Exit(code) if (0..=255).contains(code) => Some(*code as i32),
            _ => None,
        }
    }
}

impl From<i32> for Outcome {
    fn from(code: i32) -> Self {
        Outcome::Exit(i64::from(code))
    }
}

impl From<i64> for Outcome {
    fn from(code: i64) -> Self {
        Outcome::Exit(code)
    }
}

impl From<u8> for Outcome {
    fn from(code: u8) -> Self {
        Outcome::Exit(i64::from(code))
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Empty
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl<T: Into<Outcome>> From<Option<T>> for Outcome {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Outcome::Empty)
    }
}

pub type HandlerResult = Result<Outcome, CommandError>;

#[async_trait]
pub trait CommandHandler<S>: Send + Sync + 'static {
    async fn call(&self, ctx: Context<S>) -> HandlerResult;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<S, F, Fut, R> CommandHandler<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(Context<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, CommandError>> + Send + 'static,
    R: Into<Outcome>,
{
    async fn call(&self, ctx: Context<S>) -> HandlerResult {
        (self)(ctx).await.map(Into::into)
    }
}

/// Adapter for synchronous handler functions.
pub struct Blocking<F>(pub F);

/// Wrap a synchronous `Fn(Context<S>) -> Result<R, CommandError>`.
pub fn blocking<F>(handler: F) -> Blocking<F> {
    Blocking(handler)
}

#[async_trait]
impl<S, F, R> CommandHandler<S> for Blocking<F>
where
    S: Send + Sync + 'static,
    F: Fn(Context<S>) -> Result<R, CommandError> + Send + Sync + 'static,
    R: Into<Outcome>,
{
    async fn call(&self, ctx: Context<S>) -> HandlerResult {
        (self.0)(ctx).map(Into::into)
    }

    fn name(&self) -> &str {
        std::any::type_name::<F>()
    }
}

/// A provider reference declared by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyRef {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) scope: Option<Scope>,
}

impl DependencyRef {
    pub fn of<S, P: Provider<S>>(scope: Option<Scope>) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
            scope,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A named CLI subcommand bound to a handler.
pub struct Command<S> {
    name: String,
    handler: Arc<dyn CommandHandler<S>>,
    positionals: Vec<CommandArgument>,
    optionals: Vec<CommandArgument>,
    dependencies: Vec<DependencyRef>,
    deprecated: Option<bool>,
    description: Option<String>,
    usage: Option<String>,
    ignore_hooks: bool,
    ignore_middleware: bool,
}

impl<S: Send + Sync + 'static> Command<S> {
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: CommandHandler<S>,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            positionals: Vec::new(),
            optionals: Vec::new(),
            dependencies: Vec::new(),
            deprecated: None,
            description: None,
            usage: None,
            ignore_hooks: false,
            ignore_middleware: false,
        }
    }

    pub fn positional(mut self, argument: impl Into<CommandArgument>) -> Self {
        self.positionals.push(argument.into());
        self
    }

    pub fn optional(mut self, argument: impl Into<CommandArgument>) -> Self {
        self.optionals.push(argument.into());
        self
    }

    /// Declare a dependency resolved with the provider's registered scope.
    pub fn depends<P: Provider<S>>(mut self) -> Self {
        self.dependencies.push(DependencyRef::of::<S, P>(None));
        self
    }

    /// Declare a dependency with an explicit scope for this reference.
    pub fn depends_scoped<P: Provider<S>>(mut self, scope: Scope) -> Self {
        self.dependencies.push(DependencyRef::of::<S, P>(Some(scope)));
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Run only internal hooks around this command.
    pub fn ignore_hooks(mut self) -> Self {
        self.ignore_hooks = true;
        self
    }

    pub fn ignore_middleware(mut self) -> Self {
        self.ignore_middleware = true;
        self
    }
}

impl<S> Command<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler<S>> {
        &self.handler
    }

    pub fn positionals(&self) -> &[CommandArgument] {
        &self.positionals
    }

    pub fn optionals(&self) -> &[CommandArgument] {
        &self.optionals
    }

    pub fn arguments(&self) -> impl Iterator<Item = &CommandArgument> {
        self.optionals.iter().chain(self.positionals.iter())
    }

    pub fn dependencies(&self) -> &[DependencyRef] {
        &self.dependencies
    }

    /// The command's own flag; `None` inherits from the application.
    pub fn deprecated_flag(&self) -> Option<bool> {
        self.deprecated
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn usage_text(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn ignores_hooks(&self) -> bool {
        self.ignore_hooks
    }

    pub fn ignores_middleware(&self) -> bool {
        self.ignore_middleware
    }
}

impl<S: 'static> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("handler", &self.handler.name())
            .field("positionals", &self.positionals)
            .field("optionals", &self.optionals)
            .field("dependencies", &self.dependencies)
            .field("deprecated", &self.deprecated)
            .field("ignore_hooks", &self.ignore_hooks)
            .field("ignore_middleware", &self.ignore_middleware)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_outcome_exit_code_in_range() {
        assert_eq!(Outcome::Exit(0).exit_code(), Some(0));
        assert_eq!(Outcome::Exit(255).exit_code(), Some(255));
    }

    #[test]
    fn test_outcome_exit_code_out_of_range() {
        assert_eq!(Outcome::Exit(-1).exit_code(), None);
        assert_eq!(Outcome::Exit(256).exit_code(), None);
    }

    #[test]
    fn test_non_integer_outcomes_have_no_exit_code() {
        assert_eq!(Outcome::Value(json!(3)).exit_code(), None);
        assert_eq!(Outcome::Empty.exit_code(), None);
        assert_eq!(Outcome::from(None::<i32>), Outcome::Empty);
        assert_eq!(Outcome::from(Some(4)), Outcome::Exit(4));
    }

    #[test]
    fn test_debug_names_handler() {
        let cmd: Command<()> = Command::new(
            "noop",
            blocking(|_ctx: Context<()>| Ok::<_, CommandError>(())),
        );
        let debug = format!("{cmd:?}");
        assert!(debug.starts_with("Command {"));
        assert!(debug.contains("\"noop\""));
    }

    #[test]
    fn test_builder_sets_flags() {
        let handler = blocking(|_ctx: Context<()>| Ok::<_, CommandError>(0));
        let cmd: Command<()> = Command::new("eval", handler)
            .description("Evaluate")
            .positional("command")
            .optional("--timeout")
            .ignore_hooks();
        assert_eq!(cmd.name(), "eval");
        assert_eq!(cmd.description_text(), Some("Evaluate"));
        assert_eq!(cmd.positionals().len(), 1);
        assert_eq!(cmd.optionals().len(), 1);
        assert!(cmd.ignores_hooks());
        assert!(!cmd.ignores_middleware());
        assert_eq!(cmd.deprecated_flag(), None);
    }

    proptest! {
        #[test]
        fn prop_exit_code_only_within_status_range(code in any::<i64>()) {
            let expected = (0..=255).contains(&code).then_some(code as i32);
            prop_assert_eq!(Outcome::Exit(code).exit_code(), expected);
        }
    }
}
