//! Exception handlers keyed by error kind.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{Command, HandlerResult, Outcome};
use crate::error::{CommandError, ErrorKind};
use crate::kwargs::Kwargs;

/// A routed error together with what was known when it was raised.
///
/// `command` is `None` when the command itself could not be selected.
pub struct Failure<S> {
    pub error: CommandError,
    pub command: Option<Arc<Command<S>>>,
    pub kwargs: Kwargs,
    pub state: Arc<S>,
}

impl<S> Failure<S> {
    pub fn command_name(&self) -> Option<&str> {
        self.command.as_deref().map(Command::name)
    }
}

impl<S> fmt::Debug for Failure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("error", &self.error)
            .field("command", &self.command_name())
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

#[async_trait]
pub trait ExceptionHandler<S>: Send + Sync + 'static {
    async fn handle(&self, failure: Failure<S>) -> HandlerResult;
}

#[async_trait]
impl<S, F, Fut, R> ExceptionHandler<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(Failure<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, CommandError>> + Send + 'static,
    R: Into<Outcome>,
{
    async fn handle(&self, failure: Failure<S>) -> HandlerResult {
        (self)(failure).await.map(Into::into)
    }
}

pub struct ExceptionHandlers<S> {
    handlers: HashMap<ErrorKind, Arc<dyn ExceptionHandler<S>>>,
}

impl<S> Default for ExceptionHandlers<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S: Send + Sync + 'static> ExceptionHandlers<S> {
    pub fn insert<H: ExceptionHandler<S>>(&mut self, kind: ErrorKind, handler: H) {
        self.handlers.insert(kind, Arc::new(handler));
    }

    /// Copy every entry of `other`, replacing handlers for the same kind.
    pub fn update(&mut self, other: &ExceptionHandlers<S>) {
        for (kind, handler) in &other.handlers {
            self.handlers.insert(*kind, Arc::clone(handler));
        }
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// The handler for `kind`, else for its nearest ancestor.
    pub fn lookup(&self, kind: ErrorKind) -> Option<(ErrorKind, Arc<dyn ExceptionHandler<S>>)> {
        kind.lineage()
            .find_map(|k| self.handlers.get(&k).map(|h| (k, Arc::clone(h))))
    }
}
