//! Per-invocation context handed to handlers and middleware.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::command::Command;
use crate::depends::{Provider, SharedValue};
use crate::error::CommandError;
use crate::kwargs::Kwargs;

pub struct Context<S> {
    command: Arc<Command<S>>,
    kwargs: Arc<Kwargs>,
    state: Arc<S>,
    dependencies: Arc<HashMap<TypeId, SharedValue>>,
}

impl<S> Clone for Context<S> {
    fn clone(&self) -> Self {
        Self {
            command: Arc::clone(&self.command),
            kwargs: Arc::clone(&self.kwargs),
            state: Arc::clone(&self.state),
            dependencies: Arc::clone(&self.dependencies),
        }
    }
}

impl<S> Context<S> {
    pub(crate) fn new(
        command: Arc<Command<S>>,
        kwargs: Kwargs,
        state: Arc<S>,
        dependencies: HashMap<TypeId, SharedValue>,
    ) -> Self {
        Self {
            command,
            kwargs: Arc::new(kwargs),
            state,
            dependencies: Arc::new(dependencies),
        }
    }

    pub fn command(&self) -> &Command<S> {
        &self.command
    }

    pub fn command_name(&self) -> &str {
        self.command.name()
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Shorthand for `self.kwargs().get(name)`.
    pub fn arg<T: DeserializeOwned>(&self, name: &str) -> Result<T, CommandError> {
        self.kwargs.get(name)
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// The value resolved for provider `P`.
    ///
    /// Only providers declared on the command with `depends` are available.
    pub fn dependency<P: Provider<S>>(&self) -> Result<Arc<P::Output>, CommandError> {
        let name = std::any::type_name::<P>();
        let value = self
            .dependencies
            .get(&TypeId::of::<P>())
            .cloned()
            .ok_or(CommandError::UndeclaredDependency(name))?;
        value
            .downcast::<P::Output>()
            .map_err(|_| CommandError::UndeclaredDependency(name))
    }
}

impl<S> std::fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command.name())
            .field("kwargs", &self.kwargs)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}
