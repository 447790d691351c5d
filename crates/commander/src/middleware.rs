//! Middleware run before and after command handlers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::error::CommandError;

#[async_trait]
pub trait Middleware<S>: Send + Sync + 'static {
    async fn call(&self, ctx: &Context<S>) -> Result<(), CommandError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<S, F, Fut> Middleware<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(Context<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn call(&self, ctx: &Context<S>) -> Result<(), CommandError> {
        (self)(ctx.clone()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

/// Ordered middleware list for one position.
pub struct MiddlewareChain<S> {
    entries: Vec<Arc<dyn Middleware<S>>>,
}

impl<S> Default for MiddlewareChain<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: Send + Sync + 'static> MiddlewareChain<S> {
    pub fn push<M: Middleware<S>>(&mut self, middleware: M) {
        self.entries.push(Arc::new(middleware));
    }

    pub fn extend_from(&mut self, other: &MiddlewareChain<S>) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every middleware in registration order, stopping at the first error.
    pub async fn run(&self, ctx: &Context<S>) -> Result<(), CommandError> {
        if ctx.command().ignores_middleware() {
            debug!(command = ctx.command_name(), "Command middleware ignored");
            return Ok(());
        }
        for middleware in &self.entries {
            debug!(
                command = ctx.command_name(),
                middleware = middleware.name(),
                kwargs = %ctx.kwargs(),
                "Executing middleware"
            );
            middleware.call(ctx).await?;
        }
        Ok(())
    }
}
