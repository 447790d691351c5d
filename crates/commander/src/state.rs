//! Typed shared state and its one-time initialization.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::CommandError;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type StateFactory<S> = Arc<dyn Fn() -> BoxFuture<Result<S, CommandError>> + Send + Sync>;

/// Holds the application state once it has been produced.
///
/// State is either given directly or built by an async factory during
/// [`StateCell::initialize`]. A failed factory may be retried.
pub struct StateCell<S> {
    value: OnceCell<Arc<S>>,
    factory: Option<StateFactory<S>>,
}

impl<S> Default for StateCell<S> {
    fn default() -> Self {
        Self {
            value: OnceCell::new(),
            factory: None,
        }
    }
}

impl<S: Send + Sync + 'static> StateCell<S> {
    pub fn ready(state: S) -> Self {
        Self {
            value: OnceCell::new_with(Some(Arc::new(state))),
            factory: None,
        }
    }

    pub fn with_factory<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, CommandError>> + Send + 'static,
    {
        let factory: StateFactory<S> =
            Arc::new(move || -> BoxFuture<Result<S, CommandError>> { Box::pin(factory()) });
        Self {
            value: OnceCell::new(),
            factory: Some(factory),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.value.initialized()
    }

    /// Produce the state if needed. Calling it again is a no-op.
    pub async fn initialize(&self) -> Result<Arc<S>, CommandError> {
        if let Some(state) = self.value.get() {
            return Ok(Arc::clone(state));
        }
        let factory = self.factory.as_ref().ok_or_else(|| {
            CommandError::StateUnavailable("no state or state factory configured".to_string())
        })?;
        let state = self
            .value
            .get_or_try_init(|| async {
                debug!("Resolving application state");
                factory().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(state))
    }

    pub fn get(&self) -> Result<Arc<S>, CommandError> {
        self.value.get().cloned().ok_or_else(|| {
            CommandError::StateUnavailable("state has not been initialized".to_string())
        })
    }
}
