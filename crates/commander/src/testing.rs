//! Helpers for driving an application from tests.
//!
//! ```ignore
//! let mut client = TestClient::new(TestCommander::new(app));
//! client.start().await?;
//! assert_eq!(client.handle(["greet:to", "--name", "test"]).await?, 0);
//! client.close().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::app::Application;
use crate::error::{exit_codes, CommandError};
use crate::hooks::HookSelection;
use crate::runner::AppRunner;

/// Runs hooks around any number of dispatches on one application.
pub struct TestCommander<S> {
    runner: AppRunner<S>,
    selection: HookSelection,
    started: bool,
}

impl<S: Send + Sync + 'static> TestCommander<S> {
    pub fn new(app: Application<S>) -> Self {
        Self {
            runner: AppRunner::new(Arc::new(app)),
            selection: HookSelection::ALL,
            started: false,
        }
    }

    pub fn from_factory<F>(factory: F) -> Self
    where
        F: FnOnce() -> Application<S>,
    {
        Self::new(factory())
    }

    /// Restrict which hooks `start` and `close` run.
    pub fn with_hooks(mut self, all_hooks: bool, ignore_internal: bool) -> Self {
        self.selection = HookSelection {
            all_hooks,
            ignore_internal,
        };
        self
    }

    pub fn app(&self) -> &Arc<Application<S>> {
        self.runner.app()
    }

    /// Run startup hooks. A second call is a no-op.
    pub async fn start(&mut self) -> Result<(), CommandError> {
        if self.started {
            return Ok(());
        }
        self.runner.setup(self.selection).await?;
        self.started = true;
        Ok(())
    }

    /// Dispatch `argv` and return the application's exit code.
    ///
    /// When `timeout` expires the dispatch is dropped and
    /// `timeout_exit_code` is returned, or the current exit code if none.
    pub async fn handle<I, T>(
        &self,
        argv: I,
        timeout: Option<Duration>,
        timeout_exit_code: Option<i32>,
    ) -> Result<i32, CommandError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let app = self.app();
        let args: Vec<String> = argv.into_iter().map(Into::into).collect();
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, app.dispatch(args)).await {
                Ok(outcome) => outcome?,
                Err(_) => return Ok(timeout_exit_code.unwrap_or_else(|| app.exit_code())),
            },
            None => app.dispatch(args).await?,
        };
        Ok(outcome.exit_code().unwrap_or_else(|| app.exit_code()))
    }

    /// Run shutdown and cleanup hooks if `start` ran.
    pub async fn close(&mut self) -> Result<(), CommandError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.runner.cleanup(self.selection).await
    }
}

/// Thin client over a [`TestCommander`] with a timeout fallback of 1.
pub struct TestClient<S> {
    commander: TestCommander<S>,
    timeout_exit_code: i32,
}

impl<S: Send + Sync + 'static> TestClient<S> {
    pub fn new(commander: TestCommander<S>) -> Self {
        Self {
            commander,
            timeout_exit_code: exit_codes::GENERAL_ERROR,
        }
    }

    pub fn app(&self) -> &Arc<Application<S>> {
        self.commander.app()
    }

    pub async fn start(&mut self) -> Result<(), CommandError> {
        self.commander.start().await
    }

    pub async fn handle<I, T>(&self, argv: I) -> Result<i32, CommandError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.commander.handle(argv, None, None).await
    }

    pub async fn handle_with_timeout<I, T>(
        &self,
        argv: I,
        timeout: Duration,
    ) -> Result<i32, CommandError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.commander
            .handle(argv, Some(timeout), Some(self.timeout_exit_code))
            .await
    }

    pub async fn close(&mut self) -> Result<(), CommandError> {
        self.commander.close().await
    }
}
