//! Process runner: hook phases, signals, timeouts and the exit status.

use std::sync::Arc;
use std::time::Duration;

use commander_common::Colors;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::Application;
use crate::error::{exit_codes, CommandError};
use crate::hooks::HookSelection;
use crate::signals::SignalHandler;

const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Turn SIGINT/SIGTERM into a graceful exit (unix only).
    pub handle_signals: bool,
    /// Arguments without the program name. `None` reads the process args.
    pub argv: Option<Vec<String>>,
    /// Terminate the process with the final exit code.
    pub exit_process: bool,
    pub timeout: Option<Duration>,
    pub timeout_exit_code: i32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            handle_signals: true,
            argv: None,
            exit_process: false,
            timeout: None,
            timeout_exit_code: exit_codes::GENERAL_ERROR,
        }
    }
}

impl RunOptions {
    pub fn with_argv<I, T>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.argv = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_signals(mut self, handle_signals: bool) -> Self {
        self.handle_signals = handle_signals;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration, exit_code: i32) -> Self {
        self.timeout = Some(timeout);
        self.timeout_exit_code = exit_code;
        self
    }

    pub fn with_exit_process(mut self, exit_process: bool) -> Self {
        self.exit_process = exit_process;
        self
    }
}

/// Drives one application through its lifecycle.
pub struct AppRunner<S> {
    app: Arc<Application<S>>,
    handle_signals: bool,
    signals: Option<SignalHandler>,
}

impl<S: Send + Sync + 'static> AppRunner<S> {
    pub fn new(app: Arc<Application<S>>) -> Self {
        Self {
            app,
            handle_signals: false,
            signals: None,
        }
    }

    pub fn handle_signals(mut self, handle_signals: bool) -> Self {
        self.handle_signals = handle_signals;
        self
    }

    pub fn app(&self) -> &Arc<Application<S>> {
        &self.app
    }

    /// Initialize state, install signal handlers and run startup hooks.
    pub async fn setup(&mut self, selection: HookSelection) -> Result<(), CommandError> {
        self.app.initialize().await?;
        if self.handle_signals && self.signals.is_none() {
            match SignalHandler::install() {
                Ok(handler) => self.signals = Some(handler),
                Err(e) => debug!(error = %e, "Signal handlers not installed"),
            }
        }
        self.app.startup(selection).await
    }

    /// Run shutdown hooks, remove signal handlers, then run cleanup hooks.
    pub async fn cleanup(&mut self, selection: HookSelection) -> Result<(), CommandError> {
        self.app.shutdown(selection).await?;
        self.remove_signals();
        self.app.cleanup(selection).await
    }

    pub fn remove_signals(&mut self) {
        if let Some(handler) = self.signals.take() {
            handler.remove();
        }
    }

    async fn interrupted(&self) {
        match &self.signals {
            Some(handler) => handler.notified().await,
            None => std::future::pending().await,
        }
    }

    /// Dispatch `args` and return the resulting exit code.
    ///
    /// The dispatch is dropped when `timeout` expires or a signal arrives.
    pub async fn dispatch(
        &self,
        args: &[String],
        timeout: Option<Duration>,
        timeout_exit_code: i32,
    ) -> Result<i32, CommandError> {
        let app = &self.app;
        let dispatch = async {
            let outcome = match timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, app.dispatch(args.iter().cloned())).await {
                        Ok(outcome) => outcome?,
                        Err(_) => {
                            warn!(timeout_ms = limit.as_millis() as u64, "Dispatch timed out");
                            return Ok(timeout_exit_code);
                        }
                    }
                }
                None => app.dispatch(args.iter().cloned()).await?,
            };
            Ok::<i32, CommandError>(outcome.exit_code().unwrap_or_else(|| app.exit_code()))
        };

        tokio::select! {
            result = dispatch => result,
            _ = self.interrupted() => {
                info!("Dispatch interrupted");
                Err(CommandError::Interrupted)
            }
        }
    }

    /// The full lifecycle for one command line.
    ///
    /// Commands that ignore hooks only get internal startup hooks and no
    /// shutdown or cleanup phase. Shutdown and cleanup still run after an
    /// interrupted dispatch.
    pub async fn run(&mut self, args: &[String], options: &RunOptions) -> Result<i32, CommandError> {
        let selection = HookSelection {
            all_hooks: !self.app.should_ignore_hooks(args),
            ignore_internal: self.app.should_ignore_internal_hooks(args),
        };
        self.setup(selection).await?;

        let result = self
            .dispatch(args, options.timeout, options.timeout_exit_code)
            .await;
        let finished = if selection.all_hooks {
            self.cleanup(selection).await
        } else {
            self.remove_signals();
            Ok(())
        };

        let code = match result {
            Err(CommandError::Interrupted) => self.app.exit_code(),
            other => other?,
        };
        finished?;
        Ok(code)
    }
}

fn print_error(program: &str, err: &CommandError) {
    eprintln!("{}: {} {}", program, Colors::error("Error:"), err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("{} {}", Colors::dim("Suggestion:"), suggestion);
    }
}

/// Run `app` on a fresh current-thread runtime and return its exit code.
///
/// Must not be called from inside another tokio runtime.
pub fn run_app<S: Send + Sync + 'static>(app: Application<S>, options: RunOptions) -> i32 {
    let code = run_to_completion(app, &options);
    if options.exit_process {
        std::process::exit(code);
    }
    code
}

fn run_to_completion<S: Send + Sync + 'static>(app: Application<S>, options: &RunOptions) -> i32 {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            print_error(app.title(), &CommandError::Io(e));
            return exit_codes::SOFTWARE;
        }
    };

    let args = options
        .argv
        .clone()
        .unwrap_or_else(|| std::env::args().skip(1).collect());
    let app = Arc::new(app);
    let mut runner = AppRunner::new(Arc::clone(&app)).handle_signals(options.handle_signals);

    let result = runtime.block_on(runner.run(&args, options));
    drop(runner);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

    match result {
        Ok(code) => {
            debug!(exit_code = code, "Application finished");
            code
        }
        Err(err) => {
            print_error(app.title(), &err);
            err.exit_code()
        }
    }
}

/// Adapts an application factory to event-driven entry points.
///
/// Each call builds a fresh application with colors off, derives argv
/// from the event with `parser` and runs it without touching signals or
/// terminating the process.
pub struct EventRunner<F, P> {
    factory: F,
    parser: P,
    timeout: Option<Duration>,
    timeout_exit_code: i32,
}

impl<S, F, P> EventRunner<F, P>
where
    S: Send + Sync + 'static,
    F: Fn() -> Application<S>,
    P: Fn(&Value, &Value) -> Vec<String>,
{
    pub fn new(factory: F, parser: P) -> Self {
        Self {
            factory,
            parser,
            timeout: None,
            timeout_exit_code: exit_codes::GENERAL_ERROR,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration, exit_code: i32) -> Self {
        self.timeout = Some(timeout);
        self.timeout_exit_code = exit_code;
        self
    }

    pub fn handle(&self, event: &Value, context: &Value) -> i32 {
        let mut app = (self.factory)();
        app.colorize(false);
        let options = RunOptions {
            handle_signals: false,
            argv: Some((self.parser)(event, context)),
            exit_process: false,
            timeout: self.timeout,
            timeout_exit_code: self.timeout_exit_code,
        };
        run_app(app, options)
    }

    pub fn into_handler(self) -> impl Fn(&Value, &Value) -> i32 {
        move |event: &Value, context: &Value| self.handle(event, context)
    }
}
