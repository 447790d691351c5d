//! The application object: registration API and the dispatch pipeline.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

use commander_common::{rwlock_read_or_recover, rwlock_write_or_recover};
use tracing::debug;

use crate::command::{blocking, Command, Outcome};
use crate::config::AppConfig;
use crate::context::Context;
use crate::depends::{DependencyCache, Provider, Providers, Resolver, Scope};
use crate::error::{CommandError, ErrorKind};
use crate::exception::{ExceptionHandler, ExceptionHandlers, Failure};
use crate::help::{is_builtin, HelpPage, BUILTIN_COMMANDS};
use crate::hooks::{Hook, HookContext, HookSelection, Hooks, Phase};
use crate::kwargs::Kwargs;
use crate::middleware::{Middleware, MiddlewareChain, Position};
use crate::registry::CommandRegistry;
use crate::state::StateCell;

/// A command-line application.
///
/// Registration happens through builder methods (or their `add_*`
/// counterparts) before the first dispatch. A router is just another
/// `Application` merged into a parent with [`Application::include_router`].
pub struct Application<S> {
    config: AppConfig,
    registry: CommandRegistry<S>,
    before: MiddlewareChain<S>,
    after: MiddlewareChain<S>,
    exception_handlers: ExceptionHandlers<S>,
    hooks: Hooks<S>,
    providers: Providers<S>,
    cache: DependencyCache,
    state: StateCell<S>,
    help: Arc<RwLock<HelpPage>>,
    exit_code: AtomicI32,
}

impl<S: Default + Send + Sync + 'static> Default for Application<S> {
    fn default() -> Self {
        Self::new(AppConfig::default()).with_state(S::default())
    }
}

impl<S: Send + Sync + 'static> Application<S> {
    pub fn new(config: AppConfig) -> Self {
        let help = Arc::new(RwLock::new(HelpPage::new(
            config.title.clone(),
            config.description.clone(),
            config.color,
        )));
        let mut app = Self {
            registry: CommandRegistry::default(),
            before: MiddlewareChain::default(),
            after: MiddlewareChain::default(),
            exception_handlers: ExceptionHandlers::default(),
            hooks: Hooks::default(),
            providers: Providers::default(),
            cache: DependencyCache::default(),
            state: StateCell::default(),
            help,
            exit_code: AtomicI32::new(config.default_exit_code),
            config,
        };
        for name in BUILTIN_COMMANDS {
            let command = app.builtin_command(name);
            app.add_command(command);
        }
        app
    }

    /// A router: an application that only exists to be included in another.
    pub fn router(title: impl Into<String>) -> Self {
        Self::new(AppConfig::default().with_title(title))
    }

    fn builtin_command(&self, name: &'static str) -> Command<S> {
        let code = self.config.default_exit_code;
        let command = if matches!(name, "-v" | "--version") {
            let version = self.config.version.clone();
            Command::new(
                name,
                blocking(move |_ctx: Context<S>| {
                    println!("{version}");
                    Ok::<_, CommandError>(code)
                }),
            )
        } else {
            let page = Arc::clone(&self.help);
            Command::new(
                name,
                blocking(move |_ctx: Context<S>| {
                    print!("{}", rwlock_read_or_recover(&page).render());
                    Ok::<_, CommandError>(code)
                }),
            )
        };
        command.deprecated(false).ignore_hooks().ignore_middleware()
    }

    pub fn with_state(mut self, state: S) -> Self {
        self.set_state(state);
        self
    }

    /// Build the state asynchronously during [`Application::initialize`].
    pub fn with_state_factory<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, CommandError>> + Send + 'static,
    {
        self.state = StateCell::with_factory(factory);
        self
    }

    pub fn set_state(&mut self, state: S) {
        self.state = StateCell::ready(state);
    }

    pub fn command(mut self, command: Command<S>) -> Self {
        self.add_command(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = Command<S>>) -> Self {
        self.add_commands(commands);
        self
    }

    pub fn add_commands(&mut self, commands: impl IntoIterator<Item = Command<S>>) {
        for command in commands {
            self.add_command(command);
        }
    }

    pub fn add_command(&mut self, command: Command<S>) {
        rwlock_write_or_recover(&self.help).add(
            None,
            command.name(),
            command.description_text(),
        );
        self.registry
            .register(command, self.config.deprecated, self.config.color);
    }

    pub fn middleware<M: Middleware<S>>(mut self, middleware: M) -> Self {
        self.add_middleware(middleware, Position::Before);
        self
    }

    pub fn after_middleware<M: Middleware<S>>(mut self, middleware: M) -> Self {
        self.add_middleware(middleware, Position::After);
        self
    }

    pub fn add_middleware<M: Middleware<S>>(&mut self, middleware: M, position: Position) {
        match position {
            Position::Before => self.before.push(middleware),
            Position::After => self.after.push(middleware),
        }
    }

    pub fn exception_handler<H: ExceptionHandler<S>>(mut self, kind: ErrorKind, handler: H) -> Self {
        self.add_exception_handler(kind, handler);
        self
    }

    pub fn add_exception_handler<H: ExceptionHandler<S>>(&mut self, kind: ErrorKind, handler: H) {
        self.exception_handlers.insert(kind, handler);
    }

    pub fn on_startup<H: Hook<S>>(mut self, hook: H) -> Self {
        self.add_hook(Phase::Startup, hook, false);
        self
    }

    pub fn on_shutdown<H: Hook<S>>(mut self, hook: H) -> Self {
        self.add_hook(Phase::Shutdown, hook, false);
        self
    }

    pub fn on_cleanup<H: Hook<S>>(mut self, hook: H) -> Self {
        self.add_hook(Phase::Cleanup, hook, false);
        self
    }

    /// Register a hook. Internal hooks still run for commands that ignore hooks.
    pub fn add_hook<H: Hook<S>>(&mut self, phase: Phase, hook: H, internal: bool) {
        self.hooks.push(phase, hook, internal);
    }

    pub fn provide<P: Provider<S>>(mut self, provider: P, scope: Scope) -> Self {
        self.add_provider(provider, scope);
        self
    }

    pub fn add_provider<P: Provider<S>>(&mut self, provider: P, scope: Scope) {
        self.providers.register(provider, scope);
    }

    pub fn include_router(mut self, router: Application<S>) -> Self {
        self.add_router(&router);
        self
    }

    pub fn include_routers(mut self, routers: impl IntoIterator<Item = Application<S>>) -> Self {
        for router in routers {
            self.add_router(&router);
        }
        self
    }

    /// Merge a router into this application.
    ///
    /// Existing command names and providers are kept. Middleware and hooks
    /// are appended. Exception handlers from the router replace those
    /// registered for the same kind.
    pub fn add_router(&mut self, router: &Application<S>) {
        let added = self.registry.merge(&router.registry, self.config.deprecated);
        {
            let mut page = rwlock_write_or_recover(&self.help);
            for name in &added {
                if let Some(entry) = self.registry.resolve(name) {
                    page.add(
                        Some(&router.config.title),
                        name,
                        entry.command().description_text(),
                    );
                }
            }
        }
        self.registry.recolor(self.config.color);
        self.before.extend_from(&router.before);
        self.after.extend_from(&router.after);
        self.exception_handlers.update(&router.exception_handlers);
        self.hooks.extend_from(&router.hooks);
        self.providers.merge(&router.providers);
        debug!(
            router = %router.config.title,
            commands = added.len(),
            "Router included"
        );
    }

    pub fn colorize(&mut self, color: bool) {
        self.config.color = color;
        rwlock_write_or_recover(&self.help).set_color(color);
        self.registry.recolor(color);
    }

    /// Produce the shared state. Runs at most once successfully.
    pub async fn initialize(&self) -> Result<Arc<S>, CommandError> {
        self.state.initialize().await
    }

    pub fn state(&self) -> Result<Arc<S>, CommandError> {
        self.state.get()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    pub fn get_command(&self, name: &str) -> Option<Arc<Command<S>>> {
        self.registry.resolve(name).map(|e| Arc::clone(e.command()))
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn help_page(&self) -> String {
        rwlock_read_or_recover(&self.help).render()
    }

    pub fn dependency_cache(&self) -> &DependencyCache {
        &self.cache
    }

    fn command_from_args(&self, args: &[String]) -> Option<Arc<Command<S>>> {
        args.first()
            .and_then(|name| self.get_command(name))
            .or_else(|| self.get_command(&self.config.default_command))
    }

    pub fn should_ignore_hooks(&self, args: &[String]) -> bool {
        match self.command_from_args(args) {
            Some(command) => command.ignores_hooks(),
            None => true,
        }
    }

    /// Internal hooks are skipped for help and version output.
    pub fn should_ignore_internal_hooks(&self, args: &[String]) -> bool {
        let builtin_flag = args.last().is_some_and(|arg| is_builtin(arg));
        match self.command_from_args(args) {
            None => true,
            Some(command) => {
                builtin_flag || (command.ignores_hooks() && is_builtin(command.name()))
            }
        }
    }

    pub async fn startup(&self, selection: HookSelection) -> Result<(), CommandError> {
        self.run_hooks(Phase::Startup, selection).await
    }

    pub async fn shutdown(&self, selection: HookSelection) -> Result<(), CommandError> {
        self.run_hooks(Phase::Shutdown, selection).await
    }

    pub async fn cleanup(&self, selection: HookSelection) -> Result<(), CommandError> {
        self.run_hooks(Phase::Cleanup, selection).await
    }

    async fn run_hooks(&self, phase: Phase, selection: HookSelection) -> Result<(), CommandError> {
        let state = self.initialize().await?;
        let ctx = HookContext::new(state, self.config.title.clone(), self.exit_code());
        self.hooks.run(phase, &ctx, selection).await
    }

    /// Run one command line through the pipeline.
    ///
    /// Returns `Outcome::Exit` with the application's exit code, or the raw
    /// handler outcome when `override_return` is set. Errors that no
    /// exception handler accepts are returned.
    pub async fn dispatch<I, T>(&self, args: I) -> Result<Outcome, CommandError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let outcome = match self.execute(&args).await {
            Ok(outcome) => outcome,
            Err(CommandError::Exit(code)) => Outcome::Exit(i64::from(code)),
            Err(CommandError::Usage(err)) => {
                if let Err(io_err) = err.print() {
                    debug!(error = %io_err, "Failed to print usage error");
                }
                Outcome::Exit(i64::from(err.exit_code()))
            }
            Err(err) => return Err(err),
        };
        if self.config.override_return {
            return Ok(outcome);
        }
        if let Some(code) = outcome.exit_code() {
            self.exit_code.store(code, Ordering::SeqCst);
        }
        Ok(Outcome::Exit(i64::from(self.exit_code())))
    }

    async fn execute(&self, args: &[String]) -> Result<Outcome, CommandError> {
        let state = self.initialize().await?;
        let (name, tokens) = match args.split_first() {
            Some((name, tokens)) => (name.as_str(), tokens),
            None => (self.config.default_command.as_str(), &[][..]),
        };

        let Some(entry) = self.registry.resolve(name) else {
            debug!(command = name, "Command not found");
            let error = CommandError::UnknownCommand(name.to_string());
            return self.handle_error(error, None, Kwargs::new(), state).await;
        };
        let command = Arc::clone(entry.command());
        debug!(
            command = name,
            handler = command.handler().name(),
            deprecated = entry.deprecated(),
            "Command selected"
        );

        if !tokens.is_empty() {
            debug!(command = name, args = ?tokens, "Resolving args");
        }
        let kwargs = entry.parse(tokens)?;

        match self.run_command(&command, kwargs.clone(), &state).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.handle_error(error, Some(command), kwargs, state)
                    .await
            }
        }
    }

    async fn run_command(
        &self,
        command: &Arc<Command<S>>,
        kwargs: Kwargs,
        state: &Arc<S>,
    ) -> Result<Outcome, CommandError> {
        let resolver = Resolver::new(&self.providers, &self.cache, state);
        let mut dependencies = HashMap::new();
        for dependency in command.dependencies() {
            debug!(
                command = command.name(),
                dependency = dependency.name(),
                "Resolving command dependency"
            );
            let value = resolver.resolve_ref(dependency).await?;
            dependencies.insert(dependency.type_id, value);
        }

        let ctx = Context::new(Arc::clone(command), kwargs, Arc::clone(state), dependencies);
        self.before.run(&ctx).await?;
        debug!(
            command = command.name(),
            kwargs = %ctx.kwargs(),
            "Executing command handler"
        );
        let outcome = command.handler().call(ctx.clone()).await?;
        self.after.run(&ctx).await?;
        Ok(outcome)
    }

    async fn handle_error(
        &self,
        error: CommandError,
        command: Option<Arc<Command<S>>>,
        kwargs: Kwargs,
        state: Arc<S>,
    ) -> Result<Outcome, CommandError> {
        if !error.is_routable() {
            return Err(error);
        }
        let Some((kind, handler)) = self.exception_handlers.lookup(error.kind()) else {
            debug!(error = %error, kind = %error.kind(), "No exception handler matched");
            return Err(error);
        };
        debug!(
            error = %error,
            kind = %error.kind(),
            handler_kind = %kind,
            kwargs = %kwargs,
            "Executing exception handler"
        );
        handler
            .handle(Failure {
                error,
                command,
                kwargs,
                state,
            })
            .await
    }
}
