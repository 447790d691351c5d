//! The demo application shipped as `commander-demo`.

mod calculator_router;
mod logger;
mod settings;
mod shared_router;

use commander::{
    AppConfig, Application, Command, CommandArgument, CommandError, Context, ErrorKind, Failure,
    HookContext,
};

use logger::GetLogger;
use settings::Settings;

const VALUE_ERROR_EXIT_CODE: i32 = 3;

pub fn config() -> AppConfig {
    AppConfig::from_env()
        .with_title("commander-demo")
        .with_description("The sample description")
        .with_version(env!("CARGO_PKG_VERSION"))
}

pub fn app(config: AppConfig) -> Application<Settings> {
    Application::new(config)
        .with_state_factory(|| async { Ok::<_, CommandError>(Settings::from_env()) })
        .command(
            Command::new("greet:to", greet)
                .description("Say hello")
                .optional(CommandArgument::new("--name").default("World!")),
        )
        .middleware(log_before)
        .after_middleware(log_after)
        .on_startup(on_startup)
        .on_cleanup(on_cleanup)
        .exception_handler(ErrorKind::Value, handle_value_error)
        .include_router(shared_router::router())
        .include_router(calculator_router::router())
}

async fn greet(ctx: Context<Settings>) -> Result<i32, CommandError> {
    let name: String = ctx.arg("name")?;
    println!("Hello {name}");
    Ok(0)
}

async fn log_before(ctx: Context<Settings>) -> Result<(), CommandError> {
    tracing::debug!(command = ctx.command_name(), kwargs = %ctx.kwargs(), "Before command");
    if let Ok(logger) = ctx.dependency::<GetLogger>() {
        logger.debug(&format!("Running {}", ctx.command_name()));
    }
    Ok(())
}

async fn log_after(ctx: Context<Settings>) -> Result<(), CommandError> {
    tracing::debug!(command = ctx.command_name(), "After command");
    Ok(())
}

async fn on_startup(ctx: HookContext<Settings>) -> Result<(), CommandError> {
    tracing::debug!(app = ctx.title(), logger = %ctx.state().logger_name, "Startup");
    Ok(())
}

async fn on_cleanup(ctx: HookContext<Settings>) -> Result<(), CommandError> {
    tracing::debug!(app = ctx.title(), exit_code = ctx.exit_code(), "Cleanup");
    Ok(())
}

async fn handle_value_error(failure: Failure<Settings>) -> Result<i32, CommandError> {
    eprintln!(
        "{}: {}",
        failure.command_name().unwrap_or("commander-demo"),
        failure.error
    );
    Ok(VALUE_ERROR_EXIT_CODE)
}
