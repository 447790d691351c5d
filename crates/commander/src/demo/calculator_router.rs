use commander::{Application, Command, CommandArgument, CommandError, Context, Scope, ValueType};

use super::logger::{GetLogger, Logger};
use super::settings::Settings;

pub fn router() -> Application<Settings> {
    Application::router("calculator")
        .provide(GetLogger, Scope::Cached)
        .command(
            Command::new("div", handle_division)
                .description("Divide a between b")
                .positional(CommandArgument::new("a").value_type(ValueType::Float))
                .positional(CommandArgument::new("b").value_type(ValueType::Float))
                .depends::<GetLogger>(),
        )
}

async fn handle_division(ctx: Context<Settings>) -> Result<i32, CommandError> {
    let a: f64 = ctx.arg("a")?;
    let b: f64 = ctx.arg("b")?;
    let logger: std::sync::Arc<Logger> = ctx.dependency::<GetLogger>()?;
    if b == 0.0 {
        return Err(CommandError::value(format!("cannot divide {a} by zero")));
    }
    logger.info(&format!("Result {a} / {b} = {}", a / b));
    Ok(0)
}
