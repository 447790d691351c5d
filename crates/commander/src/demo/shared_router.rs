use commander::{Application, CommandArgument, CommandError, Context, Nargs, ValueType};

use super::settings::Settings;

const SERVE_TIMEOUT_SECS: i64 = 3600 * 8;
const HEALTHCHECK_TIMEOUT_SECS: i64 = 60;

pub fn router() -> Application<Settings> {
    Application::router(commander::config::DEFAULT_TITLE)
        .command(
            commander::Command::new("eval", eval_command)
                .description("Command to evaluate directly on the system. Be very careful!")
                .positional(
                    CommandArgument::new("command").help("The command to run wrapped in quotes"),
                )
                .ignore_hooks(),
        )
        .command(
            commander::Command::new("serve", serve_command)
                .description("Run the application on the development server")
                .optional(
                    CommandArgument::new("--timeout")
                        .value_type(ValueType::Int)
                        .default(SERVE_TIMEOUT_SECS),
                )
                .ignore_hooks(),
        )
        .command(
            commander::Command::new("healthcheck", healthcheck_command)
                .description("Check application health")
                .optional(
                    CommandArgument::new("--fs-tmp")
                        .value_type(ValueType::Bool)
                        .nargs(Nargs::Optional)
                        .constant(true)
                        .default(true),
                )
                .optional(
                    CommandArgument::new("--timeout")
                        .value_type(ValueType::Int)
                        .default(HEALTHCHECK_TIMEOUT_SECS),
                )
                .optional(
                    CommandArgument::new("--wait")
                        .value_type(ValueType::Bool)
                        .nargs(Nargs::Optional)
                        .constant(true),
                )
                .ignore_hooks(),
        )
}

async fn eval_command(ctx: Context<Settings>) -> Result<i32, CommandError> {
    let command: String = ctx.arg("command")?;
    let status = shell(&command).status().await?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(unix)]
fn shell(command: &str) -> tokio::process::Command {
    let mut process = tokio::process::Command::new("sh");
    process.arg("-c").arg(command);
    process
}

#[cfg(not(unix))]
fn shell(command: &str) -> tokio::process::Command {
    let mut process = tokio::process::Command::new("cmd");
    process.arg("/C").arg(command);
    process
}

async fn serve_command(ctx: Context<Settings>) -> Result<i32, CommandError> {
    let timeout: i64 = ctx.arg("timeout")?;
    tracing::info!(timeout, "Serve requested");
    Ok(0)
}

async fn healthcheck_command(ctx: Context<Settings>) -> Result<i32, CommandError> {
    println!("{}", ctx.kwargs().to_json());
    Ok(0)
}
