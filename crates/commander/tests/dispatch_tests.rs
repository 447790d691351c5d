//! Dispatch pipeline tests driven through the test client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use commander::{
    Action, AppConfig, Application, Command, CommandArgument, CommandError, Context, ErrorKind,
    Failure, HookContext, Nargs, Scope, TestClient, TestCommander, ValueType,
};
use common::{Counter, Journal, SharedJournal};

fn journal() -> SharedJournal {
    Arc::new(Journal::default())
}

fn app_with(journal: &SharedJournal) -> Application<SharedJournal> {
    Application::new(AppConfig::default().with_title("tests")).with_state(Arc::clone(journal))
}

async fn greet(ctx: Context<SharedJournal>) -> Result<i32, CommandError> {
    let name: String = ctx.arg("name")?;
    ctx.state().record(format!("Hello {name}"));
    Ok(0)
}

fn greet_command() -> Command<SharedJournal> {
    Command::new("greet:to", greet).optional(CommandArgument::new("--name").default("World!"))
}

// =============================================================================
// Commands and arguments
// =============================================================================

#[tokio::test]
async fn test_greet_returns_zero() {
    let journal = journal();
    let mut client = TestClient::new(TestCommander::new(
        app_with(&journal).command(greet_command()),
    ));
    client.start().await.unwrap();

    assert_eq!(client.handle(["greet:to", "--name", "test"]).await.unwrap(), 0);
    assert_eq!(client.handle(["greet:to"]).await.unwrap(), 0);
    assert_eq!(journal.entries(), vec!["Hello test", "Hello World!"]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_argv_runs_default_command() {
    let client = TestClient::new(TestCommander::new(app_with(&journal())));
    assert_eq!(client.handle(Vec::<String>::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_typed_positionals_reach_handler() {
    let journal = journal();
    let app = app_with(&journal).command(
        Command::new("add", |ctx: Context<SharedJournal>| async move {
            let a: i64 = ctx.arg("a")?;
            let b: i64 = ctx.arg("b")?;
            ctx.state().record(format!("{}", a + b));
            Ok::<_, CommandError>(0)
        })
        .positional(CommandArgument::new("a").value_type(ValueType::Int))
        .positional(CommandArgument::new("b").value_type(ValueType::Int)),
    );
    let client = TestClient::new(TestCommander::new(app));

    assert_eq!(client.handle(["add", "2", "-5"]).await.unwrap(), 0);
    assert_eq!(journal.entries(), vec!["-3"]);
}

#[tokio::test]
async fn test_flags_sharing_a_destination() {
    let journal = journal();
    let app = app_with(&journal).command(
        Command::new("mode", |ctx: Context<SharedJournal>| async move {
            let mode: String = ctx.arg("mode")?;
            let files: Vec<String> = ctx.arg("files")?;
            ctx.state().record(format!("{mode}:{}", files.len()));
            Ok::<_, CommandError>(0)
        })
        .optional(
            CommandArgument::new("--fast")
                .action(Action::StoreConst)
                .constant("fast")
                .default("normal")
                .dest("mode"),
        )
        .optional(
            CommandArgument::new("--slow")
                .action(Action::StoreConst)
                .constant("slow")
                .dest("mode"),
        )
        .positional(CommandArgument::new("files").nargs(Nargs::ZeroOrMore)),
    );
    let client = TestClient::new(TestCommander::new(app));

    assert_eq!(client.handle(["mode", "--slow"]).await.unwrap(), 0);
    assert_eq!(client.handle(["mode"]).await.unwrap(), 0);
    assert_eq!(client.handle(["mode", "--fast", "a", "b"]).await.unwrap(), 0);
    assert_eq!(journal.entries(), vec!["slow:0", "normal:0", "fast:2"]);
}

#[tokio::test]
async fn test_parse_failure_exits_with_usage_status() {
    let app = app_with(&journal()).command(
        Command::new("count", |_ctx: Context<SharedJournal>| async {
            Ok::<_, CommandError>(0)
        })
        .positional(CommandArgument::new("n").value_type(ValueType::Int)),
    );
    let client = TestClient::new(TestCommander::new(app));
    assert_eq!(client.handle(["count", "many"]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_out_of_range_return_keeps_previous_code() {
    let app = app_with(&journal())
        .command(Command::new("five", |_ctx: Context<SharedJournal>| async {
            Ok::<_, CommandError>(5)
        }))
        .command(Command::new("huge", |_ctx: Context<SharedJournal>| async {
            Ok::<_, CommandError>(256)
        }))
        .command(Command::new("nothing", |_ctx: Context<SharedJournal>| async {
            Ok::<_, CommandError>(())
        }));
    let client = TestClient::new(TestCommander::new(app));

    assert_eq!(client.handle(["five"]).await.unwrap(), 5);
    assert_eq!(client.handle(["huge"]).await.unwrap(), 5);
    assert_eq!(client.handle(["nothing"]).await.unwrap(), 5);
}

// =============================================================================
// Exception routing
// =============================================================================

async fn fail_with_value(_ctx: Context<SharedJournal>) -> Result<i32, CommandError> {
    Err(CommandError::value("bad input"))
}

#[tokio::test]
async fn test_value_error_routed_to_handler() {
    let journal = journal();
    let app = app_with(&journal)
        .command(Command::new("fail", fail_with_value))
        .exception_handler(ErrorKind::Value, |failure: Failure<SharedJournal>| async move {
            failure.state.record(format!(
                "{} in {}",
                failure.error,
                failure.command_name().unwrap_or("?")
            ));
            Ok::<_, CommandError>(3)
        });
    let client = TestClient::new(TestCommander::new(app));

    assert_eq!(client.handle(["fail"]).await.unwrap(), 3);
    assert_eq!(journal.entries(), vec!["Value error: bad input in fail"]);
}

#[tokio::test]
async fn test_ancestor_handler_catches_error() {
    let app = app_with(&journal())
        .command(Command::new("fail", fail_with_value))
        .exception_handler(ErrorKind::Runtime, |_f: Failure<SharedJournal>| async {
            Ok::<_, CommandError>(7)
        })
        .exception_handler(ErrorKind::Any, |_f: Failure<SharedJournal>| async {
            Ok::<_, CommandError>(9)
        });
    let client = TestClient::new(TestCommander::new(app));
    assert_eq!(client.handle(["fail"]).await.unwrap(), 7);
}

#[tokio::test]
async fn test_unhandled_error_is_returned() {
    let app = app_with(&journal()).command(Command::new("fail", fail_with_value));
    let client = TestClient::new(TestCommander::new(app));
    let err = client.handle(["fail"]).await.unwrap_err();
    assert!(matches!(err, CommandError::Value(_)));
}

#[tokio::test]
async fn test_unknown_command() {
    let client = TestClient::new(TestCommander::new(app_with(&journal())));
    let err = client.handle(["missing"]).await.unwrap_err();
    assert!(matches!(err, CommandError::UnknownCommand(ref name) if name == "missing"));
    assert_eq!(err.exit_code(), 64);

    let app = app_with(&journal()).exception_handler(
        ErrorKind::UnknownCommand,
        |failure: Failure<SharedJournal>| async move {
            assert!(failure.command.is_none());
            Ok::<_, CommandError>(4)
        },
    );
    let client = TestClient::new(TestCommander::new(app));
    assert_eq!(client.handle(["missing"]).await.unwrap(), 4);
}

// =============================================================================
// Dependencies
// =============================================================================

async fn read_counter(ctx: Context<SharedJournal>) -> Result<i32, CommandError> {
    let count = ctx.dependency::<Counter>()?;
    ctx.state().record(format!("{}:{count}", ctx.command_name()));
    Ok(0)
}

#[tokio::test]
async fn test_cached_provider_runs_once_across_commands() {
    let journal = journal();
    let app = app_with(&journal)
        .provide(Counter, Scope::Cached)
        .command(Command::new("first", read_counter).depends::<Counter>())
        .command(Command::new("second", read_counter).depends::<Counter>());
    let client = TestClient::new(TestCommander::new(app));

    assert_eq!(client.handle(["first"]).await.unwrap(), 0);
    assert_eq!(client.handle(["second"]).await.unwrap(), 0);
    assert_eq!(client.handle(["first"]).await.unwrap(), 0);

    assert_eq!(journal.provided(), 1);
    assert_eq!(journal.entries(), vec!["first:1", "second:1", "first:1"]);
}

#[tokio::test]
async fn test_transient_provider_runs_per_dispatch() {
    let journal = journal();
    let app = app_with(&journal)
        .provide(Counter, Scope::Transient)
        .command(Command::new("count", read_counter).depends::<Counter>());
    let client = TestClient::new(TestCommander::new(app));

    client.handle(["count"]).await.unwrap();
    client.handle(["count"]).await.unwrap();

    assert_eq!(journal.provided(), 2);
    assert_eq!(journal.entries(), vec!["count:1", "count:2"]);
}

#[tokio::test]
async fn test_reference_scope_overrides_registration() {
    let journal = journal();
    let app = app_with(&journal)
        .provide(Counter, Scope::Cached)
        .command(Command::new("fresh", read_counter).depends_scoped::<Counter>(Scope::Transient));
    let client = TestClient::new(TestCommander::new(app));

    client.handle(["fresh"]).await.unwrap();
    client.handle(["fresh"]).await.unwrap();
    assert_eq!(journal.provided(), 2);
}

#[tokio::test]
async fn test_undeclared_dependency_fails() {
    let app = app_with(&journal())
        .provide(Counter, Scope::Cached)
        .command(Command::new("count", read_counter));
    let client = TestClient::new(TestCommander::new(app));

    let err = client.handle(["count"]).await.unwrap_err();
    assert!(matches!(err, CommandError::UndeclaredDependency(_)));
}

#[tokio::test]
async fn test_missing_provider_fails() {
    let app = app_with(&journal()).command(Command::new("count", read_counter).depends::<Counter>());
    let client = TestClient::new(TestCommander::new(app));

    let err = client.handle(["count"]).await.unwrap_err();
    assert!(matches!(err, CommandError::MissingProvider(_)));
    assert_eq!(err.kind(), ErrorKind::Dependency);
}

// =============================================================================
// Middleware, hooks and timeouts
// =============================================================================

#[tokio::test]
async fn test_lifecycle_order() {
    let journal = journal();
    let app = app_with(&journal)
        .command(greet_command())
        .middleware(|ctx: Context<SharedJournal>| async move {
            ctx.state().record("before");
            Ok::<_, CommandError>(())
        })
        .after_middleware(|ctx: Context<SharedJournal>| async move {
            ctx.state().record("after");
            Ok::<_, CommandError>(())
        })
        .on_startup(|ctx: HookContext<SharedJournal>| async move {
            ctx.state().record("startup");
            Ok::<_, CommandError>(())
        })
        .on_shutdown(|ctx: HookContext<SharedJournal>| async move {
            ctx.state().record("shutdown");
            Ok::<_, CommandError>(())
        })
        .on_cleanup(|ctx: HookContext<SharedJournal>| async move {
            ctx.state().record(format!("cleanup:{}", ctx.exit_code()));
            Ok::<_, CommandError>(())
        });
    let mut client = TestClient::new(TestCommander::new(app));

    client.start().await.unwrap();
    client.handle(["greet:to", "--name", "x"]).await.unwrap();
    client.close().await.unwrap();

    assert_eq!(
        journal.entries(),
        vec!["startup", "before", "Hello x", "after", "shutdown", "cleanup:0"]
    );
}

#[tokio::test]
async fn test_middleware_failure_skips_handler() {
    let journal = journal();
    let app = app_with(&journal)
        .command(greet_command())
        .command(greet_command_named("quiet").ignore_middleware())
        .middleware(|_ctx: Context<SharedJournal>| async {
            Err::<(), _>(CommandError::value("blocked"))
        });
    let client = TestClient::new(TestCommander::new(app));

    assert!(client.handle(["greet:to"]).await.is_err());
    assert_eq!(client.handle(["quiet"]).await.unwrap(), 0);
    assert_eq!(journal.entries(), vec!["Hello World!"]);
}

fn greet_command_named(name: &str) -> Command<SharedJournal> {
    Command::new(name, greet).optional(CommandArgument::new("--name").default("World!"))
}

#[tokio::test]
async fn test_timeout_returns_fallback_code() {
    let app = app_with(&journal()).command(Command::new(
        "slow",
        |_ctx: Context<SharedJournal>| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CommandError>(0)
        },
    ));
    let client = TestClient::new(TestCommander::new(app));

    let code = client
        .handle_with_timeout(["slow"], Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(code, 1);
}

#[tokio::test]
async fn test_state_factory_runs_once() {
    let built = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = Arc::clone(&built);
    let app: Application<SharedJournal> = Application::new(AppConfig::default())
        .with_state_factory(move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, CommandError>(Arc::new(Journal::default()))
            }
        })
        .command(greet_command());
    let mut client = TestClient::new(TestCommander::new(app));

    client.start().await.unwrap();
    client.handle(["greet:to"]).await.unwrap();
    client.handle(["greet:to"]).await.unwrap();
    client.close().await.unwrap();

    assert_eq!(built.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(client.app().state().unwrap().entries().len(), 2);
}
