//! Async command-line application framework.
//!
//! An [`Application`] owns named [`Command`]s, each parsed by its own clap
//! parser. Handlers receive a [`Context`] with parsed arguments, shared
//! state and the values of the [`Provider`]s they declared. Middleware,
//! lifecycle hooks and exception handlers wrap the dispatch, and routers
//! (applications of their own) merge into a parent with
//! [`Application::include_router`]. [`run_app`] drives it all as a process.

#![deny(clippy::all)]

pub mod app;
pub mod argument;
pub mod command;
pub mod config;
pub mod context;
pub mod depends;
pub mod error;
pub mod exception;
pub mod help;
pub mod hooks;
pub mod kwargs;
pub mod middleware;
pub mod registry;
pub mod runner;
mod signals;
pub mod state;
pub mod testing;

pub use app::Application;
pub use argument::{Action, CommandArgument, Nargs, ValueType};
pub use command::{blocking, Command, CommandHandler, HandlerResult, Outcome};
pub use config::AppConfig;
pub use context::Context;
pub use depends::{Provider, Resolver, Scope};
pub use error::{exit_codes, CommandError, ErrorKind};
pub use exception::{ExceptionHandler, Failure};
pub use hooks::{Hook, HookContext, HookSelection, Phase};
pub use kwargs::Kwargs;
pub use middleware::{Middleware, Position};
pub use runner::{run_app, AppRunner, EventRunner, RunOptions};
pub use testing::{TestClient, TestCommander};

pub use async_trait::async_trait;
