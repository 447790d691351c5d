mod demo;

use commander::{run_app, RunOptions};
use commander_common::{color_init, telemetry};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let config = demo::config();
    let _telemetry = telemetry::init_tracing(if config.debug { "debug" } else { "info" });
    color_init(!config.color);
    run_app(demo::app(config), RunOptions::default())
}
