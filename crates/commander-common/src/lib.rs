//! Common utilities shared across commander crates.
//!
//! Provides terminal color handling, poison-tolerant lock helpers and
//! tracing setup.

#![deny(clippy::all)]

mod color;
mod sync;
pub mod telemetry;

pub use color::Colors;
pub use color::init as color_init;
pub use color::is_disabled as color_is_disabled;
pub use sync::mutex_lock_or_recover;
pub use sync::poison_recovery_count;
pub use sync::rwlock_read_or_recover;
pub use sync::rwlock_write_or_recover;
