//! SIGINT/SIGTERM handling for the process runner.

use std::io;
#[cfg(unix)]
use std::sync::Arc;

#[cfg(unix)]
use tokio::sync::Notify;

#[cfg(unix)]
pub struct SignalHandler {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
    notify: Arc<Notify>,
}

#[cfg(unix)]
impl SignalHandler {
    /// Forward SIGINT and SIGTERM to a [`Notify`] from a dedicated thread.
    pub fn install() -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;
        use tracing::info;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let notify = Arc::new(Notify::new());
        let notifier = Arc::clone(&notify);

        let thread = std::thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    info!(signal, "Received signal, initiating graceful exit");
                    notifier.notify_one();
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
            notify,
        })
    }

    /// Resolves once a signal has been received.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Stop listening and join the watcher thread.
    pub fn remove(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(unix)]
impl Drop for SignalHandler {
    fn drop(&mut self) {
        self.close();
    }
}

/// Never constructed: `install` always fails off unix.
#[cfg(not(unix))]
pub enum SignalHandler {}

#[cfg(not(unix))]
impl SignalHandler {
    pub fn install() -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signal handling is only available on unix",
        ))
    }

    pub async fn notified(&self) {
        match *self {}
    }

    pub fn remove(self) {
        match self {}
    }
}
