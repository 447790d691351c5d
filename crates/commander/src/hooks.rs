//! Startup, shutdown and cleanup hooks.
//!
//! Hooks marked internal belong to the framework or to integrations and
//! still run when a command opts out of hooks, unless the invocation also
//! asks to skip internal hooks (as `--help` and `--version` do).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CommandError;

/// What a hook can see of the application.
pub struct HookContext<S> {
    state: Arc<S>,
    title: String,
    exit_code: i32,
}

impl<S> Clone for HookContext<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            title: self.title.clone(),
            exit_code: self.exit_code,
        }
    }
}

impl<S> HookContext<S> {
    pub(crate) fn new(state: Arc<S>, title: impl Into<String>, exit_code: i32) -> Self {
        Self {
            state,
            title: title.into(),
            exit_code,
        }
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Exit code at the time the phase started.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

#[async_trait]
pub trait Hook<S>: Send + Sync + 'static {
    async fn call(&self, ctx: &HookContext<S>) -> Result<(), CommandError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<S, F, Fut> Hook<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(HookContext<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn call(&self, ctx: &HookContext<S>) -> Result<(), CommandError> {
        (self)(ctx.clone()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Shutdown,
    Cleanup,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Startup => "startup",
            Phase::Shutdown => "shutdown",
            Phase::Cleanup => "cleanup",
        }
    }
}

struct HookEntry<S> {
    hook: Arc<dyn Hook<S>>,
    internal: bool,
}

impl<S> Clone for HookEntry<S> {
    fn clone(&self) -> Self {
        Self {
            hook: Arc::clone(&self.hook),
            internal: self.internal,
        }
    }
}

/// Which hooks of a phase to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookSelection {
    pub all_hooks: bool,
    pub ignore_internal: bool,
}

impl HookSelection {
    pub const ALL: HookSelection = HookSelection {
        all_hooks: true,
        ignore_internal: false,
    };

    fn includes(&self, internal: bool) -> bool {
        self.all_hooks || (internal && !self.ignore_internal)
    }
}

impl Default for HookSelection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Hooks for all three phases, each in registration order.
pub struct Hooks<S> {
    startup: Vec<HookEntry<S>>,
    shutdown: Vec<HookEntry<S>>,
    cleanup: Vec<HookEntry<S>>,
}

impl<S> Default for Hooks<S> {
    fn default() -> Self {
        Self {
            startup: Vec::new(),
            shutdown: Vec::new(),
            cleanup: Vec::new(),
        }
    }
}

impl<S: Send + Sync + 'static> Hooks<S> {
    pub fn push<H: Hook<S>>(&mut self, phase: Phase, hook: H, internal: bool) {
        self.phase_mut(phase).push(HookEntry {
            hook: Arc::new(hook),
            internal,
        });
    }

    pub fn extend_from(&mut self, other: &Hooks<S>) {
        self.startup.extend(other.startup.iter().cloned());
        self.shutdown.extend(other.shutdown.iter().cloned());
        self.cleanup.extend(other.cleanup.iter().cloned());
    }

    pub fn len(&self, phase: Phase) -> usize {
        self.phase(phase).len()
    }

    pub async fn run(
        &self,
        phase: Phase,
        ctx: &HookContext<S>,
        selection: HookSelection,
    ) -> Result<(), CommandError> {
        for entry in self.phase(phase) {
            if !selection.includes(entry.internal) {
                continue;
            }
            debug!(
                phase = phase.as_str(),
                hook = entry.hook.name(),
                internal = entry.internal,
                "Executing hook"
            );
            entry.hook.call(ctx).await?;
        }
        Ok(())
    }

    fn phase(&self, phase: Phase) -> &Vec<HookEntry<S>> {
        match phase {
            Phase::Startup => &self.startup,
            Phase::Shutdown => &self.shutdown,
            Phase::Cleanup => &self.cleanup,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut Vec<HookEntry<S>> {
        match phase {
            Phase::Startup => &mut self.startup,
            Phase::Shutdown => &mut self.shutdown,
            Phase::Cleanup => &mut self.cleanup,
        }
    }
}
