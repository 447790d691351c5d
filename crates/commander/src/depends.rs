//! Providers, scopes and the dependency resolver.
//!
//! A provider is a type implementing [`Provider`]. It is registered on the
//! application once, together with a [`Scope`]. Commands declare which
//! providers they need, and every declared provider is resolved before
//! middleware runs. Cached results live for the lifetime of the application
//! and are keyed by the provider's `TypeId`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use commander_common::mutex_lock_or_recover;
use tracing::debug;

use crate::command::DependencyRef;
use crate::error::CommandError;

pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Resolved at most once per application.
    #[default]
    Cached,
    /// Resolved again for every reference.
    Transient,
}

#[async_trait]
pub trait Provider<S>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    async fn provide(&self, resolver: &Resolver<'_, S>) -> Result<Self::Output, CommandError>;
}

#[async_trait]
trait ErasedProvider<S>: Send + Sync {
    async fn provide_erased(&self, resolver: &Resolver<'_, S>) -> Result<SharedValue, CommandError>;
}

#[async_trait]
impl<S, P> ErasedProvider<S> for P
where
    S: Send + Sync + 'static,
    P: Provider<S>,
{
    async fn provide_erased(&self, resolver: &Resolver<'_, S>) -> Result<SharedValue, CommandError> {
        let value: SharedValue = Arc::new(self.provide(resolver).await?);
        Ok(value)
    }
}

struct Registration<S> {
    provider: Arc<dyn ErasedProvider<S>>,
    scope: Scope,
    name: &'static str,
}

impl<S> Clone for Registration<S> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            scope: self.scope,
            name: self.name,
        }
    }
}

/// Registered providers keyed by provider type.
pub struct Providers<S> {
    entries: HashMap<TypeId, Registration<S>>,
}

impl<S> Default for Providers<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: Send + Sync + 'static> Providers<S> {
    pub fn register<P: Provider<S>>(&mut self, provider: P, scope: Scope) {
        let name = std::any::type_name::<P>();
        debug!(dependency = name, ?scope, "Registering provider");
        self.entries.insert(
            TypeId::of::<P>(),
            Registration {
                provider: Arc::new(provider),
                scope,
                name,
            },
        );
    }
}

impl<S> Providers<S> {
    pub fn contains<P: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<P>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy registrations missing from `self`; existing ones are kept.
    pub fn merge(&mut self, other: &Providers<S>) {
        for (id, registration) in &other.entries {
            self.entries
                .entry(*id)
                .or_insert_with(|| registration.clone());
        }
    }
}

impl<S> fmt::Debug for Providers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.values().map(|r| (r.name, r.scope)))
            .finish()
    }
}

/// Application-lifetime cache of resolved provider values.
#[derive(Default)]
pub struct DependencyCache {
    values: Mutex<HashMap<TypeId, SharedValue>>,
}

impl DependencyCache {
    fn get(&self, id: TypeId) -> Option<SharedValue> {
        mutex_lock_or_recover(&self.values).get(&id).cloned()
    }

    fn insert(&self, id: TypeId, value: SharedValue) {
        mutex_lock_or_recover(&self.values).insert(id, value);
    }

    pub fn len(&self) -> usize {
        mutex_lock_or_recover(&self.values).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock_or_recover(&self.values).clear();
    }
}

impl fmt::Debug for DependencyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Resolves providers against one application's registry and cache.
pub struct Resolver<'a, S> {
    providers: &'a Providers<S>,
    cache: &'a DependencyCache,
    state: &'a Arc<S>,
}

impl<'a, S: Send + Sync + 'static> Resolver<'a, S> {
    pub(crate) fn new(
        providers: &'a Providers<S>,
        cache: &'a DependencyCache,
        state: &'a Arc<S>,
    ) -> Self {
        Self {
            providers,
            cache,
            state,
        }
    }

    pub fn state(&self) -> &Arc<S> {
        self.state
    }

    /// Resolve `P` with the scope it was registered with.
    pub async fn resolve<P: Provider<S>>(&self) -> Result<Arc<P::Output>, CommandError> {
        self.resolve_scoped::<P>(None).await
    }

    pub async fn resolve_scoped<P: Provider<S>>(
        &self,
        scope: Option<Scope>,
    ) -> Result<Arc<P::Output>, CommandError> {
        let dependency = DependencyRef::of::<S, P>(scope);
        let value = self.resolve_ref(&dependency).await?;
        value
            .downcast::<P::Output>()
            .map_err(|_| CommandError::MissingProvider(dependency.name))
    }

    pub(crate) async fn resolve_ref(
        &self,
        dependency: &DependencyRef,
    ) -> Result<SharedValue, CommandError> {
        let registration = self
            .providers
            .entries
            .get(&dependency.type_id)
            .ok_or(CommandError::MissingProvider(dependency.name))?;
        let scope = dependency.scope.unwrap_or(registration.scope);

        if scope == Scope::Cached {
            if let Some(value) = self.cache.get(dependency.type_id) {
                debug!(dependency = dependency.name, "Dependency served from cache");
                return Ok(value);
            }
        }

        debug!(dependency = dependency.name, ?scope, "Resolving dependency");
        let value = registration.provider.provide_erased(self).await?;
        if scope == Scope::Cached {
            self.cache.insert(dependency.type_id, Arc::clone(&value));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Provider<String> for Counter {
        type Output = usize;

        async fn provide(&self, _: &Resolver<'_, String>) -> Result<usize, CommandError> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct Greeting;

    #[async_trait]
    impl Provider<String> for Greeting {
        type Output = String;

        async fn provide(&self, resolver: &Resolver<'_, String>) -> Result<String, CommandError> {
            let count = resolver.resolve::<Counter>().await?;
            Ok(format!("{} #{count}", resolver.state()))
        }
    }

    fn setup(scope: Scope) -> (Providers<String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut providers = Providers::default();
        providers.register(Counter(Arc::clone(&calls)), scope);
        providers.register(Greeting, Scope::Cached);
        (providers, calls)
    }

    #[tokio::test]
    async fn test_cached_provider_runs_once() {
        let (providers, calls) = setup(Scope::Cached);
        let cache = DependencyCache::default();
        let state = Arc::new("hello".to_string());
        let resolver = Resolver::new(&providers, &cache, &state);

        let first = resolver.resolve::<Counter>().await.unwrap();
        let second = resolver.resolve::<Counter>().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_provider_runs_per_reference() {
        let (providers, calls) = setup(Scope::Transient);
        let cache = DependencyCache::default();
        let state = Arc::new(String::new());
        let resolver = Resolver::new(&providers, &cache, &state);

        assert_eq!(*resolver.resolve::<Counter>().await.unwrap(), 1);
        assert_eq!(*resolver.resolve::<Counter>().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scope_override_bypasses_cache() {
        let (providers, calls) = setup(Scope::Cached);
        let cache = DependencyCache::default();
        let state = Arc::new(String::new());
        let resolver = Resolver::new(&providers, &cache, &state);

        resolver.resolve::<Counter>().await.unwrap();
        resolver
            .resolve_scoped::<Counter>(Some(Scope::Transient))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_nested_resolution_reads_state() {
        let (providers, calls) = setup(Scope::Cached);
        let cache = DependencyCache::default();
        let state = Arc::new("hello".to_string());
        let resolver = Resolver::new(&providers, &cache, &state);

        let greeting = resolver.resolve::<Greeting>().await.unwrap();
        assert_eq!(greeting.as_str(), "hello #1");
        resolver.resolve::<Counter>().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_provider() {
        let providers: Providers<String> = Providers::default();
        let cache = DependencyCache::default();
        let state = Arc::new(String::new());
        let resolver = Resolver::new(&providers, &cache, &state);

        let err = resolver.resolve::<Counter>().await.unwrap_err();
        assert!(matches!(err, CommandError::MissingProvider(name) if name.ends_with("Counter")));
    }

    #[test]
    fn test_merge_keeps_existing_registration() {
        let (mut parent, _) = setup(Scope::Cached);
        let mut other = Providers::default();
        other.register(Counter(Arc::new(AtomicUsize::new(0))), Scope::Transient);
        parent.merge(&other);

        let scope = parent.entries[&TypeId::of::<Counter>()].scope;
        assert_eq!(scope, Scope::Cached);
        assert_eq!(parent.len(), 2);
    }
}
