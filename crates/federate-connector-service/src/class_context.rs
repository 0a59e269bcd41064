//! Class isolation cache
//!
//! Maps a classpath specification (exact string) to the isolated
//! [`CodeContext`] built from it. Entries are never evicted one by one; the
//! whole cache is dropped by [`ClassContextCache::invalidate_all`], which
//! runs when an extension module changes on disk.
//!
//! Construction is rare, so the map and the caching flag share one mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info, warn};

use federate_connector::code_context::CodeContext;
use federate_connector::config::ServiceSettings;
use federate_connector::error::ConnectorResult;

use crate::events::{EventBus, EventType, ModuleEventKind, PlatformEvent};

#[derive(Debug)]
struct CacheState {
    enabled: bool,
    contexts: HashMap<String, Arc<CodeContext>>,
}

/// Cache of isolated code contexts keyed by classpath specification.
#[derive(Debug)]
pub struct ClassContextCache {
    state: Mutex<CacheState>,
    configured_enabled: bool,
    watching: AtomicBool,
}

impl ClassContextCache {
    /// Create a private cache.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Mutex::new(CacheState {
                enabled,
                contexts: HashMap::new(),
            }),
            configured_enabled: enabled,
            watching: AtomicBool::new(false),
        }
    }

    /// Create a cache seeded from process settings.
    ///
    /// [`ClassContextCache::reset`] restores `settings.cache_class_loaders`.
    #[must_use]
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        info!(
            cache_class_loaders = settings.cache_class_loaders,
            "Class context caching configured"
        );
        Self::new(settings.cache_class_loaders)
    }

    /// The process-wide cache, created from the environment on first use.
    pub fn global() -> Arc<ClassContextCache> {
        static GLOBAL: OnceLock<Arc<ClassContextCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            Arc::new(ClassContextCache::from_settings(&ServiceSettings::from_env()))
        }))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the context for a classpath specification, building it if needed.
    ///
    /// With caching disabled every call builds a fresh context and stores
    /// nothing.
    pub fn get_or_create(&self, spec: &str) -> ConnectorResult<Arc<CodeContext>> {
        let mut state = self.lock();

        if !state.enabled {
            debug!(class_path = %spec, "Class context caching disabled, building fresh context");
            return CodeContext::parse(spec).map(Arc::new);
        }

        if let Some(context) = state.contexts.get(spec) {
            debug!(class_path = %spec, context_id = %context.id(), "Class context cache hit");
            return Ok(Arc::clone(context));
        }

        let context = Arc::new(CodeContext::parse(spec)?);
        debug!(class_path = %spec, context_id = %context.id(), "Class context cache miss");
        state
            .contexts
            .insert(spec.to_string(), Arc::clone(&context));
        Ok(context)
    }

    /// Drop every cached context.
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        let dropped = state.contexts.len();
        state.contexts.clear();
        info!(dropped, "Clearing class context cache");
    }

    /// Turn context reuse on or off. Turning it off drops cached contexts.
    pub fn set_caching_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        state.enabled = enabled;
        if !enabled {
            state.contexts.clear();
        }
        info!(cache_class_loaders = enabled, "Class context caching changed");
    }

    /// Whether contexts are reused.
    #[must_use]
    pub fn is_caching_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Number of cached contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().contexts.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and restore the configured caching flag.
    ///
    /// For [`ClassContextCache::global`] and caches built with
    /// [`ClassContextCache::from_settings`] that is the `ServiceSettings` flag.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.contexts.clear();
        state.enabled = self.configured_enabled;
        debug!(cache_class_loaders = state.enabled, "Class context cache reset");
    }

    /// Invalidate the cache whenever an extension module changes.
    ///
    /// Registers at most one listener per cache. A bus that refuses the
    /// listener is logged and otherwise ignored.
    pub fn watch_artifacts(self: &Arc<Self>, bus: &dyn EventBus) {
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }

        let cache = Arc::downgrade(self);
        let handler = Arc::new(move |event: &PlatformEvent| {
            let PlatformEvent::ExtensionModule { kind, module_name } = event;
            if *kind != ModuleEventKind::FileChanged {
                return;
            }
            if let Some(cache) = cache.upgrade() {
                debug!(module = %module_name, "Extension module changed");
                cache.invalidate_all();
            }
        });

        if let Err(e) = bus.add_listener(EventType::ExtensionModule, handler) {
            warn!(error = %e, "Failed to register extension module listener");
            self.watching.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventHandler, LocalEventBus};
    use federate_connector::error::ConnectorError;

    const SPEC: &str = "file:///opt/connectors/oracle.jar;extensionjar:ojdbc.jar";

    #[test]
    fn test_enabled_reuses_context() {
        let cache = ClassContextCache::new(true);
        let a = cache.get_or_create(SPEC).unwrap();
        let b = cache.get_or_create(SPEC).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_is_exact_string() {
        let cache = ClassContextCache::new(true);
        let a = cache
            .get_or_create("file:///a.jar;file:///b.jar")
            .unwrap();
        let b = cache
            .get_or_create("file:///b.jar;file:///a.jar")
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_builds_fresh_contexts() {
        let cache = ClassContextCache::new(false);
        let a = cache.get_or_create(SPEC).unwrap();
        let b = cache.get_or_create(SPEC).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all_rebuilds() {
        let cache = ClassContextCache::new(true);
        let before = cache.get_or_create(SPEC).unwrap();
        cache.invalidate_all();
        let after = cache.get_or_create(SPEC).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.id(), after.id());
    }

    #[test]
    fn test_disable_then_reset() {
        let cache = ClassContextCache::new(true);
        cache.get_or_create(SPEC).unwrap();

        cache.set_caching_enabled(false);
        assert!(cache.is_empty());
        assert!(!cache.is_caching_enabled());

        cache.reset();
        assert!(cache.is_caching_enabled());
    }

    #[test]
    fn test_reset_restores_settings_flag() {
        let settings = ServiceSettings {
            cache_class_loaders: false,
            ..ServiceSettings::default()
        };
        let cache = ClassContextCache::from_settings(&settings);
        assert!(!cache.is_caching_enabled());

        cache.set_caching_enabled(true);
        cache.get_or_create(SPEC).unwrap();
        assert_eq!(cache.len(), 1);

        cache.reset();
        assert!(!cache.is_caching_enabled());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        let a = ClassContextCache::global();
        let b = ClassContextCache::global();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_malformed_spec_is_not_cached() {
        let cache = ClassContextCache::new(true);
        let err = cache.get_or_create("relative/path.jar").unwrap_err();

        assert!(matches!(err, ConnectorError::InvalidClassPath { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_file_changed_event_invalidates() {
        let cache = Arc::new(ClassContextCache::new(true));
        let bus = LocalEventBus::new();
        cache.watch_artifacts(&bus);
        cache.watch_artifacts(&bus);
        assert_eq!(bus.listener_count(EventType::ExtensionModule), 1);

        cache.get_or_create(SPEC).unwrap();
        bus.publish(&PlatformEvent::extension_module(
            ModuleEventKind::FileAdded,
            "ojdbc.jar",
        ));
        assert_eq!(cache.len(), 1);

        bus.publish(&PlatformEvent::extension_module(
            ModuleEventKind::FileChanged,
            "ojdbc.jar",
        ));
        assert!(cache.is_empty());
    }

    struct RefusingBus;

    impl EventBus for RefusingBus {
        fn add_listener(&self, _event_type: EventType, _handler: EventHandler) -> ConnectorResult<()> {
            Err(ConnectorError::internal("bus offline"))
        }
    }

    #[test]
    fn test_listener_registration_failure_is_not_fatal() {
        let cache = Arc::new(ClassContextCache::new(true));
        cache.watch_artifacts(&RefusingBus);

        let bus = LocalEventBus::new();
        cache.watch_artifacts(&bus);
        assert_eq!(bus.listener_count(EventType::ExtensionModule), 1);
    }
}
