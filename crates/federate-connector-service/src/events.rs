//! Platform events
//!
//! The service tier listens for extension module events so that cached code
//! contexts are dropped when the artifacts behind them change on disk.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use federate_connector::error::{ConnectorError, ConnectorResult};

/// What happened to an extension module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleEventKind {
    /// Module file added
    FileAdded,
    /// Module file replaced or modified
    FileChanged,
    /// Module file removed
    FileRemoved,
}

/// Event published on the platform bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// A backing code artifact changed.
    ExtensionModule {
        kind: ModuleEventKind,
        module_name: String,
    },
}

impl PlatformEvent {
    /// Create an extension module event.
    pub fn extension_module(kind: ModuleEventKind, module_name: impl Into<String>) -> Self {
        PlatformEvent::ExtensionModule {
            kind,
            module_name: module_name.into(),
        }
    }

    /// Type listeners subscribe to.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            PlatformEvent::ExtensionModule { .. } => EventType::ExtensionModule,
        }
    }
}

/// Event types listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ExtensionModule,
}

impl EventType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ExtensionModule => "extension_module",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Callback invoked for each matching event.
pub type EventHandler = Arc<dyn Fn(&PlatformEvent) + Send + Sync>;

/// The platform message bus.
pub trait EventBus: Send + Sync {
    /// Subscribe a handler to one event type.
    fn add_listener(&self, event_type: EventType, handler: EventHandler) -> ConnectorResult<()>;
}

/// In-process [`EventBus`].
#[derive(Default)]
pub struct LocalEventBus {
    listeners: RwLock<HashMap<EventType, Vec<EventHandler>>>,
}

impl LocalEventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener of its type, returning how many ran.
    pub fn publish(&self, event: &PlatformEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type())
            .cloned()
            .unwrap_or_default();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of listeners subscribed to a type.
    #[must_use]
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

impl EventBus for LocalEventBus {
    fn add_listener(&self, event_type: EventType, handler: EventHandler) -> ConnectorResult<()> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| ConnectorError::internal("event bus listener table is poisoned"))?;
        listeners.entry(event_type).or_default().push(handler);
        Ok(())
    }
}

impl fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEventBus")
            .field(
                "extension_module_listeners",
                &self.listener_count(EventType::ExtensionModule),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_reaches_listeners() {
        let bus = LocalEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        bus.add_listener(
            EventType::ExtensionModule,
            Arc::new(move |_event: &PlatformEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        let delivered = bus.publish(&PlatformEvent::extension_module(
            ModuleEventKind::FileChanged,
            "oracle.jar",
        ));

        assert_eq!(delivered, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_without_listeners() {
        let bus = LocalEventBus::new();
        let event = PlatformEvent::extension_module(ModuleEventKind::FileAdded, "x.jar");
        assert_eq!(bus.publish(&event), 0);
        assert_eq!(bus.listener_count(EventType::ExtensionModule), 0);
    }

    #[test]
    fn test_event_serde() {
        let event = PlatformEvent::extension_module(ModuleEventKind::FileRemoved, "a.jar");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "extension_module");
        assert_eq!(json["kind"], "file_removed");
    }
}
