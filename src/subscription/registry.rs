//! Subscription table.
//!
//! Maps client-generated ids to a destination and a handler. Entries
//! outlive the transport: after each handshake the event loop walks
//! [`SubscriptionRegistry::all`] and re-sends one SUBSCRIBE per entry, so
//! handler bindings stay the same across reconnects.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::identifiers::SubscriptionId;
use crate::protocol::{Command, Frame, header};

// ============================================================================
// Types
// ============================================================================

/// Message handler callback type.
///
/// Called synchronously on the connection task with the decoded JSON body.
/// Must not block: the next frame is not read until it returns.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Acknowledgement mode sent with every SUBSCRIBE.
const ACK_AUTO: &str = "auto";

// ============================================================================
// Subscription
// ============================================================================

/// A binding from an id and destination to a local handler.
#[derive(Clone)]
pub struct Subscription {
    /// Client-generated id.
    pub id: SubscriptionId,
    /// Broker routing address.
    pub destination: String,
    /// Consumer callback.
    pub handler: MessageHandler,
}

impl Subscription {
    /// Builds the SUBSCRIBE frame for this entry.
    #[must_use]
    pub fn subscribe_frame(&self) -> Frame {
        Frame::new(Command::Subscribe)
            .header(header::ID, self.id.to_string())
            .header(header::DESTINATION, self.destination.as_str())
            .header(header::ACK, ACK_AUTO)
    }

    /// Builds the UNSUBSCRIBE frame for an id.
    #[must_use]
    pub fn unsubscribe_frame(id: SubscriptionId) -> Frame {
        Frame::new(Command::Unsubscribe).header(header::ID, id.to_string())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Owns the id → subscription mapping.
///
/// Ids increase monotonically, so iteration order is insertion order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    /// Next id to hand out.
    next_id: u64,
    /// Live entries by id.
    entries: BTreeMap<SubscriptionId, Subscription>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a destination and returns its new id.
    pub fn add(&mut self, destination: impl Into<String>, handler: MessageHandler) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id);
        self.next_id += 1;

        let destination = destination.into();
        debug!(%id, %destination, "Subscription registered");

        self.entries.insert(
            id,
            Subscription {
                id,
                destination,
                handler,
            },
        );
        id
    }

    /// Removes an entry. Later deliveries for `id` are dropped.
    pub fn remove(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let removed = self.entries.remove(&id);
        if removed.is_some() {
            debug!(%id, "Subscription removed");
        }
        removed
    }

    /// Invokes the handler for `id` synchronously.
    ///
    /// The lock is released before the handler runs, so a handler may
    /// subscribe or unsubscribe. Returns `false` if no such subscription
    /// exists; that is not a fault, a delivery can race an unsubscribe.
    pub fn dispatch(registry: &Mutex<Self>, id: SubscriptionId, payload: Value) -> bool {
        let handler = registry.lock().handler(id);
        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    /// Returns a clone of the handler for `id`.
    ///
    /// Lets callers release a lock around the registry before invoking it.
    #[inline]
    #[must_use]
    pub fn handler(&self, id: SubscriptionId) -> Option<MessageHandler> {
        self.entries.get(&id).map(|s| Arc::clone(&s.handler))
    }

    /// Returns an entry by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.entries.get(&id)
    }

    /// Iterates entries in insertion order.
    #[inline]
    pub fn all(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.values()
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("next_id", &self.next_id)
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn recorder() -> (MessageHandler, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: MessageHandler = Arc::new(move |v| sink.lock().push(v));
        (handler, seen)
    }

    #[test]
    fn test_ids_are_monotonic_and_not_reused() {
        let mut registry = SubscriptionRegistry::new();
        let (h, _) = recorder();

        let a = registry.add("/a", Arc::clone(&h));
        let b = registry.add("/b", Arc::clone(&h));
        registry.remove(b);
        let c = registry.add("/c", h);

        assert!(a < b && b < c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_dispatch_invokes_handler() {
        let registry = Mutex::new(SubscriptionRegistry::new());
        let (h, seen) = recorder();
        let id = registry.lock().add("/telemetry", h);

        assert!(SubscriptionRegistry::dispatch(&registry, id, json!({ "battery": 42 })));
        assert_eq!(*seen.lock(), vec![json!({ "battery": 42 })]);
    }

    #[test]
    fn test_dispatch_after_remove_is_noop() {
        let registry = Mutex::new(SubscriptionRegistry::new());
        let (h, seen) = recorder();
        let id = registry.lock().add("/telemetry", h);
        registry.lock().remove(id);

        assert!(!SubscriptionRegistry::dispatch(&registry, id, json!(1)));
        assert!(seen.lock().is_empty());
        assert!(registry.lock().remove(id).is_none());
    }

    #[test]
    fn test_dispatch_releases_lock_for_handler() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let inner = Arc::clone(&registry);
        let id = registry.lock().add(
            "/telemetry",
            Arc::new(move |_: Value| {
                let own = inner.lock().all().next().map(|s| s.id);
                if let Some(own) = own {
                    inner.lock().remove(own);
                }
            }),
        );

        assert!(SubscriptionRegistry::dispatch(&registry, id, json!({})));
        assert!(registry.lock().is_empty());
    }

    #[test]
    fn test_all_in_insertion_order() {
        let mut registry = SubscriptionRegistry::new();
        let (h, _) = recorder();
        for dest in ["/c", "/a", "/b"] {
            registry.add(dest, Arc::clone(&h));
        }

        let order: Vec<_> = registry.all().map(|s| s.destination.as_str()).collect();
        assert_eq!(order, vec!["/c", "/a", "/b"]);
    }

    #[test]
    fn test_subscribe_frame() {
        let mut registry = SubscriptionRegistry::new();
        let (h, _) = recorder();
        let id = registry.add("/exchange/drone.gui/gui.D-01.telemetry", h);
        let frame = registry.get(id).unwrap().subscribe_frame();

        assert_eq!(frame.command, "SUBSCRIBE");
        assert_eq!(frame.get_header("id"), Some("sub-0"));
        assert_eq!(
            frame.get_header("destination"),
            Some("/exchange/drone.gui/gui.D-01.telemetry")
        );
        assert_eq!(frame.get_header("ack"), Some("auto"));
    }

    #[test]
    fn test_unsubscribe_frame() {
        let frame = Subscription::unsubscribe_frame(SubscriptionId::new(3));
        assert_eq!(frame.encode(), "UNSUBSCRIBE\nid:sub-3\n\n\0");
    }
}
