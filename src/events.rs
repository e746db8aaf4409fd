//! Event dispatcher and registration framework

use crate::error::Result;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kind of event that can occur. Values past the built-in ones are custom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EventType(pub u16);

impl EventType {
    pub const UNKNOWN: EventType = EventType(0);
    pub const TIMEOUT: EventType = EventType(1);

    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "unknown",
            1 => "timeout",
            _ => "custom",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<u16> for EventType {
    fn from(value: u16) -> Self {
        EventType(value)
    }
}

/// A dispatched event: its type, the entity that dispatched it and a value.
pub struct Event {
    etype: EventType,
    source: Arc<dyn Any + Send + Sync>,
    value: Box<dyn Any + Send + Sync>,
}

impl Event {
    pub fn etype(&self) -> EventType {
        self.etype
    }

    /// The dispatching entity, if it is a `T`
    pub fn source<T: Any>(&self) -> Option<&T> {
        self.source.downcast_ref::<T>()
    }

    /// The value associated with the event, if it is a `T`
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("etype", &self.etype).finish_non_exhaustive()
    }
}

/// Function that can receive events
pub type Callback = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// Wrap a closure as a [`Callback`]
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registers callbacks per event type and dispatches events to them.
pub struct Dispatcher {
    source: Arc<dyn Any + Send + Sync>,
    callbacks: RwLock<HashMap<EventType, Vec<Callback>>>,
}

impl Dispatcher {
    /// Create a dispatcher whose events carry `source`
    pub fn new<S: Any + Send + Sync>(source: S) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            source,
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, etype: EventType, callback: Callback) {
        self.callbacks.write().entry(etype).or_default().push(callback);
    }

    /// Remove every registration of `callback` (compared by identity) for `etype`
    pub fn remove(&self, etype: EventType, callback: &Callback) {
        let mut callbacks = self.callbacks.write();
        if let Some(registered) = callbacks.get_mut(&etype) {
            registered.retain(|cb| !Arc::ptr_eq(cb, callback));
        }
    }

    pub fn callback_count(&self, etype: EventType) -> usize {
        self.callbacks.read().get(&etype).map_or(0, Vec::len)
    }

    /// Call every callback for `etype` in registration order.
    ///
    /// Stops at the first callback that fails and returns its error.
    pub fn dispatch<V: Any + Send + Sync>(&self, etype: EventType, value: V) -> Result<()> {
        // Snapshot so callbacks may register or remove without deadlocking
        let callbacks = match self.callbacks.read().get(&etype) {
            Some(registered) => registered.clone(),
            None => return Ok(()),
        };

        let event = Event {
            etype,
            source: Arc::clone(&self.source),
            value: Box::new(value),
        };

        for cb in &callbacks {
            cb(&event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callbacks = self.callbacks.read();
        let counts: HashMap<_, _> = callbacks.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Dispatcher").field("callbacks", &counts).finish()
    }
}
