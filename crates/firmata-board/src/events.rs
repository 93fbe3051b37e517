//! Change notification bus.
//!
//! Every guarded pin mutation emits a `before_*` event, applies the change,
//! then emits the matching `after_*` event. Both carry the same from/to
//! pair. A mutation that changes nothing emits nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc;

use serde::Serialize;

use crate::pin::{PinId, PinMode, PinValue};

/// Identifies a subscription on a [`ChangeBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Whether an event precedes or follows its mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Before,
    After,
}

/// The property that changed, with its previous and new values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "property", rename_all = "snake_case")]
pub enum Change {
    PinMode { from: PinMode, to: PinMode },
    Reporting { from: bool, to: bool },
    Value {
        from: Option<PinValue>,
        to: Option<PinValue>,
    },
}

impl Change {
    /// Property name as used in event kinds.
    pub fn property(&self) -> &'static str {
        match self {
            Change::PinMode { .. } => "pin_mode",
            Change::Reporting { .. } => "reporting",
            Change::Value { .. } => "value",
        }
    }
}

/// One notification emitted around a pin mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub phase: Phase,
    pub pin: PinId,
    pub change: Change,
}

impl ChangeEvent {
    pub(crate) fn before(pin: PinId, change: Change) -> Self {
        Self {
            phase: Phase::Before,
            pin,
            change,
        }
    }

    pub(crate) fn after(pin: PinId, change: Change) -> Self {
        Self {
            phase: Phase::After,
            pin,
            change,
        }
    }

    /// Event kind: `before_value_changed`, `after_pin_mode_changed`, ...
    pub fn kind(&self) -> &'static str {
        match (self.phase, self.change) {
            (Phase::Before, Change::PinMode { .. }) => "before_pin_mode_changed",
            (Phase::After, Change::PinMode { .. }) => "after_pin_mode_changed",
            (Phase::Before, Change::Reporting { .. }) => "before_reporting_changed",
            (Phase::After, Change::Reporting { .. }) => "after_reporting_changed",
            (Phase::Before, Change::Value { .. }) => "before_value_changed",
            (Phase::After, Change::Value { .. }) => "after_value_changed",
        }
    }
}

type Handler = Box<dyn FnMut(&ChangeEvent) + Send>;

/// Callback registry for [`ChangeEvent`]s.
///
/// Handlers run synchronously on the thread that performed the mutation,
/// in subscription order.
pub struct ChangeBus {
    handlers: BTreeMap<SubscriptionId, Handler>,
    next_id: u64,
}

impl ChangeBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers a handler for every event.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, Box::new(handler));
        id
    }

    /// Registers a channel that receives a copy of every event.
    ///
    /// The subscription stays registered until unsubscribed, even after the
    /// receiver is dropped.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(*event);
        });
        (id, rx)
    }

    /// Removes a handler. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Delivers an event to every handler.
    pub fn emit(&mut self, event: &ChangeEvent) {
        for handler in self.handlers.values_mut() {
            handler(event);
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true when no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}
