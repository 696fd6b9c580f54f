//! Synthetic events.
//!
//! Events bubble from the target to the document root. Listener lists
//! are snapshotted before dispatch so a handler may freely mutate the
//! tree (or the listener table) while it runs.

use crate::document::{Document, NodeId, PropertyValue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// One dispatched event instance.
pub struct Event {
    pub node: NodeId,
    pub event_type: String,
    pub detail: PropertyValue,
    prevented: Cell<bool>,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(node: NodeId, event_type: &str, detail: PropertyValue) -> Self {
        Self {
            node,
            event_type: event_type.to_string(),
            detail,
            prevented: Cell::new(false),
            stopped: Cell::new(false),
        }
    }

    pub fn prevent_default(&self) {
        self.prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

pub type EventListener = Rc<dyn Fn(&Event)>;

/// Dispatch an event at `target`, bubbling to the root.
/// Returns `false` when a listener called `prevent_default`.
pub fn dispatch_event(
    document: &Rc<RefCell<Document>>,
    target: NodeId,
    event_type: &str,
    detail: PropertyValue,
) -> bool {
    let event = Event::new(target, event_type, detail);

    // Snapshot the bubble chain and each node's listeners up front;
    // handlers may mutate the document.
    let chain: Vec<(NodeId, Vec<EventListener>)> = {
        let doc = document.borrow();
        let mut chain = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            chain.push((node, doc.listeners_for(node, event_type)));
            current = doc.parent(node);
        }
        chain
    };

    'bubble: for (_, listeners) in chain {
        for listener in listeners {
            listener(&event);
            if event.propagation_stopped() {
                break 'bubble;
            }
        }
    }

    !event.default_prevented()
}
