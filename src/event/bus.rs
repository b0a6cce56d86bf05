use std::cell::RefCell;

use crate::event::{EditorEvent, EventHandler};

/// A simple event bus for broadcasting editor events to registered handlers
pub struct EventBus {
    handlers: RefCell<Vec<Box<dyn EventHandler>>>,
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        // Handlers are not shared between buses
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.borrow().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Emit an event to all registered handlers.
    ///
    /// Handlers must not emit on the same bus from inside `handle_event`.
    pub fn emit(&self, event: EditorEvent) {
        log::trace!("event: {event:?}");
        for handler in &mut *self.handlers.borrow_mut() {
            handler.handle_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;

    #[test]
    fn test_emit_reaches_every_handler() {
        let bus = EventBus::new();
        let first = EventLog::new();
        let second = EventLog::new();
        bus.subscribe(Box::new(first.clone()));
        bus.subscribe(Box::new(second.clone()));

        bus.emit(EditorEvent::ColorPicked([1, 2, 3]));
        assert_eq!(first.events(), vec![EditorEvent::ColorPicked([1, 2, 3])]);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_clone_starts_empty() {
        let bus = EventBus::new();
        bus.subscribe(Box::new(EventLog::new()));
        assert_eq!(bus.clone().handler_count(), 0);
    }
}
