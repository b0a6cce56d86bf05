use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EditorEvent, EventHandler};
use crate::layer::LayerId;

/// Records every event it receives. Clones share the same log, so one copy
/// can be subscribed to a bus while another is read from the UI.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<EditorEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Removes and returns everything recorded so far
    pub fn drain(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventHandler for EventLog {
    fn handle_event(&mut self, event: &EditorEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Collects layers whose pixels changed, so the host knows which
/// thumbnails to regenerate.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailInvalidator {
    dirty: Arc<Mutex<HashSet<LayerId>>>,
}

impl ThumbnailInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_dirty(&self) -> Vec<LayerId> {
        self.dirty.lock().drain().collect()
    }
}

impl EventHandler for ThumbnailInvalidator {
    fn handle_event(&mut self, event: &EditorEvent) {
        if !event.changes_pixels() {
            return;
        }
        if let Some(layer) = event.layer() {
            self.dirty.lock().insert(layer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidator_tracks_pixel_changes_only() {
        let layer = LayerId::new();
        let mut invalidator = ThumbnailInvalidator::new();
        let reader = invalidator.clone();

        invalidator.handle_event(&EditorEvent::StrokeStarted { layer });
        assert!(reader.take_dirty().is_empty());

        invalidator.handle_event(&EditorEvent::StrokeCommitted { layer });
        invalidator.handle_event(&EditorEvent::LayerUndone { layer });
        assert_eq!(reader.take_dirty(), vec![layer]);
        assert!(reader.take_dirty().is_empty());
    }

    #[test]
    fn test_drain_empties_log() {
        let mut log = EventLog::new();
        log.handle_event(&EditorEvent::ColorPicked([0, 0, 0]));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }
}
