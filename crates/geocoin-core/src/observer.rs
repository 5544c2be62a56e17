//! Change notifications for the rendering layer.
//!
//! The session calls every registered [`SessionObserver`] after each
//! mutation, synchronously and in registration order. Events carry
//! snapshots, so an observer can redraw without reaching back into the
//! session.

use geocoin_types::{CacheView, CellAddress, PlayerView};

/// Something the rendering layer may need to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The active neighborhood was rebuilt around `center`.
    ///
    /// Markers for every previous cache should be dropped and `caches`
    /// drawn instead.
    NeighborhoodRespawned {
        /// The player's cell.
        center: CellAddress,
        /// Every active cache, in address order.
        caches: Vec<CacheView>,
    },
    /// One cache's contents changed.
    CacheChanged(CacheView),
    /// The player's position, score, or inventory changed.
    PlayerChanged(PlayerView),
    /// All state was cleared.
    Reset,
}

/// Receives [`SessionEvent`]s.
pub trait SessionObserver {
    /// Handle one event.
    fn notify(&mut self, event: &SessionEvent);
}

/// An observer that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: std::rc::Rc<std::cell::RefCell<Vec<SessionEvent>>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event received so far, oldest first.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    /// Drop the recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl SessionObserver for RecordingObserver {
    fn notify(&mut self, event: &SessionEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
