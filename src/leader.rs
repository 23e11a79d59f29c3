use crate::data_types::ChartId;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Tracks which chart currently owns user-driven viewport changes.
///
/// Only the leader publishes its local range changes, every other chart
/// just consumes. This is what breaks the A → B → A re-broadcast loop.
#[derive(Clone, Debug, Default)]
pub struct LeaderArbiter {
    slot: Rc<RefCell<Option<ChartId>>>,
}

impl LeaderArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins.
    pub fn mark_leader(&self, id: &ChartId) {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref() != Some(id) {
            debug!(chart = %id, "leader changed");
            *slot = Some(id.clone());
        }
    }

    /// Only clears the slot when `id` still holds it.
    pub fn unmark_leader(&self, id: &ChartId) {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref() == Some(id) {
            debug!(chart = %id, "leader released");
            *slot = None;
        }
    }

    pub fn is_leader(&self, id: &ChartId) -> bool {
        self.slot.borrow().as_ref() == Some(id)
    }

    pub fn current(&self) -> Option<ChartId> {
        self.slot.borrow().clone()
    }
}
