//! Cooperative animation-frame scheduling.
//!
//! The host calls [`FrameLoop::tick`] once per animation frame. Callbacks
//! requested while a tick is running are deferred to the next tick, which is
//! what gives "clear the flag one frame later" its meaning.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

type FrameCallback = Box<dyn FnOnce()>;

#[derive(Default)]
struct FrameQueue {
    next_id: u64,
    frame: u64,
    pending: Vec<(FrameHandle, FrameCallback)>,
    /// Handles of the batch currently running that were cancelled mid-tick.
    cancelled: HashSet<FrameHandle>,
}

#[derive(Clone, Default)]
pub struct FrameLoop {
    queue: Rc<RefCell<FrameQueue>>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_frame(&self, callback: impl FnOnce() + 'static) -> FrameHandle {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let handle = FrameHandle(queue.next_id);
        queue.pending.push((handle, Box::new(callback)));
        handle
    }

    /// Cancelling an unknown or already fired handle is a no-op.
    pub fn cancel_frame(&self, handle: FrameHandle) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.pending.len();
        queue.pending.retain(|(h, _)| *h != handle);
        if queue.pending.len() == before {
            queue.cancelled.insert(handle);
        }
    }

    /// Runs every callback requested before this call. Returns how many ran.
    pub fn tick(&self) -> usize {
        let batch = {
            let mut queue = self.queue.borrow_mut();
            queue.frame += 1;
            std::mem::take(&mut queue.pending)
        };

        let mut ran = 0;
        for (handle, callback) in batch {
            let skip = self.queue.borrow_mut().cancelled.remove(&handle);
            if skip {
                continue;
            }
            callback();
            ran += 1;
        }
        self.queue.borrow_mut().cancelled.clear();
        ran
    }

    /// Ticks `n` times.
    pub fn run_frames(&self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.queue.borrow().frame
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().pending.len()
    }
}

/// Single pending-payload slot: a new value replaces the previous one.
///
/// `offer` reports whether the slot was empty, i.e. whether the caller still
/// has to schedule the frame that will drain it.
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Option<T>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> LatestSlot<T> {
    pub fn offer(&mut self, value: T) -> bool {
        self.value.replace(value).is_none()
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn is_pending(&self) -> bool {
        self.value.is_some()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

/// Time source for the bounded waits.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_requested_during_tick_run_next_frame() {
        let frames = FrameLoop::new();
        let hits = Rc::new(Cell::new(0));

        let f = frames.clone();
        let h = hits.clone();
        frames.request_frame(move || {
            h.set(h.get() + 1);
            let h2 = h.clone();
            f.request_frame(move || h2.set(h2.get() + 10));
        });

        assert_eq!(frames.tick(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(frames.pending_count(), 1);
        assert_eq!(frames.tick(), 1);
        assert_eq!(hits.get(), 11);
        assert_eq!(frames.frame_count(), 2);
    }

    #[test]
    fn test_empty_ticks_still_count_frames() {
        let frames = FrameLoop::new();
        frames.run_frames(3);
        assert_eq!(frames.frame_count(), 3);
        assert_eq!(frames.pending_count(), 0);
    }

    #[test]
    fn test_cancel_pending_and_in_batch() {
        let frames = FrameLoop::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let dropped = frames.request_frame(move || h.set(h.get() + 1));
        frames.cancel_frame(dropped);
        assert_eq!(frames.tick(), 0);

        // A callback cancelling a later one of the same batch.
        let later = Rc::new(Cell::new(None));
        let f = frames.clone();
        let l = later.clone();
        frames.request_frame(move || {
            if let Some(handle) = l.get() {
                f.cancel_frame(handle);
            }
        });
        let h = hits.clone();
        later.set(Some(frames.request_frame(move || h.set(h.get() + 1))));
        assert_eq!(frames.tick(), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_latest_slot_coalesces() {
        let mut slot = LatestSlot::default();
        assert!(slot.offer(1));
        assert!(!slot.offer(2));
        assert!(!slot.offer(3));
        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);
        assert!(slot.offer(4));
    }
}
