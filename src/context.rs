use crate::config::SyncConfig;
use crate::frame::{Clock, FrameLoop, SystemClock};
use crate::leader::LeaderArbiter;
use crate::sync_bus::{SequenceSource, ViewportSyncBus};
use std::rc::Rc;
use std::time::Instant;

/// Everything the charts of one sync group share.
///
/// Cloning is cheap and yields a handle on the same group. Independent
/// groups are simply independent contexts.
#[derive(Clone)]
pub struct SyncContext {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    bus: ViewportSyncBus,
    leader: LeaderArbiter,
    frames: FrameLoop,
    clock: Rc<dyn Clock>,
    config: SyncConfig,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl SyncContext {
    pub fn new(config: SyncConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::default()
    }

    pub fn bus(&self) -> &ViewportSyncBus {
        &self.inner.bus
    }

    pub fn leader(&self) -> &LeaderArbiter {
        &self.inner.leader
    }

    pub fn frames(&self) -> &FrameLoop {
        &self.inner.frames
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Runs one animation frame.
    pub fn tick(&self) -> usize {
        self.inner.frames.tick()
    }
}

#[derive(Default)]
pub struct SyncContextBuilder {
    config: Option<SyncConfig>,
    clock: Option<Rc<dyn Clock>>,
    bus: Option<ViewportSyncBus>,
    frames: Option<FrameLoop>,
}

impl SyncContextBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Rc::new(clock));
        self
    }

    pub fn sequence(mut self, sequence: impl SequenceSource + 'static) -> Self {
        self.bus = Some(ViewportSyncBus::with_sequence(sequence));
        self
    }

    /// Shares a frame loop with other components of the host.
    pub fn frames(mut self, frames: FrameLoop) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn build(self) -> SyncContext {
        SyncContext {
            inner: Rc::new(ContextInner {
                bus: self.bus.unwrap_or_default(),
                leader: LeaderArbiter::new(),
                frames: self.frames.unwrap_or_default(),
                clock: self.clock.unwrap_or_else(|| Rc::new(SystemClock)),
                config: self.config.unwrap_or_default(),
            }),
        }
    }
}
