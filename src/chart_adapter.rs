//! Per-chart bridge between native viewport/crosshair events and the bus.

use crate::context::SyncContext;
use crate::data_types::{
    ChartId, ChartPointerEvent, SamplingPeriod, SeriesId, SyncMessage, SyncPayload, ViewportRange,
    WheelEvent,
};
use crate::error::{SyncError, SyncResult};
use crate::frame::{FrameHandle, LatestSlot};
use crate::mode_flag::ModeFlag;
use crate::subscription::Subscription;
use crate::transform::{ChartBackend, CoordinateTransform};
use crate::view_controller::ViewController;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Highest sequence a consumer has applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceWatermark(u64);

impl SequenceWatermark {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Accepts `sequence` and raises the watermark, or rejects it as stale.
    pub fn admit(&mut self, sequence: u64) -> SyncResult<()> {
        if sequence <= self.0 {
            return Err(SyncError::StaleMessage {
                sequence,
                watermark: self.0,
            });
        }
        self.0 = sequence;
        Ok(())
    }
}

/// Result of [`ChartViewportAdapter::request_current_range`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeRequestOutcome {
    /// The shared cache held a range and it was applied right away.
    AppliedFromCache,
    /// Another chart answered the request synchronously.
    Answered,
    /// Nobody answered yet; the adapter waits up to the configured timeout.
    Pending,
    /// Nothing to align with: the cache is ours or already applied.
    UpToDate,
}

/// How [`ChartViewportAdapter::initialize_viewport`] chose the first range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportInit {
    FromCache,
    Restored,
    Centered,
}

enum ExternalUpdate {
    Range(ViewportRange),
    Crosshair(Option<f64>),
}

/// Where an external update comes from. Messages are ordered by the message
/// watermark; cache reads only compete with ranges already applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Message,
    Cache,
}

struct AdapterState<C> {
    chart: C,
    period: SamplingPeriod,
    magnet: Option<ModeFlag>,
    applying_external: bool,
    release_frame: Option<FrameHandle>,
    watermark: SequenceWatermark,
    /// Sequence of the newest range shown, whatever its origin.
    range_sequence: u64,
    outgoing_range: LatestSlot<ViewportRange>,
    outgoing_crosshair: LatestSlot<Option<f64>>,
    flush_frame: Option<FrameHandle>,
    request_deadline: Option<Instant>,
    request_frame: Option<FrameHandle>,
    helper_series: Option<SeriesId>,
    last_range: Option<ViewportRange>,
    subscription: Option<Subscription>,
    torn_down: bool,
}

impl<C: ChartBackend> AdapterState<C> {
    fn apply_range_to_chart(&mut self, range: ViewportRange) {
        self.chart.set_right_offset(range.right_offset_bars);
        self.chart
            .set_visible_logical_range(range.from_logical, range.to_logical);
        self.last_range = Some(range);
    }

    fn apply_crosshair(&mut self, time: Option<f64>) {
        let Some(time) = time else {
            self.chart.clear_crosshair_position();
            return;
        };
        let series = match self.chart.primary_series().or(self.helper_series) {
            Some(series) => series,
            None => match self.chart.add_helper_series() {
                Some(series) => {
                    trace!("created crosshair helper series");
                    self.helper_series = Some(series);
                    series
                }
                None => {
                    debug!("chart refused a helper series, crosshair not mirrored");
                    return;
                }
            },
        };
        // Only the vertical line matters for a mirrored crosshair.
        self.chart.set_crosshair_position(f64::NAN, time, series);
    }

    fn current_range(&self, fallback_offset: i32) -> Option<ViewportRange> {
        let (from, to) = self.chart.visible_logical_range()?;
        let right = self.chart.right_offset().unwrap_or(fallback_offset);
        Some(ViewportRange::new(from, to, right)).filter(|r| r.is_finite())
    }

    fn pending_frames(&mut self) -> Vec<FrameHandle> {
        [
            self.release_frame.take(),
            self.flush_frame.take(),
            self.request_frame.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

struct AdapterShared<C> {
    id: ChartId,
    context: SyncContext,
    state: RefCell<AdapterState<C>>,
    observers: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
    next_observer: Cell<u64>,
}

impl<C: ChartBackend + 'static> AdapterShared<C> {
    fn receive(self: &Rc<Self>, message: &SyncMessage) {
        if message.source_id == self.id {
            return;
        }
        match &message.payload {
            SyncPayload::RangeRequest => self.answer_range_request(),
            SyncPayload::RangeChange(range) => {
                self.apply_external(message.sequence, ExternalUpdate::Range(*range), Origin::Message);
            }
            SyncPayload::CrosshairMove { time } => {
                self.apply_external(
                    message.sequence,
                    ExternalUpdate::Crosshair(*time),
                    Origin::Message,
                );
            }
        }
    }

    /// Applies a foreign update under the echo guard. Returns whether it
    /// was applied.
    fn apply_external(
        self: &Rc<Self>,
        sequence: u64,
        update: ExternalUpdate,
        origin: Origin,
    ) -> bool {
        let moved_viewport = {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                warn!(chart = %self.id, sequence, "adapter busy, external update dropped");
                return false;
            };
            if state.torn_down {
                return false;
            }
            if let ExternalUpdate::Range(_) = update {
                if sequence <= state.range_sequence {
                    trace!(chart = %self.id, sequence, ?origin, "older than the range shown");
                    return false;
                }
            }
            if origin == Origin::Message {
                if let Err(err) = state.watermark.admit(sequence) {
                    trace!(chart = %self.id, %err, "dropped");
                    return false;
                }
            }
            state.applying_external = true;
            match update {
                ExternalUpdate::Range(range) => {
                    state.range_sequence = sequence;
                    state.apply_range_to_chart(range);
                    if state.request_deadline.take().is_some() {
                        debug!(chart = %self.id, sequence, "range request answered");
                        if let Some(handle) = state.request_frame.take() {
                            self.context.frames().cancel_frame(handle);
                        }
                    }
                    true
                }
                ExternalUpdate::Crosshair(time) => {
                    state.apply_crosshair(time);
                    false
                }
            }
        };
        self.schedule_release();
        if moved_viewport {
            self.notify_observers();
        }
        true
    }

    /// Applies a range that originates locally (restore, clamp, wheel zoom)
    /// while still suppressing the native echo.
    fn apply_local(self: &Rc<Self>, range: ViewportRange) {
        {
            let mut state = self.state.borrow_mut();
            state.applying_external = true;
            state.apply_range_to_chart(range);
        }
        self.schedule_release();
    }

    /// Makes `range` the group's cached range right away, ahead of the frame
    /// that broadcasts it, so that a chart joining meanwhile reads it.
    fn stage_range(&self, range: ViewportRange) {
        let sequence = self.context.bus().seed_range(&self.id, range);
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.range_sequence = sequence;
        }
    }

    /// Clears the echo guard on the next frame, never synchronously: the
    /// native chart may report the change later in this turn.
    fn schedule_release(self: &Rc<Self>) {
        let frames = self.context.frames();
        let mut state = self.state.borrow_mut();
        if let Some(handle) = state.release_frame.take() {
            frames.cancel_frame(handle);
        }
        let weak = Rc::downgrade(self);
        state.release_frame = Some(frames.request_frame(move || {
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.borrow_mut();
                state.applying_external = false;
                state.release_frame = None;
            }
        }));
    }

    fn schedule_flush(self: &Rc<Self>) {
        let mut state = self.state.borrow_mut();
        if state.flush_frame.is_some() || state.torn_down {
            return;
        }
        let weak = Rc::downgrade(self);
        state.flush_frame = Some(self.context.frames().request_frame(move || {
            if let Some(shared) = weak.upgrade() {
                shared.flush();
            }
        }));
    }

    /// Publishes whatever the coalescing slots hold.
    fn flush(&self) {
        let (range, crosshair) = {
            let mut state = self.state.borrow_mut();
            state.flush_frame = None;
            if state.torn_down {
                return;
            }
            (
                state.outgoing_range.take(),
                state.outgoing_crosshair.take(),
            )
        };
        let bus = self.context.bus();
        if let Some(range) = range {
            bus.publish(&self.id, SyncPayload::RangeChange(range));
        }
        if let Some(time) = crosshair {
            bus.publish(&self.id, SyncPayload::CrosshairMove { time });
        }
    }

    fn answer_range_request(&self) {
        let answer = {
            let Ok(state) = self.state.try_borrow() else {
                return;
            };
            if state.torn_down {
                return;
            }
            match self.context.bus().last_range() {
                Some(cached) if cached.source_id == self.id => Some(cached.range),
                Some(_) => None,
                None => state.last_range,
            }
        };
        if let Some(range) = answer {
            debug!(chart = %self.id, "answering range request");
            self.context
                .bus()
                .publish(&self.id, SyncPayload::RangeChange(range));
        }
    }

    fn schedule_request_watch(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let handle = self.context.frames().request_frame(move || {
            if let Some(shared) = weak.upgrade() {
                shared.check_request_timeout();
            }
        });
        self.state.borrow_mut().request_frame = Some(handle);
    }

    fn check_request_timeout(self: &Rc<Self>) {
        let expired = {
            let mut state = self.state.borrow_mut();
            state.request_frame = None;
            match state.request_deadline {
                None => return,
                Some(deadline) if self.context.now() >= deadline => {
                    state.request_deadline = None;
                    true
                }
                Some(_) => false,
            }
        };
        if expired {
            debug!(chart = %self.id, err = %SyncError::Timeout, "proceeding unsynchronized");
        } else {
            self.schedule_request_watch();
        }
    }

    fn notify_observers(&self) {
        let observers: Vec<Rc<dyn Fn()>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for observer in observers {
            observer();
        }
    }
}

/// Keeps one chart aligned with the rest of its sync group.
///
/// The host forwards native events to the `handle_*` methods and ticks the
/// group's frame loop. Dropping the adapter tears it down.
pub struct ChartViewportAdapter<C: ChartBackend + 'static> {
    shared: Rc<AdapterShared<C>>,
}

impl<C: ChartBackend + 'static> ChartViewportAdapter<C> {
    pub fn new(
        id: impl Into<ChartId>,
        chart: C,
        period: SamplingPeriod,
        context: &SyncContext,
    ) -> Self {
        let shared = Rc::new(AdapterShared {
            id: id.into(),
            context: context.clone(),
            state: RefCell::new(AdapterState {
                chart,
                period,
                magnet: None,
                applying_external: false,
                release_frame: None,
                watermark: SequenceWatermark::default(),
                range_sequence: 0,
                outgoing_range: LatestSlot::default(),
                outgoing_crosshair: LatestSlot::default(),
                flush_frame: None,
                request_deadline: None,
                request_frame: None,
                helper_series: None,
                last_range: None,
                subscription: None,
                torn_down: false,
            }),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
        });

        let weak: Weak<AdapterShared<C>> = Rc::downgrade(&shared);
        let subscription = context.bus().subscribe(move |message| {
            if let Some(shared) = weak.upgrade() {
                shared.receive(message);
            }
        });
        shared.state.borrow_mut().subscription = Some(subscription);
        debug!(chart = %shared.id, %period, "adapter attached");

        Self { shared }
    }

    pub fn with_magnet(self, magnet: ModeFlag) -> Self {
        self.shared.state.borrow_mut().magnet = Some(magnet);
        self
    }

    pub fn id(&self) -> &ChartId {
        &self.shared.id
    }

    pub fn period(&self) -> SamplingPeriod {
        self.shared.state.borrow().period
    }

    pub fn set_period(&self, period: SamplingPeriod) {
        self.shared.state.borrow_mut().period = period;
    }

    pub fn is_applying_external(&self) -> bool {
        self.shared.state.borrow().applying_external
    }

    pub fn watermark(&self) -> u64 {
        self.shared.state.borrow().watermark.value()
    }

    pub fn last_range(&self) -> Option<ViewportRange> {
        self.shared.state.borrow().last_range
    }

    pub fn has_pending_request(&self) -> bool {
        self.shared.state.borrow().request_deadline.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.state.borrow().torn_down
    }

    pub fn with_chart<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.shared.state.borrow().chart)
    }

    pub fn with_chart_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.shared.state.borrow_mut().chart)
    }

    /// Delivers a message as if it came from the bus.
    pub fn receive(&self, message: &SyncMessage) {
        self.shared.receive(message);
    }

    pub fn handle_pointer_down(&self) {
        self.shared.context.leader().mark_leader(&self.shared.id);
    }

    pub fn handle_pointer_up(&self) {
        self.shared.context.leader().unmark_leader(&self.shared.id);
    }

    pub fn handle_touch_start(&self) {
        self.handle_pointer_down();
    }

    pub fn handle_touch_end(&self) {
        self.handle_pointer_up();
    }

    /// Native "visible range changed" notification.
    pub fn handle_visible_range_changed(&self) {
        let shared = &self.shared;
        let config = shared.context.config();
        let is_leader = shared.context.leader().is_leader(&shared.id);

        let (range, clamped, needs_flush) = {
            // Already borrowed means we are inside our own setter: an echo.
            let Ok(mut state) = shared.state.try_borrow_mut() else {
                trace!(chart = %shared.id, "re-entrant range change dropped");
                return;
            };
            if state.torn_down {
                return;
            }
            if !is_leader || state.applying_external {
                trace!(chart = %shared.id, is_leader, "range change not published");
                drop(state);
                shared.notify_observers();
                return;
            }
            let Some(requested) = state.current_range(config.future_padding_bars) else {
                return;
            };
            let min_bars = config.min_bars_for(state.period);
            let (range, clamped) = ViewController::clamp_min_bars(requested, min_bars);
            if clamped {
                debug!(chart = %shared.id, min_bars, "range widened to the period minimum");
                state.applying_external = true;
                state.apply_range_to_chart(range);
            }
            state.last_range = Some(range);
            (range, clamped, state.outgoing_range.offer(range))
        };

        shared.stage_range(range);
        if clamped {
            shared.schedule_release();
        }
        if needs_flush {
            shared.schedule_flush();
        }
        shared.notify_observers();
    }

    /// Native crosshair move. Snaps the local crosshair in magnet mode and
    /// queues the time for the other charts.
    pub fn handle_crosshair_moved(&self, event: &ChartPointerEvent) {
        let shared = &self.shared;
        let needs_flush = {
            let Ok(mut state) = shared.state.try_borrow_mut() else {
                return;
            };
            if state.torn_down {
                return;
            }
            if state.applying_external {
                trace!(chart = %shared.id, "crosshair echo dropped");
                return;
            }
            let magnet_on = state.magnet.as_ref().is_some_and(|m| m.get());
            if magnet_on {
                if let (Some(time), Some(point), Some(datum), Some(series)) = (
                    event.time,
                    event.point,
                    event.hovered,
                    state.chart.primary_series(),
                ) {
                    let raw = CoordinateTransform::new(&state.chart).pixel_to_price(series, point.y);
                    let snapped = match raw {
                        Some(raw) => datum.closest_to(raw),
                        None => datum.closest_to(f64::NAN),
                    };
                    state.chart.set_crosshair_position(snapped, time, series);
                }
            }
            state.outgoing_crosshair.offer(event.time)
        };
        if needs_flush {
            shared.schedule_flush();
        }
    }

    /// Cursor-anchored wheel zoom. Marks this chart as leader.
    pub fn handle_wheel(&self, event: &WheelEvent) {
        let shared = &self.shared;
        let config = shared.context.config();
        shared.context.leader().mark_leader(&shared.id);

        let (next, needs_flush) = {
            let Ok(mut state) = shared.state.try_borrow_mut() else {
                return;
            };
            if state.torn_down {
                return;
            }
            let page_px = state.chart.plot_size().map(|s| s.y).unwrap_or(800.0);
            let Some(delta) =
                ViewController::normalize_wheel_delta(event, config.wheel_line_px, page_px)
            else {
                return;
            };
            let Some(current) = state.current_range(config.future_padding_bars) else {
                return;
            };
            let cursor = CoordinateTransform::new(&state.chart).pixel_to_logical(event.offset_x);
            let factor = ViewController::compute_zoom_factor(delta, config.wheel_sensitivity);
            let min_bars = config.min_bars_for(state.period);
            let next = ViewController::zoom_at_cursor(current, cursor, factor, min_bars);

            state.applying_external = true;
            state.apply_range_to_chart(next);
            (next, state.outgoing_range.offer(next))
        };

        shared.stage_range(next);
        shared.schedule_release();
        if needs_flush {
            shared.schedule_flush();
        }
        shared.notify_observers();
    }

    /// Aligns a late-joining chart. Reads the shared cache first and only
    /// falls back to a request round trip when it is empty.
    pub fn request_current_range(&self) -> RangeRequestOutcome {
        let shared = &self.shared;
        let bus = shared.context.bus();

        if let Some(cached) = bus.last_range() {
            if cached.source_id == shared.id {
                return RangeRequestOutcome::UpToDate;
            }
            let applied = shared.apply_external(
                cached.sequence,
                ExternalUpdate::Range(cached.range),
                Origin::Cache,
            );
            return if applied {
                RangeRequestOutcome::AppliedFromCache
            } else {
                RangeRequestOutcome::UpToDate
            };
        }

        {
            let mut state = shared.state.borrow_mut();
            if state.torn_down {
                return RangeRequestOutcome::UpToDate;
            }
            if state.request_deadline.is_some() {
                return RangeRequestOutcome::Pending;
            }
            state.request_deadline =
                Some(shared.context.now() + shared.context.config().range_request_timeout());
        }

        bus.publish(&shared.id, SyncPayload::RangeRequest);

        if self.has_pending_request() {
            shared.schedule_request_watch();
            RangeRequestOutcome::Pending
        } else {
            RangeRequestOutcome::Answered
        }
    }

    /// Abandons a pending range request.
    pub fn cancel_range_request(&self) {
        let handle = {
            let mut state = self.shared.state.borrow_mut();
            state.request_deadline = None;
            state.request_frame.take()
        };
        if let Some(handle) = handle {
            self.shared.context.frames().cancel_frame(handle);
        }
    }

    /// Chooses the first visible range of a freshly created chart: the
    /// group's cached range, else `restore`, else the last bar centered.
    pub fn initialize_viewport(&self, restore: Option<ViewportRange>) -> ViewportInit {
        let shared = &self.shared;
        let bus = shared.context.bus();

        if let Some(cached) = bus.last_range() {
            // Rejected only when a range at least as new is already shown.
            shared.apply_external(
                cached.sequence,
                ExternalUpdate::Range(cached.range),
                Origin::Cache,
            );
            return ViewportInit::FromCache;
        }

        let (range, how) = match restore.filter(|r| r.is_finite()) {
            Some(range) => (range, ViewportInit::Restored),
            None => {
                let bar_count = shared.state.borrow().chart.bar_count();
                let bars = shared.context.config().default_visible_bars;
                (
                    ViewController::centered_on_last_bar(bar_count, bars),
                    ViewportInit::Centered,
                )
            }
        };
        shared.apply_local(range);
        shared.stage_range(range);
        shared.notify_observers();
        how
    }

    pub fn handle_resize(&self, width: f64, height: f64) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            if !state.torn_down {
                state.chart.resize(width, height);
            }
        }
    }

    /// Registers a callback fired on every local or applied viewport change.
    pub fn observe_viewport(&self, observer: impl Fn() + 'static) -> Subscription {
        let shared = &self.shared;
        let id = shared.next_observer.get() + 1;
        shared.next_observer.set(id);
        shared
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));

        let weak = Rc::downgrade(shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.observers.borrow_mut().retain(|(oid, _)| *oid != id);
            }
        })
    }

    /// Detaches from the group. Idempotent and safe on a destroyed chart.
    /// Returns the last visible range so the host can restore it later.
    pub fn teardown(&self) -> Option<ViewportRange> {
        let shared = &self.shared;
        let (subscription, frames, last) = {
            let Ok(mut state) = shared.state.try_borrow_mut() else {
                warn!(chart = %shared.id, "teardown while busy, skipped");
                return None;
            };
            if state.torn_down {
                return None;
            }
            state.torn_down = true;
            state.applying_external = false;
            state.outgoing_range.clear();
            state.outgoing_crosshair.clear();
            state.request_deadline = None;
            if let Some(helper) = state.helper_series.take() {
                state.chart.remove_series(helper);
            }
            let fallback = shared.context.config().future_padding_bars;
            let last = state.current_range(fallback).or(state.last_range);
            (state.subscription.take(), state.pending_frames(), last)
        };

        for handle in frames {
            shared.context.frames().cancel_frame(handle);
        }
        drop(subscription);
        shared.context.leader().unmark_leader(&shared.id);
        shared.observers.borrow_mut().clear();
        debug!(chart = %shared.id, "adapter detached");
        last
    }
}

impl<C: ChartBackend + 'static> Drop for ChartViewportAdapter<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
