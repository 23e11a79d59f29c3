//! Two-point measurement tool layered on one chart.
//!
//! ```text
//! Idle --click--> Armed --move--> Live --click--> Finalized --click--> Idle
//! ```
//!
//! Right click, ruler mode turning off, a pan gesture or any visible range
//! change send every state back to Idle and remove the shapes.

mod overlay;
mod resolve;
mod surface;

pub use overlay::RulerOverlay;
pub use resolve::resolve_point;
pub use surface::{ArrowLine, DrawingSurface, FilledRect, FloatingLabel, GuideLine, RecordingSurface};

use crate::chart_adapter::ChartViewportAdapter;
use crate::context::SyncContext;
use crate::data_types::{ChartPointerEvent, Measurement, MeasurementReport, PointerButton, SeriesId};
use crate::frame::{FrameHandle, FrameLoop, LatestSlot};
use crate::mode_flag::ModeFlag;
use crate::subscription::Subscription;
use crate::theme::RulerTheme;
use crate::transform::ChartBackend;
use crate::view_controller::ViewController;
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

type CompletionCallback = Box<dyn FnMut(&MeasurementReport)>;

/// Press-and-drag tracking used to tell a pan from a click.
#[derive(Debug, Default)]
struct PanGesture {
    origin: Option<DVec2>,
    /// The chart may still deliver a click after a pan; it must not arm.
    swallow_click: bool,
}

struct RulerState<C, S> {
    chart: C,
    series: SeriesId,
    surface: S,
    ruler_mode: ModeFlag,
    magnet: ModeFlag,
    theme: RulerTheme,
    pan_threshold_px: f64,
    measurement: Measurement,
    pan: PanGesture,
    pending_move: LatestSlot<ChartPointerEvent>,
    move_frame: Option<FrameHandle>,
    watch_frame: Option<FrameHandle>,
    last_mode_on: bool,
    interactions_locked: bool,
    torn_down: bool,
}

impl<C: ChartBackend, S: DrawingSurface> RulerState<C, S> {
    fn redraw(&mut self) {
        match RulerOverlay::project(&self.measurement, &self.chart, self.series, &self.theme) {
            Ok(overlay) => overlay.draw(&mut self.surface),
            Err(err) => {
                trace!(%err, "overlay not drawable");
                self.surface.clear();
            }
        }
    }

    fn lock_interactions(&mut self, locked: bool) {
        if self.interactions_locked != locked {
            self.interactions_locked = locked;
            self.chart.set_interactions_locked(locked);
        }
    }

    /// Back to Idle with nothing on screen.
    fn close(&mut self) {
        if !self.measurement.is_idle() {
            debug!("ruler cleared");
        }
        self.measurement = Measurement::Idle;
        self.pending_move.clear();
        self.surface.clear();
        self.lock_interactions(false);
    }

    fn resolve(&self, event: &ChartPointerEvent) -> Option<crate::data_types::MeasurementPoint> {
        match resolve_point(&self.chart, self.series, event, self.magnet.get()) {
            Ok(point) => Some(point),
            Err(err) => {
                trace!(%err, "ruler event ignored");
                None
            }
        }
    }
}

struct RulerShared<C, S> {
    frames: FrameLoop,
    state: RefCell<RulerState<C, S>>,
    on_complete: RefCell<Option<CompletionCallback>>,
    mode_subscription: RefCell<Option<Subscription>>,
}

impl<C: ChartBackend + 'static, S: DrawingSurface + 'static> RulerShared<C, S> {
    fn schedule_move(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let handle = self.frames.request_frame(move || {
            if let Some(shared) = weak.upgrade() {
                shared.apply_move();
            }
        });
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.move_frame = Some(handle);
        }
    }

    fn apply_move(&self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        state.move_frame = None;
        let Some(event) = state.pending_move.take() else {
            return;
        };
        if state.torn_down || !state.ruler_mode.get() {
            return;
        }
        let start = match state.measurement {
            Measurement::Armed { start } | Measurement::Live { start, .. } => start,
            _ => return,
        };
        if let Some(current) = state.resolve(&event) {
            state.measurement = Measurement::Live { start, current };
            state.redraw();
        }
    }

    fn schedule_watch(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let handle = self.frames.request_frame(move || {
            if let Some(shared) = weak.upgrade() {
                shared.poll_mode();
                shared.schedule_watch();
            }
        });
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if state.torn_down {
                self.frames.cancel_frame(handle);
            } else {
                state.watch_frame = Some(handle);
            }
        }
    }

    /// Fallback for hosts that flip the mode flag without notifying.
    fn poll_mode(&self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if state.torn_down {
            return;
        }
        let on = state.ruler_mode.get();
        if state.last_mode_on && !on {
            state.close();
        }
        state.last_mode_on = on;
    }

    fn on_mode_pushed(&self, on: bool) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            // Busy: the next poll picks the change up.
            return;
        };
        if state.torn_down {
            return;
        }
        if !on {
            state.close();
        }
        state.last_mode_on = on;
    }

    fn invalidate(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if !state.torn_down && !state.measurement.is_idle() {
                state.close();
            }
        }
    }

    fn complete(&self, report: &MeasurementReport) {
        if let Ok(mut callback) = self.on_complete.try_borrow_mut() {
            if let Some(callback) = callback.as_mut() {
                callback(report);
            }
        }
    }
}

/// Interactive ruler bound to one chart and one series.
///
/// The host forwards the chart's click, crosshair-move, context-menu and
/// raw pointer events, and ticks the frame loop.
pub struct RulerTool<C: ChartBackend + 'static, S: DrawingSurface + 'static> {
    shared: Rc<RulerShared<C, S>>,
}

impl<C: ChartBackend + 'static, S: DrawingSurface + 'static> RulerTool<C, S> {
    pub fn new(
        chart: C,
        series: SeriesId,
        surface: S,
        ruler_mode: ModeFlag,
        magnet: ModeFlag,
        context: &SyncContext,
    ) -> Self {
        let last_mode_on = ruler_mode.get();
        let shared = Rc::new(RulerShared {
            frames: context.frames().clone(),
            state: RefCell::new(RulerState {
                chart,
                series,
                surface,
                ruler_mode: ruler_mode.clone(),
                magnet,
                theme: RulerTheme::default(),
                pan_threshold_px: context.config().pan_threshold_px,
                measurement: Measurement::Idle,
                pan: PanGesture::default(),
                pending_move: LatestSlot::default(),
                move_frame: None,
                watch_frame: None,
                last_mode_on,
                interactions_locked: false,
                torn_down: false,
            }),
            on_complete: RefCell::new(None),
            mode_subscription: RefCell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        let subscription = ruler_mode.observe(move |on| {
            if let Some(shared) = weak.upgrade() {
                shared.on_mode_pushed(on);
            }
        });
        *shared.mode_subscription.borrow_mut() = Some(subscription);
        shared.schedule_watch();

        Self { shared }
    }

    pub fn with_theme(self, theme: RulerTheme) -> Self {
        self.shared.state.borrow_mut().theme = theme;
        self
    }

    /// Called once per measurement reaching Finalized.
    pub fn on_complete(self, callback: impl FnMut(&MeasurementReport) + 'static) -> Self {
        *self.shared.on_complete.borrow_mut() = Some(Box::new(callback));
        self
    }

    pub fn measurement(&self) -> Measurement {
        self.shared.state.borrow().measurement
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.shared.state.borrow().surface)
    }

    pub fn with_chart<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.shared.state.borrow().chart)
    }

    /// Native click on the chart.
    pub fn handle_click(&self, event: &ChartPointerEvent) {
        let report = {
            let Ok(mut state) = self.shared.state.try_borrow_mut() else {
                return;
            };
            if state.torn_down || !state.ruler_mode.get() {
                return;
            }
            if std::mem::take(&mut state.pan.swallow_click) {
                trace!("click after pan ignored");
                return;
            }

            let measurement = state.measurement;
            match measurement {
                Measurement::Finalized { .. } => {
                    // Only clears: the next click arms.
                    state.close();
                    None
                }
                Measurement::Idle => {
                    if let Some(start) = state.resolve(event) {
                        debug!(time = start.time, price = start.price, "ruler armed");
                        state.measurement = Measurement::Armed { start };
                        state.lock_interactions(true);
                        state.redraw();
                    }
                    None
                }
                Measurement::Armed { start } | Measurement::Live { start, .. } => {
                    state.resolve(event).map(|end| {
                        state.measurement = Measurement::Finalized { start, end };
                        state.pending_move.clear();
                        state.lock_interactions(false);
                        state.redraw();
                        MeasurementReport::between(start, end)
                    })
                }
            }
        };

        if let Some(report) = report {
            debug!(bars = report.bar_count, duration = %report.duration_label, "measurement completed");
            self.shared.complete(&report);
        }
    }

    /// Native crosshair move, coalesced to one update per frame.
    pub fn handle_crosshair_move(&self, event: &ChartPointerEvent) {
        let needs_frame = {
            let Ok(mut state) = self.shared.state.try_borrow_mut() else {
                return;
            };
            if state.torn_down || !state.ruler_mode.get() || !state.measurement.is_in_progress() {
                return;
            }
            state.pending_move.offer(*event)
        };
        if needs_frame {
            self.shared.schedule_move();
        }
    }

    pub fn handle_context_menu(&self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            if !state.torn_down && state.ruler_mode.get() {
                state.close();
            }
        }
    }

    pub fn handle_pointer_down(&self, button: PointerButton, position: DVec2) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            if state.torn_down || !state.ruler_mode.get() {
                return;
            }
            state.pan.swallow_click = false;
            state.pan.origin = (button == PointerButton::Primary).then_some(position);
        }
    }

    pub fn handle_pointer_move(&self, position: DVec2) {
        let Ok(mut state) = self.shared.state.try_borrow_mut() else {
            return;
        };
        if state.torn_down || !state.ruler_mode.get() {
            return;
        }
        let Some(origin) = state.pan.origin else {
            return;
        };
        if ViewController::exceeds_pan_threshold(origin, position, state.pan_threshold_px) {
            trace!("pan detected");
            state.pan.origin = None;
            state.pan.swallow_click = true;
            state.close();
        }
    }

    pub fn handle_pointer_up(&self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            state.pan.origin = None;
        }
    }

    /// Pan or zoom: pixel positions are stale, drop everything.
    pub fn handle_visible_range_changed(&self) {
        self.shared.invalidate();
    }

    /// Invalidates the ruler whenever `adapter` reports a viewport change.
    pub fn follow<B: ChartBackend + 'static>(&self, adapter: &ChartViewportAdapter<B>) -> Subscription {
        let weak = Rc::downgrade(&self.shared);
        adapter.observe_viewport(move || {
            if let Some(shared) = weak.upgrade() {
                shared.invalidate();
            }
        })
    }

    /// Reprojects the current measurement, e.g. after a resize.
    pub fn redraw(&self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            if !state.torn_down {
                state.redraw();
            }
        }
    }

    /// Idempotent; removes shapes and cancels every frame callback.
    pub fn teardown(&self) {
        let handles = {
            let Ok(mut state) = self.shared.state.try_borrow_mut() else {
                return;
            };
            if state.torn_down {
                return;
            }
            state.close();
            state.torn_down = true;
            [state.move_frame.take(), state.watch_frame.take()]
        };
        for handle in handles.into_iter().flatten() {
            self.shared.frames.cancel_frame(handle);
        }
        self.shared.mode_subscription.borrow_mut().take();
        self.shared.on_complete.borrow_mut().take();
    }
}

impl<C: ChartBackend + 'static, S: DrawingSurface + 'static> Drop for RulerTool<C, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
