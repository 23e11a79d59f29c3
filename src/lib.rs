//! chart_sync: viewport, crosshair and ruler synchronisation across charts

pub mod chart_adapter;
pub mod config;
pub mod context;
pub mod data_types;
pub mod error;
pub mod frame;
pub mod leader;
pub mod memory_chart;
pub mod mode_flag;
pub mod ruler;
pub mod subscription;
pub mod sync_bus;
pub mod theme;
pub mod transform;
pub mod utils;
pub mod view_controller;

pub use chart_adapter::{ChartViewportAdapter, RangeRequestOutcome, SequenceWatermark, ViewportInit};
pub use config::{MinBarsTable, SyncConfig};
pub use context::{SyncContext, SyncContextBuilder};
pub use data_types::{
    ChartId, ChartPointerEvent, Measurement, MeasurementPoint, MeasurementReport, SamplingPeriod,
    SeriesDatum, SeriesId, SyncMessage, SyncPayload, ViewportRange,
};
pub use error::{SyncError, SyncResult};
pub use frame::{Clock, FrameLoop, ManualClock, SystemClock};
pub use leader::LeaderArbiter;
pub use memory_chart::MemoryChart;
pub use mode_flag::ModeFlag;
pub use ruler::{DrawingSurface, RecordingSurface, RulerTool};
pub use subscription::Subscription;
pub use sync_bus::ViewportSyncBus;
pub use transform::{ChartBackend, CoordinateTransform};
