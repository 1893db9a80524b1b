pub mod controller;
pub mod perf;
pub mod state;

pub use controller::{
    ExportStatus, Flow, FrameController, LoopSettings, LoopState, RunSummary, StopReason,
};
pub use perf::PerformanceMonitor;
pub use state::{Mode, TrackingState};
