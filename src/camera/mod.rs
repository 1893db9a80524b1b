pub mod acquisition;
pub mod calibration;
pub mod context;

pub use acquisition::{
    DepthImage, Frame, FrameSource, Grab, RawImage, ResolutionProfile, RgbImage, SyntheticSource,
};
pub use calibration::{viewport_transform, CalibrationSet, Intrinsics};
pub use context::CameraContext;
