use log::debug;

use super::{
    EngineSettings, Observations, Optimized, TrackingEngine, UploadedObservations, ZoomedCamera,
};
use crate::camera::{CameraContext, Frame};
use crate::error::Result;
use crate::pose::{BoundingBox, Decoding, HandDecoder, HandPose, KinematicDecoder};
use crate::render::{draw_hand, Canvas, ROI_COLOR};

/// GPU評価なしのスタブエンジン（センサ・GPUなしでループを動かす用）
///
/// 最適化は初期ポーズをそのまま返し、スコアは常に0。
/// デコードと可視化はキネマティックモデルで行う。
pub struct StubEngine {
    decoder: KinematicDecoder,
    settings: EngineSettings,
}

impl StubEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            decoder: KinematicDecoder::right_hand(),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl HandDecoder for StubEngine {
    fn decode(&self, pose: &HandPose) -> Result<Decoding> {
        self.decoder.decode(pose)
    }
}

impl TrackingEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn preprocess(&mut self, zoomed: &ZoomedCamera, frame: &Frame) -> Result<Observations> {
        Ok(Observations::from_depth(frame, zoomed.roi()))
    }

    fn upload(&mut self, observations: Observations) -> Result<UploadedObservations> {
        Ok(UploadedObservations::from(&observations))
    }

    fn optimize(&mut self, observed: &UploadedObservations, init: &HandPose) -> Result<Optimized> {
        debug!(
            "stub optimize: {} particles x {} generations, {} foreground px",
            self.settings.budget.particles, self.settings.budget.generations, observed.foreground
        );
        Ok(Optimized {
            pose: *init,
            score: 0.0,
        })
    }

    fn visualize(
        &mut self,
        frame: &Frame,
        camera: &CameraContext,
        roi: &BoundingBox,
        pose: &HandPose,
    ) -> Result<Canvas> {
        let mut canvas = Canvas::from_rgb(&frame.rgb);
        canvas.draw_rect(roi, ROI_COLOR);
        let decoding = self.decoder.decode(pose)?;
        draw_hand(&mut canvas, camera, &decoding);
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FrameSource, Intrinsics, ResolutionProfile, SyntheticSource};

    fn frame_and_camera() -> (Frame, CameraContext) {
        let k = Intrinsics {
            fx: 525.0,
            fy: 525.0,
            cx: 320.0,
            cy: 240.0,
            near: 10.0,
            far: 10000.0,
        };
        let mut src = SyntheticSource::new(ResolutionProfile::High, &k, 640, 480, None).unwrap();
        let frame = Frame::from_grab(src.grab().unwrap(), ResolutionProfile::High).unwrap();
        let camera = CameraContext::from_calibration(&frame.calibration).unwrap();
        (frame, camera)
    }

    #[test]
    fn test_pipeline_returns_initial_pose() {
        let (frame, camera) = frame_and_camera();
        let mut engine = StubEngine::default();
        let pose = HandPose::default();
        let roi = BoundingBox {
            x: 100,
            y: 100,
            width: 50,
            height: 40,
        };

        let zoomed = engine.zoom(&camera, roi).unwrap();
        let obs = engine.preprocess(&zoomed, &frame).unwrap();
        assert_eq!(obs.labels.len(), 50 * 40);
        let uploaded = engine.upload(obs).unwrap();
        let optimized = engine.optimize(&uploaded, &pose).unwrap();
        assert_eq!(optimized.pose, pose);
        assert_eq!(optimized.score, 0.0);
    }

    #[test]
    fn test_visualize_draws_roi() {
        let (frame, camera) = frame_and_camera();
        let mut engine = StubEngine::default();
        let roi = BoundingBox {
            x: 10,
            y: 10,
            width: 20,
            height: 20,
        };
        let canvas = engine.visualize(&frame, &camera, &roi, &HandPose::default()).unwrap();
        assert_eq!((canvas.width, canvas.height), (640, 480));
        assert_eq!(canvas.pixel(10, 10), Some(ROI_COLOR));
    }
}
