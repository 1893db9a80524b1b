//! Tracking engine boundary.
//!
//! Rendering, segmentation, pose optimization and decoding live behind
//! [`TrackingEngine`]. The stages are typed so they can only run in order:
//! a [`ZoomedCamera`] is needed to preprocess, the resulting [`Observations`]
//! must be uploaded, and only [`UploadedObservations`] can be optimized against.

pub mod stub;

use nalgebra::Matrix4;

use crate::camera::{CameraContext, Frame};
use crate::error::Result;
use crate::pose::{BoundingBox, HandDecoder, HandPose, POSE_DIM};
use crate::render::Canvas;

pub use stub::StubEngine;

/// PSOの探索予算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerBudget {
    pub particles: u32,
    pub generations: u32,
}

impl Default for OptimizerBudget {
    fn default() -> Self {
        Self {
            particles: 64,
            generations: 25,
        }
    }
}

/// ランダム化の分散: 位置 / 回転(クォータニオン) / 指ごとの関節角
pub const POSITION_VARIANCE: [f64; 3] = [10.0, 10.0, 10.0];
pub const ROTATION_VARIANCE: [f64; 4] = [0.1, 0.1, 0.1, 0.1];
pub const FINGER_VARIANCE: [f64; 4] = [0.1, 0.1, 0.1, 0.1];

/// エンジン生成時に渡す探索設定
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub budget: OptimizerBudget,
    pub variances: [f64; POSE_DIM],
}

impl EngineSettings {
    pub fn new(budget: OptimizerBudget) -> Self {
        let mut variances = [0.0; POSE_DIM];
        variances[..3].copy_from_slice(&POSITION_VARIANCE);
        variances[3..7].copy_from_slice(&ROTATION_VARIANCE);
        for finger in variances[7..].chunks_exact_mut(FINGER_VARIANCE.len()) {
            finger.copy_from_slice(&FINGER_VARIANCE);
        }
        Self { budget, variances }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new(OptimizerBudget::default())
    }
}

/// ROIにズームした仮想カメラ
#[derive(Debug, Clone)]
pub struct ZoomedCamera {
    roi: BoundingBox,
    projection: Matrix4<f64>,
}

impl ZoomedCamera {
    pub fn new(camera: &CameraContext, roi: BoundingBox) -> Self {
        Self {
            roi,
            projection: zoom_projection(&camera.projection, &roi, camera.width, camera.height),
        }
    }

    pub fn roi(&self) -> &BoundingBox {
        &self.roi
    }

    /// ROIをクリップ空間全体に写す射影行列
    pub fn projection(&self) -> &Matrix4<f64> {
        &self.projection
    }
}

/// 射影行列をROIにズームする
///
/// ROIに対応するNDC範囲を [-1, 1] に拡大する行列を左から掛ける。
pub fn zoom_projection(
    projection: &Matrix4<f64>,
    roi: &BoundingBox,
    width: u32,
    height: u32,
) -> Matrix4<f64> {
    let (w, h) = (width as f64, height as f64);
    let sx = roi.width as f64 / w;
    let sy = roi.height as f64 / h;
    let cx = (2.0 * roi.x as f64 + roi.width as f64) / w - 1.0;
    let cy = (2.0 * roi.y as f64 + roi.height as f64) / h - 1.0;
    #[rustfmt::skip]
    let zoom = Matrix4::new(
        1.0 / sx, 0.0,      0.0, -cx / sx,
        0.0,      1.0 / sy, 0.0, -cy / sy,
        0.0,      0.0,      1.0, 0.0,
        0.0,      0.0,      0.0, 1.0,
    );
    zoom * projection
}

/// ROI内の前景ラベルと深度（mm）
#[derive(Debug, Clone)]
pub struct Observations {
    pub roi: BoundingBox,
    /// 前景なら非ゼロ, ROIサイズ row-major
    pub labels: Vec<u8>,
    pub depths: Vec<u16>,
}

impl Observations {
    /// フレームの深度をROIで切り出し、深度が有効な画素を前景とする
    pub fn from_depth(frame: &Frame, roi: &BoundingBox) -> Self {
        let stride = frame.depth.width as usize;
        let mut depths = Vec::with_capacity((roi.width * roi.height) as usize);
        for y in roi.y..roi.bottom() {
            let row = y as usize * stride;
            for x in roi.x..roi.right() {
                depths.push(frame.depth.data.get(row + x as usize).copied().unwrap_or(0));
            }
        }
        let labels = depths.iter().map(|&d| u8::from(d > 0)).collect();
        Self {
            roi: *roi,
            labels,
            depths,
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l != 0).count()
    }
}

/// 評価側（GPU）へアップロード済みの観測
#[derive(Debug, Clone, Copy)]
pub struct UploadedObservations {
    pub roi: BoundingBox,
    pub foreground: usize,
}

impl From<&Observations> for UploadedObservations {
    fn from(obs: &Observations) -> Self {
        Self {
            roi: obs.roi,
            foreground: obs.foreground_count(),
        }
    }
}

/// 最適化結果。score は表示用で制御には使わない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimized {
    pub pose: HandPose,
    pub score: f64,
}

/// レンダリング・観測・最適化・可視化をまとめたトラッキングエンジン
pub trait TrackingEngine: HandDecoder {
    fn name(&self) -> &'static str;

    /// 仮想カメラをROIにズーム
    fn zoom(&mut self, camera: &CameraContext, roi: BoundingBox) -> Result<ZoomedCamera> {
        Ok(ZoomedCamera::new(camera, roi))
    }

    /// RGBDフレームからROI内の観測を作る
    fn preprocess(&mut self, zoomed: &ZoomedCamera, frame: &Frame) -> Result<Observations>;

    /// 観測を評価側に渡す
    fn upload(&mut self, observations: Observations) -> Result<UploadedObservations>;

    /// init から探索して今フレームの解を返す（ブロッキング）
    fn optimize(&mut self, observed: &UploadedObservations, init: &HandPose) -> Result<Optimized>;

    /// RGB画像にポーズを重畳
    fn visualize(
        &mut self,
        frame: &Frame,
        camera: &CameraContext,
        roi: &BoundingBox,
        pose: &HandPose,
    ) -> Result<Canvas>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{
        CalibrationSet, FrameSource, Intrinsics, ResolutionProfile, SyntheticSource,
    };
    use nalgebra::Vector4;

    fn camera() -> CameraContext {
        let k = Intrinsics {
            fx: 500.0,
            fy: 500.0,
            cx: 320.0,
            cy: 240.0,
            near: 10.0,
            far: 5000.0,
        };
        CameraContext::from_calibration(&CalibrationSet::from_intrinsics(&k, 640, 480).unwrap())
            .unwrap()
    }

    #[test]
    fn test_default_variances() {
        let s = EngineSettings::default();
        assert_eq!(
            s.budget,
            OptimizerBudget {
                particles: 64,
                generations: 25,
            }
        );
        assert_eq!(&s.variances[..3], &[10.0; 3]);
        assert_eq!(&s.variances[3..7], &[0.1; 4]);
        assert!(s.variances[7..].iter().all(|&v| v == 0.1));
    }

    #[test]
    fn test_zoom_maps_roi_to_full_ndc() {
        let cam = camera();
        let roi = BoundingBox {
            x: 160,
            y: 120,
            width: 320,
            height: 240,
        };
        let zoomed = ZoomedCamera::new(&cam, roi);
        // ROI左上に投影される点 → NDC (-1, -1)
        let z = 1000.0;
        let corner = Vector4::new(
            (160.0 - 320.0) * z / 500.0,
            (120.0 - 240.0) * z / 500.0,
            z,
            1.0,
        );
        let clip = zoomed.projection() * corner;
        assert!((clip.x / clip.w + 1.0).abs() < 1e-9);
        assert!((clip.y / clip.w + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_frame_zoom_is_identity() {
        let cam = camera();
        let zoomed = ZoomedCamera::new(&cam, BoundingBox::full(640, 480));
        assert!((zoomed.projection() - cam.projection).abs().max() < 1e-12);
    }

    #[test]
    fn test_observations_cropped_to_roi() {
        let k = Intrinsics {
            fx: 10.0,
            fy: 10.0,
            cx: 4.0,
            cy: 3.0,
            near: 1.0,
            far: 100.0,
        };
        let mut src = SyntheticSource::new(ResolutionProfile::High, &k, 8, 6, None).unwrap();
        let mut frame = Frame::from_grab(src.grab().unwrap(), ResolutionProfile::High).unwrap();
        frame.depth.data[2 * 8 + 3] = 850;
        let roi = BoundingBox {
            x: 2,
            y: 1,
            width: 3,
            height: 2,
        };
        let obs = Observations::from_depth(&frame, &roi);
        assert_eq!(obs.depths.len(), 6);
        assert_eq!(obs.foreground_count(), 1);
        // (3, 2) はROI内の (1, 1)
        assert_eq!(obs.depths[3 + 1], 850);
        let uploaded = UploadedObservations::from(&obs);
        assert_eq!(uploaded.foreground, 1);
    }
}
