use nalgebra::{Matrix4, Vector4};

use super::calibration::CalibrationSet;
use crate::error::{Result, TrackError};
use crate::pose::decode::joint_origin;
use crate::pose::TrackedPoint3D;

/// 現フレームのカメラ変換。フレームをまたいで状態を持たない。
#[derive(Debug, Clone)]
pub struct CameraContext {
    pub view: Matrix4<f64>,
    pub projection: Matrix4<f64>,
    pub viewport: Matrix4<f64>,
    pub width: u32,
    pub height: u32,
    /// viewport * projection * view
    full: Matrix4<f64>,
}

impl CameraContext {
    pub fn from_calibration(clb: &CalibrationSet) -> Result<Self> {
        if clb.width == 0 || clb.height == 0 {
            return Err(TrackError::InvalidFrame {
                width: clb.width,
                height: clb.height,
            });
        }
        Ok(Self {
            view: clb.view,
            projection: clb.projection,
            viewport: clb.viewport,
            width: clb.width,
            height: clb.height,
            full: clb.viewport * clb.projection * clb.view,
        })
    }

    /// 関節原点の2D投影（ピクセル座標）。w ≈ 0 や非有限なら None。
    pub fn project_joint(&self, joint: &Matrix4<f64>) -> Option<(f64, f64)> {
        self.project_point(&joint_origin(joint))
    }

    /// ワールド同次座標 → ピクセル座標
    ///
    /// カメラの後ろ（クリップ座標で w <= 0）の点は写らないので None。
    pub fn project_point(&self, p: &Vector4<f64>) -> Option<(f64, f64)> {
        let q = self.full * p;
        if !q.w.is_finite() || q.w < 1e-12 {
            return None;
        }
        let u = q.x / q.w;
        let v = q.y / q.w;
        (u.is_finite() && v.is_finite()).then_some((u, v))
    }

    /// 関節原点のカメラ座標（同次のまま, w で割らない）
    pub fn joint_in_view(&self, joint: &Matrix4<f64>) -> TrackedPoint3D {
        TrackedPoint3D::from(self.view * joint_origin(joint))
    }
}
