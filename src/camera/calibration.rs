use nalgebra::Matrix4;

use crate::error::{Result, TrackError};

/// フレームごとのカメラキャリブレーション（グラフィックス形式）
///
/// - view: ワールド → カメラ座標
/// - projection: カメラ座標 → クリップ座標
/// - viewport: NDC → ピクセル座標
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub view: Matrix4<f64>,
    pub projection: Matrix4<f64>,
    pub viewport: Matrix4<f64>,
    pub width: u32,
    pub height: u32,
}

/// ピンホールカメラの内部パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub near: f64,
    pub far: f64,
}

impl CalibrationSet {
    /// 内部パラメータからキャリブレーションを構築（view = 単位行列）
    ///
    /// カメラ座標は OpenCV と同じ（x 右, y 下, z 前方）。
    /// viewport * projection は (x, y, z) を (fx*x/z + cx, fy*y/z + cy) に写す。
    pub fn from_intrinsics(k: &Intrinsics, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TrackError::InvalidFrame { width, height });
        }
        if k.far <= k.near {
            return Err(TrackError::Config(format!(
                "far plane ({}) must be beyond near plane ({})",
                k.far, k.near
            )));
        }

        let w = width as f64;
        let h = height as f64;
        let (n, f) = (k.near, k.far);

        #[rustfmt::skip]
        let projection = Matrix4::new(
            2.0 * k.fx / w, 0.0,            2.0 * k.cx / w - 1.0, 0.0,
            0.0,            2.0 * k.fy / h, 2.0 * k.cy / h - 1.0, 0.0,
            0.0,            0.0,            (f + n) / (f - n),    -2.0 * f * n / (f - n),
            0.0,            0.0,            1.0,                  0.0,
        );

        Ok(Self {
            view: Matrix4::identity(),
            projection,
            viewport: viewport_transform(width, height),
            width,
            height,
        })
    }
}

/// NDC [-1, 1]² → ピクセル [0, width] x [0, height]
pub fn viewport_transform(width: u32, height: u32) -> Matrix4<f64> {
    let hw = width as f64 / 2.0;
    let hh = height as f64 / 2.0;
    #[rustfmt::skip]
    let m = Matrix4::new(
        hw,  0.0, 0.0, hw,
        0.0, hh,  0.0, hh,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn kinect_like() -> Intrinsics {
        Intrinsics {
            fx: 525.0,
            fy: 525.0,
            cx: 320.0,
            cy: 240.0,
            near: 10.0,
            far: 10000.0,
        }
    }

    #[test]
    fn test_projection_matches_pinhole() {
        let clb = CalibrationSet::from_intrinsics(&kinect_like(), 640, 480).unwrap();
        let p = clb.viewport * clb.projection * clb.view * Vector4::new(100.0, -50.0, 1000.0, 1.0);
        let u = p.x / p.w;
        let v = p.y / p.w;
        assert!((u - (525.0 * 0.1 + 320.0)).abs() < 1e-9);
        assert!((v - (525.0 * -0.05 + 240.0)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = CalibrationSet::from_intrinsics(&kinect_like(), 0, 480).unwrap_err();
        assert!(matches!(err, TrackError::InvalidFrame { width: 0, height: 480 }));
    }

    #[test]
    fn test_inverted_planes_rejected() {
        let mut k = kinect_like();
        k.far = 1.0;
        assert!(CalibrationSet::from_intrinsics(&k, 640, 480).is_err());
    }
}
