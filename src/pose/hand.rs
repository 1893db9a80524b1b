use nalgebra::Vector4;

use crate::error::{Result, TrackError};

/// 27次元 = 位置3 + 回転4 + 指5本 x 関節角4
pub const POSE_DIM: usize = 27;

/// 各指の関節角パラメータ数
pub const ANGLES_PER_FINGER: usize = 4;

/// 最初のフレームの初期ポーズ。トラッキングのリセット時もここに戻る。
#[rustfmt::skip]
pub const DEFAULT_POSE: [f64; POSE_DIM] = [
    0.0, 80.0, 900.0,
    0.0, 0.0, 1.0, 0.0,
    0.12094670713521981, 1.5718781286805164, 0.0095803350436402084, -0.17859306356273186,
    0.07896362165852891, 2.679674568754034, 0.18838555232786072, 0.022004937531907236,
    -0.040974057918320331, 1.5214511173521337, 0.1483664003509125, 0.028560707373440963,
    -0.0045378168093132328, 1.5274324762467191, 0.10175190781250527, 0.10870668324616115,
    0.0081084524023148433, 1.4900922821497109, 0.046471606819363256, -0.14437035885137611,
];

/// 指のインデックス（パラメータベクトル内の並び順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Finger {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Pinky = 4,
}

impl Finger {
    pub const COUNT: usize = 5;

    pub const ALL: [Finger; Finger::COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

/// 手のポーズ（27次元パラメータベクトル）
///
/// 長さは型で保証される。値の範囲チェックはオプティマイザ側の責務。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub params: [f64; POSE_DIM],
}

impl HandPose {
    pub fn new(params: [f64; POSE_DIM]) -> Self {
        Self { params }
    }

    /// 可変長スライスから構築。長さが27でなければ InvalidPose。
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let params: [f64; POSE_DIM] = values.try_into().map_err(|_| {
            TrackError::InvalidPose(format!(
                "expected {} parameters, got {}",
                POSE_DIM,
                values.len()
            ))
        })?;
        Ok(Self { params })
    }

    /// グローバル位置 (x, y, z)
    pub fn translation(&self) -> [f64; 3] {
        [self.params[0], self.params[1], self.params[2]]
    }

    /// グローバル回転（クォータニオン: x, y, z, w）
    pub fn rotation(&self) -> [f64; 4] {
        [self.params[3], self.params[4], self.params[5], self.params[6]]
    }

    /// 指ごとの関節角
    pub fn finger(&self, finger: Finger) -> [f64; ANGLES_PER_FINGER] {
        let start = 7 + finger as usize * ANGLES_PER_FINGER;
        [
            self.params[start],
            self.params[start + 1],
            self.params[start + 2],
            self.params[start + 3],
        ]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.params
    }

    pub fn is_finite(&self) -> bool {
        self.params.iter().all(|v| v.is_finite())
    }
}

impl Default for HandPose {
    fn default() -> Self {
        Self::new(DEFAULT_POSE)
    }
}

/// 同次座標の3D点 (x, y, z, w)
///
/// w != 1 の場合がある（射影変換）。ユークリッド座標が必要なら受信側で w で割る。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl TrackedPoint3D {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

impl From<Vector4<f64>> for TrackedPoint3D {
    fn from(v: Vector4<f64>) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pose_layout() {
        let pose = HandPose::default();
        assert_eq!(pose.translation(), [0.0, 80.0, 900.0]);
        assert_eq!(pose.rotation(), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(pose.as_slice().len(), POSE_DIM);
    }

    #[test]
    fn test_finger_slices() {
        let pose = HandPose::default();
        let thumb = pose.finger(Finger::Thumb);
        assert_eq!(thumb[0], DEFAULT_POSE[7]);
        let pinky = pose.finger(Finger::Pinky);
        assert_eq!(pinky[3], DEFAULT_POSE[26]);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(HandPose::from_slice(&DEFAULT_POSE).is_ok());
        let err = HandPose::from_slice(&DEFAULT_POSE[..26]).unwrap_err();
        assert!(matches!(err, TrackError::InvalidPose(_)));
        let mut long = DEFAULT_POSE.to_vec();
        long.push(0.0);
        assert!(HandPose::from_slice(&long).is_err());
    }

    #[test]
    fn test_is_finite() {
        let mut pose = HandPose::default();
        assert!(pose.is_finite());
        pose.params[10] = f64::NAN;
        assert!(!pose.is_finite());
    }

    #[test]
    fn test_point_from_vector() {
        let p = TrackedPoint3D::from(Vector4::new(1.0, 2.0, 3.0, 0.5));
        assert_eq!(p, TrackedPoint3D::new(1.0, 2.0, 3.0, 0.5));
    }
}
