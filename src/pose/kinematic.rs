use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

use super::decode::{Decoding, HandDecoder};
use super::hand::{Finger, HandPose};
use crate::error::{Result, TrackError};

/// 指1本の骨格（手のひらローカル座標, mm）
#[derive(Debug, Clone, Copy)]
struct FingerModel {
    /// 手のひら原点から指の付け根までのオフセット
    base: [f64; 3],
    /// 基節・中節・末節の長さ
    bones: [f64; 3],
}

/// 右手の低ポリモデルに合わせた寸法。指はローカル +Y 方向に伸びる。
const RIGHT_HAND: [FingerModel; Finger::COUNT] = [
    FingerModel { base: [35.0, 10.0, -10.0], bones: [45.0, 32.0, 27.0] },
    FingerModel { base: [25.0, 85.0, 0.0], bones: [42.0, 25.0, 20.0] },
    FingerModel { base: [5.0, 90.0, 0.0], bones: [46.0, 28.0, 22.0] },
    FingerModel { base: [-15.0, 85.0, 0.0], bones: [43.0, 27.0, 21.0] },
    FingerModel { base: [-33.0, 75.0, 0.0], bones: [35.0, 20.0, 18.0] },
];

/// 順運動学による手のデコーダ
///
/// 各指の4パラメータは [外転, 屈曲1, 屈曲2, 屈曲3]（ラジアン）。
/// 出力は "palm"（1変換）と指5本（付け根・第1関節・第2関節・指先の4変換）。
#[derive(Debug, Clone)]
pub struct KinematicDecoder {
    fingers: [FingerModel; Finger::COUNT],
}

impl KinematicDecoder {
    pub fn right_hand() -> Self {
        Self { fingers: RIGHT_HAND }
    }

    fn palm(pose: &HandPose) -> Result<Isometry3<f64>> {
        let [tx, ty, tz] = pose.translation();
        let [qx, qy, qz, qw] = pose.rotation();
        let q = Quaternion::new(qw, qx, qy, qz);
        if q.norm() < 1e-9 {
            return Err(TrackError::InvalidPose("zero-length rotation quaternion".into()));
        }
        Ok(Isometry3::from_parts(
            Translation3::new(tx, ty, tz),
            UnitQuaternion::from_quaternion(q),
        ))
    }
}

impl Default for KinematicDecoder {
    fn default() -> Self {
        Self::right_hand()
    }
}

impl HandDecoder for KinematicDecoder {
    fn decode(&self, pose: &HandPose) -> Result<Decoding> {
        if !pose.is_finite() {
            return Err(TrackError::InvalidPose("non-finite parameter".into()));
        }
        let palm = Self::palm(pose)?;

        let mut decoding = Decoding::default();
        decoding.push("palm", vec![palm.to_homogeneous()]);

        for finger in Finger::ALL {
            let model = &self.fingers[finger as usize];
            let [abduction, flex1, flex2, flex3] = pose.finger(finger);

            let base = palm
                * Isometry3::from_parts(
                    Translation3::new(model.base[0], model.base[1], model.base[2]),
                    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), abduction)
                        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), flex1),
                );
            let j1 = base * bone(model.bones[0], flex2);
            let j2 = j1 * bone(model.bones[1], flex3);
            let tip = j2 * bone(model.bones[2], 0.0);

            decoding.push(
                finger.name(),
                vec![
                    base.to_homogeneous(),
                    j1.to_homogeneous(),
                    j2.to_homogeneous(),
                    tip.to_homogeneous(),
                ],
            );
        }

        Ok(decoding)
    }
}

/// 長さ length の骨を進んでから X 軸まわりに flex 曲げる
fn bone(length: f64, flex: f64) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(0.0, length, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), flex),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::decode::joint_origin;
    use crate::pose::hand::POSE_DIM;

    fn flat_pose() -> HandPose {
        let mut params = [0.0; POSE_DIM];
        params[2] = 500.0;
        params[6] = 1.0; // identity quaternion (w)
        HandPose::new(params)
    }

    #[test]
    fn test_decode_part_layout() {
        let d = KinematicDecoder::right_hand().decode(&HandPose::default()).unwrap();
        assert_eq!(d.parts.len(), 1 + Finger::COUNT);
        assert_eq!(d.parts[0].name, "palm");
        assert_eq!(d.parts[0].transforms.len(), 1);
        assert_eq!(d.parts[2].name, "index");
        assert_eq!(d.joint_count(), 1 + Finger::COUNT * 4);
    }

    #[test]
    fn test_palm_at_translation() {
        let d = KinematicDecoder::right_hand().decode(&HandPose::default()).unwrap();
        let origin = joint_origin(&d.parts[0].transforms[0]);
        assert!((origin.x - 0.0).abs() < 1e-9);
        assert!((origin.y - 80.0).abs() < 1e-9);
        assert!((origin.z - 900.0).abs() < 1e-9);
        assert_eq!(origin.w, 1.0);
    }

    #[test]
    fn test_straight_finger_extends_along_y() {
        let d = KinematicDecoder::right_hand().decode(&flat_pose()).unwrap();
        let middle = &d.parts[1 + Finger::Middle as usize];
        let tip = joint_origin(&middle.transforms[3]);
        let model = RIGHT_HAND[Finger::Middle as usize];
        let expected_y = model.base[1] + model.bones.iter().sum::<f64>();
        assert!((tip.x - model.base[0]).abs() < 1e-9);
        assert!((tip.y - expected_y).abs() < 1e-9);
        assert!((tip.z - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_unnormalized_quaternion_is_accepted() {
        let mut pose = flat_pose();
        pose.params[6] = 3.0;
        let d = KinematicDecoder::right_hand().decode(&pose).unwrap();
        let palm = joint_origin(&d.parts[0].transforms[0]);
        assert!((palm.z - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let mut pose = flat_pose();
        pose.params[6] = 0.0;
        let err = KinematicDecoder::right_hand().decode(&pose).unwrap_err();
        assert!(matches!(err, TrackError::InvalidPose(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut pose = flat_pose();
        pose.params[0] = f64::INFINITY;
        assert!(KinematicDecoder::right_hand().decode(&pose).is_err());
    }
}
