use super::decode::HandDecoder;
use super::hand::HandPose;
use crate::camera::CameraContext;
use crate::error::{Result, TrackError};

/// 前フレーム解の周囲に付けるパディング（各辺の長さに対する割合）
pub const DEFAULT_PADDING: f64 = 0.1;

/// 退化時に使う最小BBoxサイズ（ピクセル）
pub const DEFAULT_MIN_BOX_SIZE: u32 = 16;

/// BBox（ピクセル座標）
///
/// 常に 0 <= x, 0 <= y, x + width <= フレーム幅, y + height <= フレーム高さ,
/// width, height >= 1 を満たす。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// フレーム全体
    pub fn full(frame_w: u32, frame_h: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: frame_w,
            height: frame_h,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= frame_w && self.bottom() <= frame_h
    }
}

/// 投影点のmin/max
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

fn extent_of(points: &[(f64, f64)]) -> Option<Extent> {
    points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold(None, |acc, &(x, y)| {
            Some(match acc {
                None => Extent { min_x: x, min_y: y, max_x: x, max_y: y },
                Some(e) => Extent {
                    min_x: e.min_x.min(x),
                    min_y: e.min_y.min(y),
                    max_x: e.max_x.max(x),
                    max_y: e.max_y.max(y),
                },
            })
        })
}

/// 投影済みの点群からBBoxを計算
///
/// - min/max の外接矩形を padding 分だけ拡張（中心を保持）
/// - フレーム境界にクリップ
/// - 点がない・1点に潰れている・フレーム外の場合は、最も近い有効座標を中心に最小サイズのBBox
pub fn bounding_box_from_points(
    points: &[(f64, f64)],
    frame_w: u32,
    frame_h: u32,
    padding: f64,
    min_box_size: u32,
) -> Result<BoundingBox> {
    if frame_w == 0 || frame_h == 0 {
        return Err(TrackError::InvalidFrame {
            width: frame_w,
            height: frame_h,
        });
    }
    // 負・NaNのパディングは0扱い
    let padding = padding.max(0.0);

    let (x, width, y, height) = match extent_of(points) {
        Some(e) => {
            let (x, w) = clamp_axis(e.min_x, e.max_x, frame_w, padding, min_box_size);
            let (y, h) = clamp_axis(e.min_y, e.max_y, frame_h, padding, min_box_size);
            (x, w, y, h)
        }
        None => {
            let (cx, cy) = (frame_w as f64 / 2.0, frame_h as f64 / 2.0);
            let (x, w) = clamp_axis(cx, cx, frame_w, 0.0, min_box_size);
            let (y, h) = clamp_axis(cy, cy, frame_h, 0.0, min_box_size);
            (x, w, y, h)
        }
    };

    Ok(BoundingBox { x, y, width, height })
}

/// 1軸分の拡張とクリップ。戻り値は (開始, 長さ)。
fn clamp_axis(lo: f64, hi: f64, limit: u32, padding: f64, min_size: u32) -> (u32, u32) {
    let min_len = min_size.clamp(1, limit);
    let center = lo + (hi - lo) / 2.0;
    let half = (hi - lo) * (1.0 + padding) / 2.0;

    let start = (center - half).floor().max(0.0);
    let end = (center + half).ceil().min(limit as f64);
    if end - start >= min_len as f64 {
        return (start as u32, (end - start) as u32);
    }

    let c = center.clamp(0.0, limit as f64);
    let s = (c - min_len as f64 / 2.0)
        .round()
        .clamp(0.0, (limit - min_len) as f64);
    (s as u32, min_len)
}

/// 前フレームのポーズからROIを推定する
#[derive(Debug, Clone, Copy)]
pub struct RoiEstimator {
    pub padding: f64,
    pub min_box_size: u32,
}

impl RoiEstimator {
    pub fn new(padding: f64, min_box_size: u32) -> Self {
        Self {
            padding,
            min_box_size,
        }
    }

    /// ポーズをデコードして全関節を投影し、BBoxを返す
    pub fn estimate<D: HandDecoder + ?Sized>(
        &self,
        decoder: &D,
        camera: &CameraContext,
        pose: &HandPose,
    ) -> Result<BoundingBox> {
        let decoding = decoder.decode(pose)?;
        let points: Vec<(f64, f64)> = decoding
            .joints()
            .filter_map(|m| camera.project_joint(m))
            .collect();
        bounding_box_from_points(
            &points,
            camera.width,
            camera.height,
            self.padding,
            self.min_box_size,
        )
    }
}

impl Default for RoiEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING, DEFAULT_MIN_BOX_SIZE)
    }
}

/// 指定フレームサイズ・パディングでのBBox計算
pub fn compute_bounding_box<D: HandDecoder + ?Sized>(
    decoder: &D,
    camera: &CameraContext,
    pose: &HandPose,
    frame_w: u32,
    frame_h: u32,
    padding: f64,
) -> Result<BoundingBox> {
    let decoding = decoder.decode(pose)?;
    let points: Vec<(f64, f64)> = decoding
        .joints()
        .filter_map(|m| camera.project_joint(m))
        .collect();
    bounding_box_from_points(&points, frame_w, frame_h, padding, DEFAULT_MIN_BOX_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CalibrationSet, Intrinsics};
    use crate::pose::KinematicDecoder;

    fn camera(w: u32, h: u32) -> CameraContext {
        let k = Intrinsics {
            fx: 525.0,
            fy: 525.0,
            cx: w as f64 / 2.0,
            cy: h as f64 / 2.0,
            near: 10.0,
            far: 10000.0,
        };
        let calibration = CalibrationSet::from_intrinsics(&k, w, h).unwrap();
        CameraContext::from_calibration(&calibration).unwrap()
    }

    #[test]
    fn test_bbox_basic_padding() {
        let points = [(100.0, 100.0), (200.0, 150.0)];
        let bb = bounding_box_from_points(&points, 640, 480, 0.5, 16).unwrap();
        // 幅100 → 150 (中心150), 高さ50 → 75 (中心125, 外側に丸め)
        assert_eq!(bb.x, 75);
        assert_eq!(bb.width, 150);
        assert_eq!(bb.y, 87);
        assert_eq!(bb.height, 76);
        assert!(bb.fits_within(640, 480));
    }

    #[test]
    fn test_bbox_clipped_at_border() {
        let points = [(-50.0, 400.0), (100.0, 600.0)];
        let bb = bounding_box_from_points(&points, 640, 480, 0.2, 16).unwrap();
        assert_eq!(bb.x, 0);
        assert_eq!(bb.bottom(), 480);
        assert!(bb.fits_within(640, 480));
    }

    #[test]
    fn test_bbox_always_inside_frame() {
        let coords = [-1.0e6, -300.0, -1.0, 0.0, 0.5, 10.0, 320.0, 639.9, 640.0, 700.0, 1.0e6];
        for &w in &[1u32, 7, 640] {
            for &h in &[1u32, 5, 480] {
                for &a in &coords {
                    for &b in &coords {
                        for &padding in &[0.0, 0.1, 1.0, 10.0] {
                            let points = [(a, b), (b, a * 0.5)];
                            let bb = bounding_box_from_points(&points, w, h, padding, 16).unwrap();
                            assert!(bb.fits_within(w, h), "{:?} in {}x{}", bb, w, h);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_padding_is_monotonic() {
        let point_sets: [&[(f64, f64)]; 4] = [
            &[(100.0, 100.0), (120.0, 300.0)],
            &[(600.0, 10.0), (700.0, 20.0)],
            &[(320.0, 240.0)],
            &[(-100.0, -100.0), (5.0, 3.0)],
        ];
        for points in point_sets {
            let mut prev = bounding_box_from_points(points, 640, 480, 0.0, 16).unwrap();
            for step in 1..=40 {
                let padding = step as f64 * 0.05;
                let bb = bounding_box_from_points(points, 640, 480, padding, 16).unwrap();
                assert!(bb.width >= prev.width && bb.height >= prev.height);
                prev = bb;
            }
        }
    }

    #[test]
    fn test_degenerate_single_point() {
        let bb = bounding_box_from_points(&[(320.0, 240.0)], 640, 480, 0.1, 16).unwrap();
        assert_eq!((bb.width, bb.height), (16, 16));
        assert_eq!((bb.x, bb.y), (312, 232));
    }

    #[test]
    fn test_degenerate_off_frame_snaps_to_nearest_edge() {
        let bb = bounding_box_from_points(&[(5000.0, -300.0)], 640, 480, 0.1, 16).unwrap();
        assert_eq!((bb.x, bb.y), (624, 0));
        assert_eq!((bb.width, bb.height), (16, 16));
    }

    #[test]
    fn test_no_points_centers_in_frame() {
        let bb = bounding_box_from_points(&[], 640, 480, 0.1, 16).unwrap();
        assert_eq!((bb.x, bb.y, bb.width, bb.height), (312, 232, 16, 16));
    }

    #[test]
    fn test_min_size_limited_by_tiny_frame() {
        let bb = bounding_box_from_points(&[(1.0, 1.0)], 4, 3, 0.1, 16).unwrap();
        assert_eq!(bb, BoundingBox::full(4, 3));
    }

    #[test]
    fn test_zero_frame_rejected() {
        let err = bounding_box_from_points(&[(1.0, 1.0)], 0, 480, 0.1, 16).unwrap_err();
        assert!(matches!(err, TrackError::InvalidFrame { .. }));
    }

    #[test]
    fn test_default_pose_box_inside_frame() {
        let decoder = KinematicDecoder::right_hand();
        let bb = compute_bounding_box(
            &decoder,
            &camera(640, 480),
            &HandPose::default(),
            640,
            480,
            DEFAULT_PADDING,
        )
        .unwrap();
        assert!(bb.fits_within(640, 480));
        assert!(bb.width > DEFAULT_MIN_BOX_SIZE && bb.height > DEFAULT_MIN_BOX_SIZE);
    }

    #[test]
    fn test_pose_off_frame_falls_back() {
        let decoder = KinematicDecoder::right_hand();
        let mut pose = HandPose::default();
        pose.params[0] = 1.0e5;
        let bb = RoiEstimator::default()
            .estimate(&decoder, &camera(640, 480), &pose)
            .unwrap();
        assert!(bb.fits_within(640, 480));
        assert_eq!(bb.width, DEFAULT_MIN_BOX_SIZE);
    }

    #[test]
    fn test_pose_behind_camera_falls_back() {
        let decoder = KinematicDecoder::right_hand();
        let mut pose = HandPose::default();
        pose.params[2] = -900.0;
        let bb = RoiEstimator::default()
            .estimate(&decoder, &camera(640, 480), &pose)
            .unwrap();
        // 写る関節がないのでフレーム中央の最小BBox
        assert_eq!(
            bb,
            BoundingBox {
                x: 312,
                y: 232,
                width: DEFAULT_MIN_BOX_SIZE,
                height: DEFAULT_MIN_BOX_SIZE,
            }
        );
    }

    #[test]
    fn test_invalid_pose_propagates() {
        let decoder = KinematicDecoder::right_hand();
        let mut pose = HandPose::default();
        pose.params[3..7].copy_from_slice(&[0.0; 4]);
        let err = RoiEstimator::default()
            .estimate(&decoder, &camera(640, 480), &pose)
            .unwrap_err();
        assert!(matches!(err, TrackError::InvalidPose(_)));
    }
}
