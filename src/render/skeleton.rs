use nalgebra::Matrix4;

use super::canvas::Canvas;
use crate::camera::CameraContext;
use crate::pose::Decoding;

/// 関節の色 (RGB)
pub const JOINT_COLOR: u32 = 0x00FF00; // 緑

/// 骨の色 (RGB)
pub const BONE_COLOR: u32 = 0xFFFF00; // 黄色

/// ROI枠の色 (RGB)
pub const ROI_COLOR: u32 = 0xFF0000; // 赤

/// デコード結果を2D投影して骨格を描画
///
/// 手のひら原点から各指の付け根へ、指の中は関節順に線で結ぶ。
pub fn draw_hand(canvas: &mut Canvas, camera: &CameraContext, decoding: &Decoding) {
    let to_pixel = |m: &Matrix4<f64>| camera.project_joint(m).map(|(u, v)| (u as i32, v as i32));

    let palm = decoding
        .parts
        .first()
        .and_then(|p| p.transforms.first())
        .and_then(to_pixel);

    for part in decoding.parts.iter().skip(1) {
        let mut prev = palm;
        for joint in part.transforms.iter().map(to_pixel) {
            if let (Some((x0, y0)), Some((x1, y1))) = (prev, joint) {
                canvas.draw_line(x0, y0, x1, y1, BONE_COLOR);
            }
            prev = joint;
        }
    }

    for (x, y) in decoding.joints().filter_map(to_pixel) {
        canvas.draw_circle(x, y, 3, JOINT_COLOR);
    }
}
