use serde::Deserialize;

use super::calibration::{CalibrationSet, Intrinsics};
use crate::error::{Result, TrackError};

/// 取得チャネルの解像度プロファイル
///
/// - high: Color + RegisteredDepth → (rgb, depth)
/// - low: Depth + RegisteredColor → (depth, rgb)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionProfile {
    Low,
    #[default]
    High,
}

/// センサから取得した生画像
#[derive(Debug, Clone)]
pub enum RawImage {
    Rgba {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// 深度（mm）
    Depth {
        width: u32,
        height: u32,
        data: Vec<u16>,
    },
}

/// grab() の結果: 画像とキャリブレーションの組
#[derive(Debug, Clone)]
pub struct Grab {
    pub images: Vec<RawImage>,
    pub calibrations: Vec<CalibrationSet>,
}

#[derive(Debug, Clone)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    /// RGB 3チャネル, row-major
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

/// 1フレーム分のRGBD入力
#[derive(Debug, Clone)]
pub struct Frame {
    pub rgb: RgbImage,
    pub depth: DepthImage,
    /// 深度カメラのキャリブレーション（フレームサイズの基準）
    pub calibration: CalibrationSet,
    pub color_calibration: CalibrationSet,
}

impl Frame {
    /// プロファイルに従って画像の並びを解釈し、RGBAからアルファを落とす
    pub fn from_grab(grab: Grab, profile: ResolutionProfile) -> Result<Self> {
        let Grab { images, calibrations } = grab;
        let (Ok([first, second]), Ok([clb_first, clb_second])) =
            (<[RawImage; 2]>::try_from(images), <[CalibrationSet; 2]>::try_from(calibrations))
        else {
            return Err(TrackError::Acquisition(
                "expected two images and two calibrations".into(),
            ));
        };

        let (color, depth, color_calibration, calibration) = match profile {
            ResolutionProfile::High => (first, second, clb_first, clb_second),
            ResolutionProfile::Low => (second, first, clb_second, clb_first),
        };

        match (color, depth) {
            (
                RawImage::Rgba {
                    width,
                    height,
                    data,
                },
                RawImage::Depth {
                    width: dw,
                    height: dh,
                    data: depth,
                },
            ) => {
                check_len("color", width, height, 4, data.len())?;
                check_len("depth", dw, dh, 1, depth.len())?;
                Ok(Self {
                    rgb: RgbImage {
                        width,
                        height,
                        data: drop_alpha(&data),
                    },
                    depth: DepthImage {
                        width: dw,
                        height: dh,
                        data: depth,
                    },
                    calibration,
                    color_calibration,
                })
            }
            _ => Err(TrackError::Acquisition(format!(
                "unsupported channel order for {:?} profile",
                profile
            ))),
        }
    }

    pub fn width(&self) -> u32 {
        self.calibration.width
    }

    pub fn height(&self) -> u32 {
        self.calibration.height
    }
}

/// 画素数 × チャネル数（オーバーフローは None）
fn image_len(width: u32, height: u32, channels: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)
}

fn check_len(kind: &str, width: u32, height: u32, channels: usize, len: usize) -> Result<()> {
    match image_len(width, height, channels) {
        Some(expected) if expected == len => Ok(()),
        _ => Err(TrackError::Acquisition(format!(
            "{} image {}x{} has {} values",
            kind, width, height, len
        ))),
    }
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect()
}

/// RGBD取得の抽象。失敗はループにとって致命的。
pub trait FrameSource {
    fn grab(&mut self) -> Result<Grab>;
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn grab(&mut self) -> Result<Grab> {
        (**self).grab()
    }
}

/// 空のRGBDフレームを生成する合成ソース（センサなしでループを動かす用）
pub struct SyntheticSource {
    profile: ResolutionProfile,
    calibration: CalibrationSet,
    max_frames: Option<u64>,
    produced: u64,
}

impl SyntheticSource {
    pub fn new(
        profile: ResolutionProfile,
        intrinsics: &Intrinsics,
        width: u32,
        height: u32,
        max_frames: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            profile,
            calibration: CalibrationSet::from_intrinsics(intrinsics, width, height)?,
            max_frames,
            produced: 0,
        })
    }
}

impl FrameSource for SyntheticSource {
    fn grab(&mut self) -> Result<Grab> {
        if self.max_frames.is_some_and(|max| self.produced >= max) {
            return Err(TrackError::Acquisition("end of stream".into()));
        }
        self.produced += 1;

        let (w, h) = (self.calibration.width, self.calibration.height);
        let (Some(color_len), Some(pixels)) = (image_len(w, h, 4), image_len(w, h, 1)) else {
            return Err(TrackError::Acquisition(format!("frame size {}x{} too large", w, h)));
        };
        let color = RawImage::Rgba {
            width: w,
            height: h,
            data: vec![32; color_len],
        };
        let depth = RawImage::Depth {
            width: w,
            height: h,
            data: vec![0; pixels],
        };
        let images = match self.profile {
            ResolutionProfile::High => vec![color, depth],
            ResolutionProfile::Low => vec![depth, color],
        };
        Ok(Grab {
            images,
            calibrations: vec![self.calibration.clone(), self.calibration.clone()],
        })
    }
}
