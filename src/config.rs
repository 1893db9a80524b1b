use anyhow::{bail, Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{Intrinsics, ResolutionProfile};
use crate::engine::{EngineSettings, OptimizerBudget};
use crate::pose::{HandPose, DEFAULT_POSE, POSE_DIM};
use crate::tracker::LoopSettings;

/// フレームの1辺の上限（ピクセル）
pub const MAX_FRAME_SIDE: u32 = 8192;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// 開始/リセット時のポーズ（27要素）
    #[serde(default = "default_pose")]
    pub default_pose: Vec<f64>,
    /// ROIの余白（幅・高さに対する割合）
    #[serde(default = "default_padding")]
    pub padding: f64,
    /// ROIの最小辺長（ピクセル）
    #[serde(default = "default_min_box_size")]
    pub min_box_size: u32,
    #[serde(default = "default_particles")]
    pub particles: u32,
    #[serde(default = "default_generations")]
    pub generations: u32,
}

fn default_pose() -> Vec<f64> { DEFAULT_POSE.to_vec() }
fn default_padding() -> f64 { 0.1 }
fn default_min_box_size() -> u32 { 16 }
fn default_particles() -> u32 { 64 }
fn default_generations() -> u32 { 25 }

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_pose: default_pose(),
            padding: default_padding(),
            min_box_size: default_min_box_size(),
            particles: default_particles(),
            generations: default_generations(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// "low" | "high"
    #[serde(default)]
    pub resolution: ResolutionProfile,
    /// 合成ソースのフレームサイズ
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_focal")]
    pub fx: f64,
    #[serde(default = "default_focal")]
    pub fy: f64,
    #[serde(default = "default_cx")]
    pub cx: f64,
    #[serde(default = "default_cy")]
    pub cy: f64,
    /// クリップ面（mm）
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_focal() -> f64 { 525.0 }
fn default_cx() -> f64 { 319.5 }
fn default_cy() -> f64 { 239.5 }
fn default_near() -> f64 { 100.0 }
fn default_far() -> f64 { 10000.0 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionProfile::default(),
            width: default_width(),
            height: default_height(),
            fx: default_focal(),
            fy: default_focal(),
            cx: default_cx(),
            cy: default_cy(),
            near: default_near(),
            far: default_far(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// 出力チャネル（名前付きパイプ / ファイル）
    #[serde(default = "default_export_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 書き出す関節の通し番号。省略時は最後の関節。
    #[serde(default)]
    pub joint: Option<usize>,
}

#[cfg(windows)]
fn default_export_path() -> PathBuf { PathBuf::from(r"\\.\pipe\NPtest") }
#[cfg(not(windows))]
fn default_export_path() -> PathBuf { PathBuf::from("/tmp/hand_tracker.pipe") }
fn default_true() -> bool { true }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            enabled: default_true(),
            joint: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// コマンド待ち時間（ms）
    #[serde(default = "default_active_poll_ms")]
    pub active_poll_ms: u64,
    /// 一時停止中のコマンド待ち時間（ms）
    #[serde(default = "default_paused_poll_ms")]
    pub paused_poll_ms: u64,
    /// 合成ソースのフレーム数上限
    #[serde(default)]
    pub max_frames: Option<u64>,
}

fn default_active_poll_ms() -> u64 { 1 }
fn default_paused_poll_ms() -> u64 { 100 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            active_poll_ms: default_active_poll_ms(),
            paused_poll_ms: default_paused_poll_ms(),
            max_frames: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DebugConfig {
    /// 可視化ウィンドウを開く
    #[serde(default)]
    pub view: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 読めなければ警告を出してデフォルト
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tracking;
        if t.default_pose.len() != POSE_DIM {
            bail!(
                "tracking.default_pose must have {} values, got {}",
                POSE_DIM,
                t.default_pose.len()
            );
        }
        if t.padding.is_nan() || t.padding < 0.0 {
            bail!("tracking.padding must be >= 0, got {}", t.padding);
        }
        if t.particles == 0 || t.generations == 0 {
            bail!("optimizer budget must be positive");
        }
        let c = &self.camera;
        if c.width == 0 || c.height == 0 {
            bail!("camera frame size must be positive, got {}x{}", c.width, c.height);
        }
        if c.width > MAX_FRAME_SIDE || c.height > MAX_FRAME_SIDE {
            bail!(
                "camera frame size {}x{} exceeds {} per side",
                c.width,
                c.height,
                MAX_FRAME_SIDE
            );
        }
        if c.far <= c.near {
            bail!("camera.far ({}) must be beyond camera.near ({})", c.far, c.near);
        }
        Ok(())
    }

    pub fn default_pose(&self) -> Result<HandPose> {
        Ok(HandPose::from_slice(&self.tracking.default_pose)?)
    }

    pub fn intrinsics(&self) -> Intrinsics {
        let c = &self.camera;
        Intrinsics {
            fx: c.fx,
            fy: c.fy,
            cx: c.cx,
            cy: c.cy,
            near: c.near,
            far: c.far,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings::new(OptimizerBudget {
            particles: self.tracking.particles,
            generations: self.tracking.generations,
        })
    }

    pub fn loop_settings(&self) -> Result<LoopSettings> {
        Ok(LoopSettings {
            default_pose: self.default_pose()?,
            padding: self.tracking.padding,
            min_box_size: self.tracking.min_box_size,
            export_joint: self.export.joint,
            profile: self.camera.resolution,
            active_poll: Duration::from_millis(self.app.active_poll_ms),
            paused_poll: Duration::from_millis(self.app.paused_poll_ms),
        })
    }
}
