use std::io::{Seek, Write};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::perf::PerformanceMonitor;
use super::state::{Mode, TrackingState};
use crate::camera::{CameraContext, Frame, FrameSource, ResolutionProfile};
use crate::engine::TrackingEngine;
use crate::error::{Result, TrackError};
use crate::export::PoseExporter;
use crate::input::CommandSource;
use crate::pose::{HandPose, RoiEstimator, DEFAULT_MIN_BOX_SIZE, DEFAULT_PADDING};
use crate::render::{Canvas, Viewer};

/// ループの固定パラメータ
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub default_pose: HandPose,
    pub padding: f64,
    pub min_box_size: u32,
    /// エクスポートする関節の通し番号（None なら最後の関節）
    pub export_joint: Option<usize>,
    pub profile: ResolutionProfile,
    pub active_poll: Duration,
    pub paused_poll: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            default_pose: HandPose::default(),
            padding: DEFAULT_PADDING,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
            export_joint: None,
            profile: ResolutionProfile::default(),
            active_poll: Duration::from_millis(1),
            paused_poll: Duration::from_millis(100),
        }
    }
}

/// エクスポートの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// 設定で無効
    Disabled,
    Active,
    /// 書き込み失敗で停止（トラッキングは継続）
    Failed,
}

/// ループ状態をひとまとめにしたレコード
#[derive(Debug, Clone)]
pub struct LoopState {
    pub tracking: TrackingState,
    /// 取得に成功した反復の数
    pub frames: u64,
    pub ui_fps: PerformanceMonitor,
    pub track_fps: PerformanceMonitor,
    /// 直近の最適化スコア（表示用）
    pub last_score: Option<f64>,
    pub export_status: ExportStatus,
    pub exported: u64,
}

/// ループ終了理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    AcquisitionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub exported: u64,
    pub export_status: ExportStatus,
    pub reason: StopReason,
}

/// 1反復の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop(StopReason),
}

/// フレーム取得からエクスポートまでを回すメインループ
///
/// 取得元・エンジン・表示・入力・エクスポートチャネルはすべてこの構造体が所有し、
/// ドロップ時に解放される。
pub struct FrameController<S, E, V, C, W>
where
    S: FrameSource,
    E: TrackingEngine,
    V: Viewer,
    C: CommandSource,
    W: Write + Seek,
{
    source: S,
    engine: E,
    viewer: V,
    commands: C,
    exporter: Option<PoseExporter<W>>,
    settings: LoopSettings,
    state: LoopState,
    last_canvas: Option<Canvas>,
    fps_timer: Instant,
    fps_frames: u64,
}

impl<S, E, V, C, W> FrameController<S, E, V, C, W>
where
    S: FrameSource,
    E: TrackingEngine,
    V: Viewer,
    C: CommandSource,
    W: Write + Seek,
{
    pub fn new(
        source: S,
        engine: E,
        viewer: V,
        commands: C,
        exporter: Option<PoseExporter<W>>,
        settings: LoopSettings,
    ) -> Self {
        let export_status = if exporter.is_some() {
            ExportStatus::Active
        } else {
            ExportStatus::Disabled
        };
        let state = LoopState {
            tracking: TrackingState::new(settings.default_pose),
            frames: 0,
            ui_fps: PerformanceMonitor::new(),
            track_fps: PerformanceMonitor::new(),
            last_score: None,
            export_status,
            exported: 0,
        };
        Self {
            source,
            engine,
            viewer,
            commands,
            exporter,
            settings,
            state,
            last_canvas: None,
            fps_timer: Instant::now(),
            fps_frames: 0,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn exporter(&self) -> Option<&PoseExporter<W>> {
        self.exporter.as_ref()
    }

    pub fn last_canvas(&self) -> Option<&Canvas> {
        self.last_canvas.as_ref()
    }

    /// 終了まで回す
    ///
    /// 取得失敗はログを出して正常終了、不正ポーズやエンジンの失敗はエラーで返る。
    pub fn run(&mut self) -> Result<RunSummary> {
        info!(
            "tracking loop started (engine: {}, export: {:?})",
            self.engine.name(),
            self.state.export_status
        );
        let reason = loop {
            if let Flow::Stop(reason) = self.step()? {
                break reason;
            }
        };
        info!(
            "tracking loop stopped: {:?} ({} frames, {} exported)",
            reason, self.state.frames, self.state.exported
        );
        Ok(RunSummary {
            frames: self.state.frames,
            exported: self.state.exported,
            export_status: self.state.export_status,
            reason,
        })
    }

    /// 1反復
    pub fn step(&mut self) -> Result<Flow> {
        if self.state.tracking.is_terminated() {
            return Ok(Flow::Stop(StopReason::Quit));
        }
        let started = Instant::now();

        if self.state.tracking.is_paused() {
            if let Some(canvas) = &self.last_canvas {
                self.viewer.show(canvas)?;
            }
            self.poll_command(self.settings.paused_poll);
            self.state.ui_fps.tick_duration(started.elapsed());
            return Ok(self.flow());
        }

        let frame = match self
            .source
            .grab()
            .and_then(|grab| Frame::from_grab(grab, self.settings.profile))
        {
            Ok(frame) => frame,
            Err(TrackError::Acquisition(msg)) => {
                error!("acquisition failed, stopping: {}", msg);
                return Ok(Flow::Stop(StopReason::AcquisitionFailed(msg)));
            }
            Err(e) => return Err(e),
        };

        let camera = CameraContext::from_calibration(&frame.calibration)?;
        let estimator = RoiEstimator::new(self.settings.padding, self.settings.min_box_size);
        let roi = estimator.estimate(&self.engine, &camera, self.state.tracking.pose())?;

        let zoomed = self.engine.zoom(&camera, roi)?;
        let observations = self.engine.preprocess(&zoomed, &frame)?;
        let uploaded = self.engine.upload(observations)?;

        if self.state.tracking.is_tracking() {
            let init = *self.state.tracking.pose();
            let t = Instant::now();
            let optimized = self.engine.optimize(&uploaded, &init)?;
            self.state.track_fps.tick_duration(t.elapsed());
            self.state.tracking.update_pose(optimized.pose);
            self.state.last_score = Some(optimized.score);
        } else {
            self.state.track_fps.reset();
        }

        let canvas = self
            .engine
            .visualize(&frame, &camera, &roi, self.state.tracking.pose())?;
        self.viewer.show(&canvas)?;
        self.last_canvas = Some(canvas);

        self.export_pose(&camera)?;
        self.state.frames += 1;
        debug!(
            "frame {}: roi {:?}, mode {:?}",
            self.state.frames,
            roi,
            self.state.tracking.mode()
        );

        self.poll_command(self.settings.active_poll);
        self.state.ui_fps.tick_duration(started.elapsed());
        self.report_fps();
        Ok(self.flow())
    }

    fn flow(&self) -> Flow {
        if self.state.tracking.is_terminated() {
            Flow::Stop(StopReason::Quit)
        } else {
            Flow::Continue
        }
    }

    fn poll_command(&mut self, wait: Duration) {
        if let Some(command) = self.commands.poll(wait) {
            let mode = self.state.tracking.apply(command);
            debug!("command {:?} -> {:?}", command, mode);
        }
    }

    /// 指定関節をビュー座標に変換して書き出す
    ///
    /// 書き込み失敗はエクスポートだけを止める。デコード失敗はそのまま返す。
    fn export_pose(&mut self, camera: &CameraContext) -> Result<()> {
        let Some(exporter) = self.exporter.as_mut() else {
            return Ok(());
        };
        let decoding = self.engine.decode(self.state.tracking.pose())?;
        let joint = decoding
            .nearest_joint(self.settings.export_joint)
            .ok_or_else(|| TrackError::InvalidPose("decoding has no joints".into()))?;
        let point = camera.joint_in_view(joint);
        match exporter.export(&point) {
            Ok(_) => self.state.exported += 1,
            Err(e) => {
                warn!("{}; export stopped, tracking continues", e);
                self.exporter = None;
                self.state.export_status = ExportStatus::Failed;
            }
        }
        Ok(())
    }

    fn report_fps(&mut self) {
        self.fps_frames += 1;
        let elapsed = self.fps_timer.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            let mode = self.state.tracking.mode();
            if mode == Mode::Tracking {
                info!(
                    "FPS: {:.1} (track: {:.1}, score: {:.3})",
                    self.fps_frames as f64 / elapsed,
                    self.state.track_fps.fps(),
                    self.state.last_score.unwrap_or(0.0)
                );
            } else {
                info!("FPS: {:.1} ({:?})", self.fps_frames as f64 / elapsed, mode);
            }
            self.fps_frames = 0;
            self.fps_timer = Instant::now();
        }
    }
}
