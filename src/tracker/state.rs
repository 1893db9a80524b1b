use log::info;

use crate::input::Command;
use crate::pose::HandPose;

/// トラッキングモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Tracking,
    Paused,
}

/// モードと現在ポーズを持つ状態機械
///
/// 一時停止はトラッキングの有無と独立したフラグで、解除すると元のモードに戻る。
/// ポーズが書き換わるのは開始/リセット時と、トラッキング中の最適化結果だけ。
#[derive(Debug, Clone)]
pub struct TrackingState {
    default_pose: HandPose,
    pose: HandPose,
    tracking: bool,
    paused: bool,
    terminated: bool,
}

impl TrackingState {
    pub fn new(default_pose: HandPose) -> Self {
        Self {
            default_pose,
            pose: default_pose,
            tracking: false,
            paused: false,
            terminated: false,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.paused {
            Mode::Paused
        } else if self.tracking {
            Mode::Tracking
        } else {
            Mode::Idle
        }
    }

    /// 一時停止中でなく、最適化を回すべきか
    pub fn is_tracking(&self) -> bool {
        self.tracking && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn pose(&self) -> &HandPose {
        &self.pose
    }

    pub fn default_pose(&self) -> &HandPose {
        &self.default_pose
    }

    /// コマンドを適用して遷移後のモードを返す
    pub fn apply(&mut self, command: Command) -> Mode {
        match command {
            Command::StartReset => {
                // 一時停止中でも下のトラッキング状態は切り替わる
                self.tracking = !self.tracking;
                self.pose = self.default_pose;
                info!(
                    "{} tracking, pose reset",
                    if self.tracking { "start" } else { "stop" }
                );
            }
            Command::TogglePause => {
                self.paused = !self.paused;
                info!("{}", if self.paused { "paused" } else { "resumed" });
            }
            Command::Quit => {
                self.terminated = true;
                info!("quit requested");
            }
        }
        self.mode()
    }

    /// 最適化結果でポーズを置き換える。トラッキング中でなければ何もしない。
    pub fn update_pose(&mut self, pose: HandPose) -> bool {
        if !self.is_tracking() {
            return false;
        }
        self.pose = pose;
        true
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::new(HandPose::default())
    }
}
