pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::Canvas;
pub use skeleton::{draw_hand, BONE_COLOR, JOINT_COLOR, ROI_COLOR};
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;

use crate::error::Result;

/// 可視化結果の表示先
pub trait Viewer {
    fn show(&mut self, canvas: &Canvas) -> Result<()>;
}

/// 何も表示しない（ヘッドレス）
#[derive(Debug, Default)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn show(&mut self, _canvas: &Canvas) -> Result<()> {
        Ok(())
    }
}
