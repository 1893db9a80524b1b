use std::time::Duration;

/// ループと最適化のFPS（直近1サンプルのみ、診断用）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceMonitor {
    fps: f64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1反復の所要時間（ms）からFPSを更新して返す
    ///
    /// 0以下や非有限の時間は 0 fps として扱う。
    pub fn tick(&mut self, duration_ms: f64) -> f64 {
        self.fps = if duration_ms.is_finite() && duration_ms > 0.0 {
            1000.0 / duration_ms
        } else {
            0.0
        };
        self.fps
    }

    pub fn tick_duration(&mut self, elapsed: Duration) -> f64 {
        self.tick(elapsed.as_secs_f64() * 1000.0)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn reset(&mut self) {
        self.fps = 0.0;
    }
}
