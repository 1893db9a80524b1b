/// トラッキングループのエラー分類
#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    /// フレーム取得失敗（ストリーム終端・デバイスエラー）。ループは即終了する。
    #[error("acquisition failed: {0}")]
    Acquisition(String),
    /// 投影・デコードできないポーズ。不変条件違反として扱う。
    #[error("invalid pose: {0}")]
    InvalidPose(String),
    #[error("invalid frame size {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    /// エクスポートチャネルへの書き込み失敗。エクスポートのみ停止する。
    #[error("export channel write failed: {0}")]
    ChannelWrite(#[source] std::io::Error),
    #[error("display failed: {0}")]
    Display(String),
    #[error("tracking engine failed: {0}")]
    Engine(String),
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;
