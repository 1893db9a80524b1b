use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::io::{ErrorKind, Seek, SeekFrom};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use hand_tracker::config::Config;
use hand_tracker::export::{read_message, PipeChannel};

/// エクスポートチャネルの中身を表示する（受信側の動作確認用）
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Channel path; defaults to export.path from the config.
    path: Option<PathBuf>,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
    /// Stop after this many messages.
    #[arg(long)]
    count: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let path = match args.path {
        Some(path) => path,
        None => Config::load_or_default(&args.config).export.path,
    };
    let mut channel = PipeChannel::open(&path, false)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let origin = channel.stream_position()?;
    info!("reading {} from offset {}", path.display(), origin);

    let interval = Duration::from_millis(args.interval_ms);
    let mut received = 0u64;
    while args.count.map_or(true, |count| received < count) {
        // 書き手は毎回原点に上書きするので、こちらも原点から読む
        if channel.is_seekable() {
            channel.seek(SeekFrom::Start(origin))?;
        }
        match read_message(&mut channel) {
            Ok(payload) => {
                received += 1;
                // ペイロードは区切りなしの連結なので分割はしない
                println!("[{}] {}", payload.len(), String::from_utf8_lossy(&payload));
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
            Err(e) if e.kind() == ErrorKind::InvalidData => warn!("{}", e),
            Err(e) => return Err(e).context("read failed"),
        }
        thread::sleep(interval);
    }

    info!("{} messages read", received);
    Ok(())
}
