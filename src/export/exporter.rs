use std::io::{Seek, SeekFrom, Write};

use log::debug;

use super::codec::encode_message;
use crate::error::{Result, TrackError};
use crate::pose::TrackedPoint3D;

/// 追跡点をチャネルへ書き出すエクスポーター
///
/// 毎回チャネルの原点オフセットに書き込み、書き込み後に原点へ戻る。
/// 追記ログではなく、常に直前のメッセージを上書きする。
pub struct PoseExporter<C: Write + Seek> {
    channel: C,
    origin: u64,
    sent: u64,
}

impl<C: Write + Seek> PoseExporter<C> {
    /// 現在位置を原点としてエクスポーターを作成
    pub fn new(mut channel: C) -> Result<Self> {
        let origin = channel.stream_position().map_err(TrackError::ChannelWrite)?;
        Ok(Self {
            channel,
            origin,
            sent: 0,
        })
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// 送信済みメッセージ数
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// 1点を書き出す。戻り値は書き込んだバイト数（4 + ペイロード長）。
    pub fn export(&mut self, point: &TrackedPoint3D) -> Result<usize> {
        let message = encode_message(point);
        self.channel
            .write_all(&message)
            .and_then(|_| self.channel.flush())
            .map_err(TrackError::ChannelWrite)?;
        self.channel
            .seek(SeekFrom::Start(self.origin))
            .map_err(TrackError::ChannelWrite)?;
        self.sent += 1;
        debug!(
            "exported ({}, {}, {}, {}) as {} bytes",
            point.x,
            point.y,
            point.z,
            point.w,
            message.len()
        );
        Ok(message.len())
    }

    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}
