use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::info;

/// エクスポート用の双方向チャネル（名前付きパイプ or 通常ファイル）
///
/// シーク不可のストリーム（FIFO など）では論理位置だけを追跡し、
/// 原点へのシークは成功扱いにする。メッセージ境界は長さプレフィックスで決まる。
pub struct PipeChannel {
    file: File,
    seekable: bool,
    position: u64,
}

impl PipeChannel {
    /// 既存のパイプ/ファイルを読み書きモードで開く。create なら通常ファイルを作成する。
    pub fn open<P: AsRef<Path>>(path: P, create: bool) -> io::Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(path)?;
        let (seekable, position) = match file.stream_position() {
            Ok(pos) => (true, pos),
            Err(_) => (false, 0),
        };
        info!(
            "export channel opened: {} ({})",
            path.display(),
            if seekable { "seekable" } else { "stream" }
        );
        Ok(Self {
            file,
            seekable,
            position,
        })
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }
}

impl Write for PipeChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Read for PipeChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for PipeChannel {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.seekable {
            self.position = self.file.seek(pos)?;
            return Ok(self.position);
        }
        self.position = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(d) => self.position.checked_add_signed(d).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
            })?,
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "stream channel has no end",
                ))
            }
        };
        Ok(self.position)
    }
}
