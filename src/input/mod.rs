//! Command input.
//!
//! The loop polls a [`CommandSource`] once per iteration and gets at most one
//! command back. Keyboards, stdin and scripted test sequences all sit behind
//! the same trait.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::warn;

/// ユーザーコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// トラッキング開始/停止（どちらでも初期ポーズにリセット）
    StartReset,
    TogglePause,
    Quit,
}

impl Command {
    /// 's' / 'p' / 'q'（大文字小文字を区別しない）
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            's' => Some(Command::StartReset),
            'p' => Some(Command::TogglePause),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

/// 1回のポーリングで0個か1個のコマンドを返す入力源
pub trait CommandSource {
    /// 最大 wait だけ待ってコマンドを1つ取り出す
    fn poll(&mut self, wait: Duration) -> Option<Command>;
}

/// 決められた順にコマンドを返す（テスト・リプレイ用）
///
/// 各要素が1回のポーリング結果に対応する。尽きたら None を返し続ける。
#[derive(Debug, Default)]
pub struct ScriptedCommands {
    script: VecDeque<Option<Command>>,
}

impl ScriptedCommands {
    pub fn new<I: IntoIterator<Item = Option<Command>>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl CommandSource for ScriptedCommands {
    fn poll(&mut self, _wait: Duration) -> Option<Command> {
        self.script.pop_front().flatten()
    }
}

/// 1スロットのコマンドキュー
///
/// 書き込み側（ウィンドウのキー処理など）と共有する。後から来たコマンドは上書きせず捨てる。
#[derive(Debug, Clone, Default)]
pub struct CommandSlot {
    slot: Rc<Cell<Option<Command>>>,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空なら格納して true
    pub fn offer(&self, command: Command) -> bool {
        match self.slot.get() {
            Some(_) => false,
            None => {
                self.slot.set(Some(command));
                true
            }
        }
    }

    pub fn take(&self) -> Option<Command> {
        self.slot.take()
    }
}

impl CommandSource for CommandSlot {
    fn poll(&mut self, wait: Duration) -> Option<Command> {
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        self.take()
    }
}

/// 標準入力の行をコマンドとして読む（ヘッドレス用）
pub struct StdinCommands {
    rx: Receiver<Command>,
}

impl StdinCommands {
    /// 読み取りスレッドを起動する。EOFで Quit を送って終了。
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match line.trim().chars().next().and_then(Command::from_key) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            return;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("unknown command: {}", line.trim()),
                }
            }
            let _ = tx.send(Command::Quit);
        });
        Self { rx }
    }
}

impl CommandSource for StdinCommands {
    fn poll(&mut self, wait: Duration) -> Option<Command> {
        match self.rx.recv_timeout(wait) {
            Ok(cmd) => Some(cmd),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Command::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key() {
        assert_eq!(Command::from_key('s'), Some(Command::StartReset));
        assert_eq!(Command::from_key('P'), Some(Command::TogglePause));
        assert_eq!(Command::from_key('q'), Some(Command::Quit));
        assert_eq!(Command::from_key('x'), None);
    }

    #[test]
    fn test_scripted_one_per_poll() {
        let mut src = ScriptedCommands::new([Some(Command::StartReset), None, Some(Command::Quit)]);
        assert_eq!(src.poll(Duration::ZERO), Some(Command::StartReset));
        assert_eq!(src.poll(Duration::ZERO), None);
        assert_eq!(src.poll(Duration::ZERO), Some(Command::Quit));
        assert_eq!(src.remaining(), 0);
        assert_eq!(src.poll(Duration::ZERO), None);
    }

    #[test]
    fn test_slot_holds_single_command() {
        let writer = CommandSlot::new();
        let mut reader = writer.clone();
        assert!(writer.offer(Command::TogglePause));
        assert!(!writer.offer(Command::Quit));
        assert_eq!(reader.poll(Duration::ZERO), Some(Command::TogglePause));
        assert_eq!(reader.poll(Duration::ZERO), None);
    }
}
