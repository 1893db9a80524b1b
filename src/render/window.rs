use minifb::{Key, KeyRepeat, Window, WindowOptions};

use super::canvas::Canvas;
use super::Viewer;
use crate::error::{Result, TrackError};
use crate::input::{Command, CommandSlot};

/// minifbを使用したレンダラー
///
/// 表示のたびにキー入力を拾い、S / P / Q をコマンドスロットへ入れる。
/// ウィンドウが閉じられたら Quit。
pub struct MinifbRenderer {
    window: Window,
    width: usize,
    height: usize,
    commands: CommandSlot,
}

impl MinifbRenderer {
    /// ウィンドウを作成
    pub fn new(
        title: &str,
        width: usize,
        height: usize,
        commands: CommandSlot,
    ) -> anyhow::Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            width,
            height,
            commands,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn collect_keys(&self) {
        if !self.is_open() {
            self.commands.offer(Command::Quit);
            return;
        }
        let mapping = [
            (Key::S, Command::StartReset),
            (Key::P, Command::TogglePause),
            (Key::Q, Command::Quit),
        ];
        for (key, command) in mapping {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                self.commands.offer(command);
            }
        }
    }
}

impl Viewer for MinifbRenderer {
    fn show(&mut self, canvas: &Canvas) -> Result<()> {
        if canvas.width == self.width && canvas.height == self.height {
            self.window
                .update_with_buffer(&canvas.buffer, canvas.width, canvas.height)
                .map_err(|e| TrackError::Display(e.to_string()))?;
        } else {
            // サイズが異なる場合はクロップ/パディング
            let mut buffer = vec![0u32; self.width * self.height];
            for y in 0..self.height.min(canvas.height) {
                for x in 0..self.width.min(canvas.width) {
                    buffer[y * self.width + x] = canvas.buffer[y * canvas.width + x];
                }
            }
            self.window
                .update_with_buffer(&buffer, self.width, self.height)
                .map_err(|e| TrackError::Display(e.to_string()))?;
        }
        self.collect_keys();
        Ok(())
    }
}
