use crate::camera::RgbImage;
use crate::pose::BoundingBox;

/// 0RGB u32 のソフトウェア描画バッファ
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub buffer: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            buffer: vec![0u32; width * height],
        }
    }

    /// RGB画像をバッファにコピー。画素数が足りなければ黒で埋める。
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = (image.width as usize, image.height as usize);
        let mut buffer: Vec<u32> = image
            .data
            .chunks_exact(3)
            .map(|px| u32::from_be_bytes([0, px[0], px[1], px[2]]))
            .collect();
        buffer.resize(width * height, 0);
        Self {
            width,
            height,
            buffer,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        let i = self.index(x as i64, y as i64)?;
        self.buffer.get(i).copied()
    }

    /// 画面内なら buffer の添字
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    /// 画面外は無視
    fn put(&mut self, x: i64, y: i64, color: u32) {
        if let Some(px) = self.index(x, y).and_then(|i| self.buffer.get_mut(i)) {
            *px = color;
        }
    }

    /// 線分を描画
    ///
    /// 長い方の軸に1ピクセルずつ進め、もう一方の軸は四捨五入する。
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (x0, y0) = (i64::from(x0), i64::from(y0));
        let (dx, dy) = (i64::from(x1) - x0, i64::from(y1) - y0);
        let steps = dx.abs().max(dy.abs());
        if steps == 0 {
            self.put(x0, y0, color);
            return;
        }
        let round = |d: i64, i: i64| (2 * d * i + steps).div_euclid(2 * steps);
        for i in 0..=steps {
            self.put(x0 + round(dx, i), y0 + round(dy, i), color);
        }
    }

    /// 塗りつぶした円
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius.max(0)));
        for dy in -r..=r {
            let half = ((r * r - dy * dy) as f64).sqrt() as i64;
            for x in cx - half..=cx + half {
                self.put(x, cy + dy, color);
            }
        }
    }

    /// BBoxの枠線
    pub fn draw_rect(&mut self, bb: &BoundingBox, color: u32) {
        let x0 = bb.x as i32;
        let y0 = bb.y as i32;
        let x1 = bb.right() as i32 - 1;
        let y1 = bb.bottom() as i32 - 1;
        self.draw_line(x0, y0, x1, y0, color);
        self.draw_line(x1, y0, x1, y1, color);
        self.draw_line(x1, y1, x0, y1, color);
        self.draw_line(x0, y1, x0, y0, color);
    }
}
