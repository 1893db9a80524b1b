//! Wire format for exported points.
//!
//! `[u32 length, native byte order][payload]`, where the payload is the decimal
//! text of x, y, z and w concatenated with no separator. The consumer on the
//! other end of the pipe expects exactly this; the missing delimiter is kept
//! as is.

use std::io::{self, Read};

use crate::pose::TrackedPoint3D;

/// 長さプレフィックスのバイト数
pub const PREFIX_LEN: usize = 4;

/// 受信側で受け付けるペイロード上限
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// 数値テキストの有効桁数（%.12g 相当）
const SIGNIFICANT_DIGITS: i32 = 12;

/// 1スカラーのテキスト表現
///
/// 有効桁12桁の %g 形式。整数に見える場合は ".0" を付ける（900 → "900.0"）。
pub fn format_scalar(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // 丸め後の指数を得る
    let sci = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= SIGNIFICANT_DIGITS {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs());
    }

    let decimals = (SIGNIFICANT_DIGITS - 1 - exp) as usize;
    let fixed = format!("{:.*}", decimals, v);
    let trimmed = trim_fraction(&fixed);
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{}.0", trimmed)
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// x, y, z, w を区切りなしで連結したペイロード
pub fn encode_payload(point: &TrackedPoint3D) -> String {
    [point.x, point.y, point.z, point.w]
        .iter()
        .map(|&v| format_scalar(v))
        .collect()
}

/// 長さプレフィックス付きメッセージ
pub fn encode_message(point: &TrackedPoint3D) -> Vec<u8> {
    let payload = encode_payload(point);
    let mut message = Vec::with_capacity(PREFIX_LEN + payload.len());
    message.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    message.extend_from_slice(payload.as_bytes());
    message
}

/// 1メッセージ分のペイロードを読む
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; PREFIX_LEN];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_ne_bytes(prefix) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("payload length {} exceeds {}", len, MAX_PAYLOAD_LEN),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
