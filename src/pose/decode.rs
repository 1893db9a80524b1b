use nalgebra::{Matrix4, Vector4};

use super::hand::HandPose;
use crate::error::Result;

/// 部位ごとの関節変換（ローカル→ワールド, 4x4 同次変換）
#[derive(Debug, Clone)]
pub struct DecodedPart {
    pub name: String,
    pub transforms: Vec<Matrix4<f64>>,
}

/// 27次元ポーズを分解した3D変換の集合
#[derive(Debug, Clone, Default)]
pub struct Decoding {
    pub parts: Vec<DecodedPart>,
}

impl Decoding {
    pub fn push(&mut self, name: impl Into<String>, transforms: Vec<Matrix4<f64>>) {
        self.parts.push(DecodedPart {
            name: name.into(),
            transforms,
        });
    }

    /// 全関節変換を部位順に平坦化して列挙
    pub fn joints(&self) -> impl Iterator<Item = &Matrix4<f64>> {
        self.parts.iter().flat_map(|p| p.transforms.iter())
    }

    pub fn joint_count(&self) -> usize {
        self.parts.iter().map(|p| p.transforms.len()).sum()
    }

    /// 指定インデックスに最も近い関節。None または範囲外なら最後の関節。
    pub fn nearest_joint(&self, index: Option<usize>) -> Option<&Matrix4<f64>> {
        let count = self.joint_count();
        if count == 0 {
            return None;
        }
        let i = index.map_or(count - 1, |i| i.min(count - 1));
        self.joints().nth(i)
    }

    /// 各関節の原点（ワールド座標, 同次）
    pub fn joint_origins(&self) -> Vec<Vector4<f64>> {
        self.joints().map(joint_origin).collect()
    }
}

/// 関節変換 m の原点 m * (0, 0, 0, 1)
pub fn joint_origin(m: &Matrix4<f64>) -> Vector4<f64> {
    m * Vector4::new(0.0, 0.0, 0.0, 1.0)
}

/// ポーズ → 関節変換の幾何デコード
pub trait HandDecoder {
    fn decode(&self, pose: &HandPose) -> Result<Decoding>;
}

impl<D: HandDecoder + ?Sized> HandDecoder for &D {
    fn decode(&self, pose: &HandPose) -> Result<Decoding> {
        (**self).decode(pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Translation3::new(x, y, z).to_homogeneous()
    }

    fn sample() -> Decoding {
        let mut d = Decoding::default();
        d.push("palm", vec![translation(0.0, 0.0, 0.0)]);
        d.push("index", vec![translation(1.0, 0.0, 0.0), translation(2.0, 0.0, 0.0)]);
        d
    }

    #[test]
    fn test_joint_count_and_order() {
        let d = sample();
        assert_eq!(d.joint_count(), 3);
        let xs: Vec<f64> = d.joint_origins().iter().map(|v| v.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_nearest_joint_defaults_to_last() {
        let d = sample();
        assert_eq!(joint_origin(d.nearest_joint(None).unwrap()).x, 2.0);
        assert_eq!(joint_origin(d.nearest_joint(Some(1)).unwrap()).x, 1.0);
        // 範囲外は最後にクランプ
        assert_eq!(joint_origin(d.nearest_joint(Some(99)).unwrap()).x, 2.0);
    }

    #[test]
    fn test_nearest_joint_empty() {
        assert!(Decoding::default().nearest_joint(None).is_none());
    }
}
