//! CNN の入出力テンソル
//!
//! - [`Cube`]: `(channels, side, side)` の入力特徴量
//! - [`Grid`]: `(side, side)` の出力（交点ごとの確率/スコア）
//!
//! どちらも行優先の平坦な `Vec<f32>` で保持し、生成後は変更しない。

use crate::types::Point;

/// `f32` 1要素のバイト数（推論プロセスとの取り決め）
pub const FLOAT_SIZE: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("tensor shape {shape:?} needs {expected} values, got {got}")]
    LengthMismatch { shape: Vec<usize>, expected: usize, got: usize },
}

/// 入力特徴量キューブ
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    channels: usize,
    side: usize,
    data: Vec<f32>,
}

impl Cube {
    /// 平坦化済みのデータからキューブを作る
    pub fn from_vec(channels: usize, side: usize, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = channels * side * side;
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape: vec![channels, side, side],
                expected,
                got: data.len(),
            });
        }
        Ok(Self { channels, side, data })
    }

    pub fn zeros(channels: usize, side: usize) -> Self {
        Self { channels, side, data: vec![0.0; channels * side * side] }
    }

    pub(crate) fn set(&mut self, channel: usize, point: Point, value: f32) {
        let idx = channel * self.side * self.side + point.index(self.side);
        self.data[idx] = value;
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.side, self.side]
    }

    /// 要素数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// パイプに書き出すバイト数
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len() * FLOAT_SIZE
    }

    pub fn get(&self, channel: usize, point: Point) -> f32 {
        self.data[channel * self.side * self.side + point.index(self.side)]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// 1チャンネル分（行優先）
    pub fn plane(&self, channel: usize) -> &[f32] {
        let n = self.side * self.side;
        &self.data[channel * n..(channel + 1) * n]
    }
}

/// 推論結果の確率マップ
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    side: usize,
    data: Vec<f32>,
}

impl Grid {
    /// 平坦な列を `side×side` に整形する。要素数が合わなければエラー（詰め物・切り捨てはしない）。
    pub fn from_vec(side: usize, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = side * side;
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape: vec![side, side],
                expected,
                got: data.len(),
            });
        }
        Ok(Self { side, data })
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn get(&self, point: Point) -> f32 {
        self.data[point.index(self.side)]
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.side..(row + 1) * self.side]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.side)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// 交点と値の組を行優先で列挙する
    pub fn iter(&self) -> impl Iterator<Item = (Point, f32)> + '_ {
        self.data.iter().enumerate().map(move |(i, &v)| (Point::from_index(i, self.side), v))
    }
}
