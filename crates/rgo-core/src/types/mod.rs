//! 基本型

mod color;
mod point;

pub use color::Color;
pub use point::{MAX_SIDE, Point};

/// 文字列表現の解析エラー
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid color: {0:?} (expected b/w/black/white)")]
    Color(String),

    #[error("invalid vertex: {0:?}")]
    Vertex(String),
}
