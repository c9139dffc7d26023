//! 局面 → 入力キューブの特徴量抽出

use crate::board::GameState;
use crate::tensor::Cube;
use crate::types::Color;

/// 局面をネットワーク入力に変換する。
///
/// 推論プロセス側の学習時と同じ正規化・チャンネル構成でなければならない。
pub trait CubeEncoder {
    /// 出力キューブのチャンネル数
    fn channels(&self) -> usize;

    /// `player` の手番として局面を符号化する
    fn encode(&self, state: &GameState, player: Color) -> Cube;
}

/// DeepCL 向けの 4 平面エンコーダ。手番側から見た相対表現。
///
/// | ch | 内容 |
/// |----|------|
/// | 0  | 手番側の石 |
/// | 1  | 相手側の石 |
/// | 2  | 空点 |
/// | 3  | 劫で打てない点 |
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepclCubeEncoder;

impl DeepclCubeEncoder {
    pub const PLANE_OWN: usize = 0;
    pub const PLANE_OPPONENT: usize = 1;
    pub const PLANE_EMPTY: usize = 2;
    pub const PLANE_KO: usize = 3;
    pub const CHANNELS: usize = 4;
}

impl CubeEncoder for DeepclCubeEncoder {
    fn channels(&self) -> usize {
        Self::CHANNELS
    }

    fn encode(&self, state: &GameState, player: Color) -> Cube {
        let board = &state.board;
        let mut cube = Cube::zeros(Self::CHANNELS, board.side());
        for point in board.points() {
            let plane = match board.get(point) {
                Some(c) if c == player => Self::PLANE_OWN,
                Some(_) => Self::PLANE_OPPONENT,
                None => Self::PLANE_EMPTY,
            };
            cube.set(plane, point, 1.0);
        }
        if let Some(ko) = state.ko_point.filter(|&p| board.contains(p)) {
            cube.set(Self::PLANE_KO, ko, 1.0);
        }
        cube
    }
}
