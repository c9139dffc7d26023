//! 盤面と局面
//!
//! 推論プロセスへ渡す特徴量を作るのに必要な最小限の情報だけを持つ。
//! 取り・自殺手・超劫などのルール判定は行わない（石を置くだけ）。

use crate::types::{Color, MAX_SIDE, Point};

/// 盤サイズ不正
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board side must be in 1..={max}, got {0}", max = MAX_SIDE)]
    InvalidSide(usize),

    #[error("point {point} is outside a {side}x{side} board")]
    OutOfBounds { point: Point, side: usize },

    #[error("point {0} is already occupied")]
    Occupied(Point),
}

/// 正方形の碁盤
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    side: usize,
    cells: Vec<Option<Color>>,
}

impl Board {
    pub fn new(side: usize) -> Result<Self, BoardError> {
        if side == 0 || side > MAX_SIDE {
            return Err(BoardError::InvalidSide(side));
        }
        Ok(Self { side, cells: vec![None; side * side] })
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        (point.row as usize) < self.side && (point.col as usize) < self.side
    }

    /// 交点の石。盤外は `None`。
    pub fn get(&self, point: Point) -> Option<Color> {
        if !self.contains(point) {
            return None;
        }
        self.cells[point.index(self.side)]
    }

    pub fn is_empty_at(&self, point: Point) -> bool {
        self.contains(point) && self.get(point).is_none()
    }

    /// 石が1つもないか
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// 石を置く（取りは処理しない）
    pub fn play(&mut self, point: Point, color: Color) -> Result<(), BoardError> {
        if !self.contains(point) {
            return Err(BoardError::OutOfBounds { point, side: self.side });
        }
        let cell = &mut self.cells[point.index(self.side)];
        if cell.is_some() {
            return Err(BoardError::Occupied(point));
        }
        *cell = Some(color);
        Ok(())
    }

    /// 行優先で全交点を列挙する
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.side * self.side).map(move |i| Point::from_index(i, self.side))
    }
}

/// 推論リクエストの入力となる局面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    /// 直前の劫取りで着手禁止になっている点
    pub ko_point: Option<Point>,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        Self { board, ko_point: None }
    }

    /// 空の盤から始める
    pub fn empty(side: usize) -> Result<Self, BoardError> {
        Ok(Self::new(Board::new(side)?))
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.board.side()
    }

    /// 着手候補になりうる点か（空点かつ劫でない）
    pub fn is_candidate(&self, point: Point) -> bool {
        self.board.is_empty_at(point) && self.ko_point != Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_bad_sides() {
        assert_eq!(Board::new(0), Err(BoardError::InvalidSide(0)));
        assert_eq!(Board::new(26), Err(BoardError::InvalidSide(26)));
        assert!(Board::new(19).is_ok());
    }

    #[test]
    fn play_places_stones_without_captures() {
        let mut board = Board::new(9).unwrap();
        assert!(board.is_empty());
        board.play(Point::new(4, 4), Color::Black).unwrap();
        assert_eq!(board.get(Point::new(4, 4)), Some(Color::Black));
        assert!(!board.is_empty());
        assert_eq!(
            board.play(Point::new(4, 4), Color::White),
            Err(BoardError::Occupied(Point::new(4, 4)))
        );
        assert!(matches!(
            board.play(Point::new(9, 0), Color::White),
            Err(BoardError::OutOfBounds { side: 9, .. })
        ));
        assert_eq!(board.get(Point::new(20, 20)), None);
    }

    #[test]
    fn ko_point_is_not_a_candidate() {
        let mut state = GameState::empty(5).unwrap();
        state.board.play(Point::new(0, 0), Color::White).unwrap();
        state.ko_point = Some(Point::new(1, 1));
        assert!(!state.is_candidate(Point::new(0, 0)));
        assert!(!state.is_candidate(Point::new(1, 1)));
        assert!(state.is_candidate(Point::new(2, 2)));
        assert_eq!(state.board.points().count(), 25);
    }
}
