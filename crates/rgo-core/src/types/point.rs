//! 盤上の交点（Point）

use std::fmt;

use super::ParseError;

/// GTP の列記号。`I` は使わない。
const COLUMN_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// 対応する最大の盤サイズ（列記号の数で決まる）
pub const MAX_SIDE: usize = COLUMN_LETTERS.len();

/// 盤上の交点。`row` は下端が 0（gomill と同じ向き）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: u8,
    pub col: u8,
}

impl Point {
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 行優先（row-major）での添字
    #[inline]
    pub const fn index(self, side: usize) -> usize {
        self.row as usize * side + self.col as usize
    }

    /// 行優先の添字から復元する
    #[inline]
    pub const fn from_index(index: usize, side: usize) -> Self {
        Self { row: (index / side) as u8, col: (index % side) as u8 }
    }

    /// GTP 形式の座標文字列（例: `D4`）
    pub fn to_vertex(self) -> String {
        let col = COLUMN_LETTERS.get(self.col as usize).copied().unwrap_or(b'?') as char;
        format!("{}{}", col, self.row as usize + 1)
    }

    /// GTP 形式の座標文字列を読む。`side` の範囲外はエラー。
    pub fn parse_vertex(s: &str, side: usize) -> Result<Self, ParseError> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .filter(char::is_ascii)
            .ok_or_else(|| ParseError::Vertex(s.to_string()))?;
        let letter = letter.to_ascii_uppercase() as u8;
        let col = COLUMN_LETTERS
            .iter()
            .position(|&c| c == letter)
            .ok_or_else(|| ParseError::Vertex(s.to_string()))?;
        let row: usize =
            chars.as_str().parse().map_err(|_| ParseError::Vertex(s.to_string()))?;
        if row == 0 || row > side || col >= side {
            return Err(ParseError::Vertex(s.to_string()));
        }
        Ok(Self::new((row - 1) as u8, col as u8))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_vertex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_skips_letter_i() {
        assert_eq!(Point::new(0, 0).to_vertex(), "A1");
        assert_eq!(Point::new(3, 3).to_vertex(), "D4");
        assert_eq!(Point::new(18, 8).to_vertex(), "J19");
        assert_eq!(Point::new(18, 18).to_vertex(), "T19");
    }

    #[test]
    fn parse_vertex_roundtrips_and_checks_bounds() {
        assert_eq!(Point::parse_vertex("j19", 19).unwrap(), Point::new(18, 8));
        assert_eq!(Point::parse_vertex("A1", 9).unwrap(), Point::new(0, 0));
        assert!(Point::parse_vertex("I5", 19).is_err());
        assert!(Point::parse_vertex("A0", 19).is_err());
        assert!(Point::parse_vertex("K1", 9).is_err());
        assert!(Point::parse_vertex("A10", 9).is_err());
        assert!(Point::parse_vertex("", 9).is_err());
    }

    #[test]
    fn index_is_row_major() {
        let p = Point::new(2, 5);
        assert_eq!(p.index(9), 23);
        assert_eq!(Point::from_index(23, 9), p);
    }
}
