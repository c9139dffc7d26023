//! 確率分布を返すボットと、それを包んで着手を選ぶプレイヤー

use std::fmt;

use anyhow::Result;

use crate::board::GameState;
use crate::tensor::Grid;
use crate::types::{Color, Point};

/// 着手
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Play(Point),
    Pass,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Play(p) => write!(f, "{}", p.to_vertex()),
            Move::Pass => f.write_str("pass"),
        }
    }
}

/// 局面ごとに交点の確率分布（生の値）を返すボット
pub trait DistributionBot {
    /// ネットワークの生出力。合法性によるマスクや正規化はしていない。
    fn gen_probdist_raw(&mut self, state: &GameState, player: Color) -> Result<Grid>;

    /// 保持している外部資源を解放する
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// 着手候補（空点かつ劫でない点）以外を 0 にして和が 1 になるよう正規化する。
    ///
    /// 候補が残らない、あるいは全て 0 以下なら `None`。
    fn gen_probdist(&mut self, state: &GameState, player: Color) -> Result<Option<Grid>> {
        let raw = self.gen_probdist_raw(state, player)?;
        Ok(mask_and_normalize(state, raw))
    }
}

fn mask_and_normalize(state: &GameState, raw: Grid) -> Option<Grid> {
    let side = raw.side();
    let mut values: Vec<f32> = raw
        .iter()
        .map(|(p, v)| if state.is_candidate(p) && v > 0.0 { v } else { 0.0 })
        .collect();
    let total: f32 = values.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    values.iter_mut().for_each(|v| *v /= total);
    Grid::from_vec(side, values).ok()
}

/// 分布の最大点に打つプレイヤー
pub struct DistWrappingMaxPlayer<B> {
    bot: B,
}

impl<B: DistributionBot> DistWrappingMaxPlayer<B> {
    pub fn new(bot: B) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &B {
        &self.bot
    }

    pub fn bot_mut(&mut self) -> &mut B {
        &mut self.bot
    }

    pub fn into_inner(self) -> B {
        self.bot
    }

    /// 着手を生成する。同点は行優先で先の点。
    pub fn genmove(&mut self, state: &GameState, player: Color) -> Result<Move> {
        let Some(dist) = self.bot.gen_probdist(state, player)? else {
            log::debug!("no candidate left for {player}, passing");
            return Ok(Move::Pass);
        };
        let mut best: Option<(Point, f32)> = None;
        for (p, v) in dist.iter() {
            if v > 0.0 && best.is_none_or(|(_, b)| v > b) {
                best = Some((p, v));
            }
        }
        Ok(match best {
            Some((p, prob)) => {
                log::debug!("genmove {player}: {} (p={prob:.4})", p.to_vertex());
                Move::Play(p)
            }
            None => Move::Pass,
        })
    }

    /// 包んでいるボットを閉じる
    pub fn handle_quit(&mut self) -> Result<()> {
        self.bot.close()
    }
}
