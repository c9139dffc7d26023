//! 局面 → キューブ → パイプ → 確率マップ

use rgo_core::{
    Color, CubeEncoder, DeepclCubeEncoder, DistributionBot, FLOAT_SIZE, GameState, Grid,
};

use crate::channel::{BlockingInferenceChannel, ProcessChannel};
use crate::config::ChannelConfig;
use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::error::{DeepclError, Result};
use crate::wire;

/// アダプタの状態。`Closed` になったら戻らない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Ready,
    Closed,
}

/// 1 本のチャネルを生涯所有し、推論要求を 1 回ずつ流す。
pub struct InferenceAdapter<C = ProcessChannel, E = DeepclCubeEncoder> {
    channel: C,
    encoder: E,
    state: AdapterState,
}

impl InferenceAdapter {
    /// 推論プロセスを起動し、`log` へ診断を流す既定構成で作る
    pub fn spawn(cfg: &ChannelConfig) -> Result<Self> {
        Self::spawn_with(cfg, Box::new(LogDiagnostics::default()))
    }

    pub fn spawn_with(cfg: &ChannelConfig, diag: Box<dyn Diagnostics>) -> Result<Self> {
        let channel = ProcessChannel::spawn(cfg, diag)?;
        Ok(Self::new(channel, DeepclCubeEncoder))
    }
}

impl<C: BlockingInferenceChannel, E: CubeEncoder> InferenceAdapter<C, E> {
    pub fn new(channel: C, encoder: E) -> Self {
        Self { channel, encoder, state: AdapterState::Ready }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// 1 回分の推論。`side×side` の確率マップ（行優先）を返す。
    ///
    /// 失敗したらパイプを閉じてログを回収し、元のエラーを返す。以後このアダプタは使えない。
    pub fn infer(&mut self, state: &GameState, player: Color) -> Result<Grid> {
        if self.state == AdapterState::Closed {
            return Err(DeepclError::Closed);
        }
        match self.exchange(state, player) {
            Ok(grid) => Ok(grid),
            Err(e) => {
                self.channel.diagnostics().warn(&format!("inference request failed: {e}"));
                self.channel.abort();
                self.state = AdapterState::Closed;
                Err(e)
            }
        }
    }

    fn exchange(&mut self, state: &GameState, player: Color) -> Result<Grid> {
        let side = state.side();
        let cube = self.encoder.encode(state, player);
        self.channel.diagnostics().debug(&format!(
            "Sending data, cube.shape = {:?}, {} B",
            cube.shape(),
            cube.byte_len()
        ));
        self.channel.write(&wire::encode_f32s(cube.as_slice()))?;
        drop(cube);

        self.channel.diagnostics().debug("Reading response from CNN...");
        let expected = side * side;
        let response = self.channel.read(expected, FLOAT_SIZE)?;
        self.channel
            .diagnostics()
            .debug(&format!("Got response of size {} B", response.len() * FLOAT_SIZE));
        if response.len() != expected {
            return Err(DeepclError::Protocol { expected, got: response.len() });
        }
        Grid::from_vec(side, response)
            .map_err(|_| DeepclError::Protocol { expected, got: expected })
    }

    /// チャネルを閉じる。何度呼んでもよい。
    pub fn close(&mut self) -> Result<()> {
        self.state = AdapterState::Closed;
        self.channel.close()
    }
}

impl<C: BlockingInferenceChannel, E: CubeEncoder> DistributionBot for InferenceAdapter<C, E> {
    fn gen_probdist_raw(&mut self, state: &GameState, player: Color) -> anyhow::Result<Grid> {
        Ok(self.infer(state, player)?)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        Ok(InferenceAdapter::close(self)?)
    }
}
