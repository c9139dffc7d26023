//! rgo-deepcl: 外部の CNN 推論プロセス（DeepCL `deepclexec`）を名前付きパイプで駆動する
//!
//! - [`ProcessChannel`]: 推論プロセスの起動・パイプの接続・後始末
//! - [`InferenceAdapter`]: 局面をキューブにして送り、`side×side` の確率マップを受け取る
//!
//! ```no_run
//! use rgo_core::{Color, DistWrappingMaxPlayer, GameState};
//! use rgo_deepcl::{ChannelConfig, InferenceAdapter};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = ChannelConfig::new("/opt/DeepCL/build/deepclexec")
//!     .with_option("weightsfile", "/opt/DeepCL/weights.dat");
//! let mut player = DistWrappingMaxPlayer::new(InferenceAdapter::spawn(&cfg)?);
//! let mv = player.genmove(&GameState::empty(19)?, Color::White)?;
//! println!("{mv}");
//! player.handle_quit()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(unix))]
compile_error!("rgo-deepcl talks to the inference process through FIFOs and needs a unix target");

pub mod adapter;
pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod error;
mod sys;
pub mod wire;

pub use adapter::{AdapterState, InferenceAdapter};
pub use channel::{BlockingInferenceChannel, ProcessChannel};
pub use config::{ChannelConfig, DEFAULT_GRACE_PERIOD, INPUT_FILE_KEY, OUTPUT_FILE_KEY};
pub use diagnostics::{Diagnostics, LogDiagnostics, RecordingDiagnostics};
pub use error::{DeepclError, Result};
