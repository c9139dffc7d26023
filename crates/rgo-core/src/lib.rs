//! rgo-core: 碁盤モデル、CNN 入力キューブ、確率マップからの着手選択
//!
//! 推論そのもの（外部プロセスとのやり取り）は `rgo-deepcl` が担う。

pub mod board;
pub mod features;
pub mod player;
pub mod tensor;
pub mod types;

pub use board::{Board, BoardError, GameState};
pub use features::{CubeEncoder, DeepclCubeEncoder};
pub use player::{DistWrappingMaxPlayer, DistributionBot, Move};
pub use tensor::{Cube, FLOAT_SIZE, Grid, TensorError};
pub use types::{Color, ParseError, Point};
