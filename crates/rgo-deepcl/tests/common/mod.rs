//! Common test utilities for rgo-deepcl integration tests

#![allow(dead_code)] // These utilities may be used by various test files

use std::path::PathBuf;
use std::time::Duration;

use rgo_deepcl::ChannelConfig;

/// 通常の起動猶予（mock は即座に起動する）
pub const GRACE: Duration = Duration::from_millis(300);
/// 即死させるテスト用。生存確認の前に確実に終了しているだけの余裕を取る
pub const GRACE_FOR_EXIT: Duration = Duration::from_millis(1500);

pub fn mock_exec() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_deepclexec"))
}

/// mock_deepclexec を指定モードで起動する設定
pub fn mock_config(side: usize, channels: usize, mode: &str) -> ChannelConfig {
    ChannelConfig::new(mock_exec())
        .with_grace_period(GRACE)
        .with_option("side", side.to_string())
        .with_option("channels", channels.to_string())
        .with_option("mode", mode)
}

/// 有限で区別しやすい値の列
pub fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32) * 0.25 - 7.5).collect()
}
