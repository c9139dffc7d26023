//! Error types for the DeepCL pipe bridge.
//!
//! どのエラーもチャネルにとって終端扱い（再試行・再接続はしない）。

use std::path::PathBuf;

/// DeepCL bridge errors
#[derive(thiserror::Error, Debug)]
pub enum DeepclError {
    /// 設定・プラットフォーム不整合（f32 幅、要素サイズ、設定ファイル）
    #[error("configuration error: {0}")]
    Config(String),

    /// 実行ファイルを起動できなかった
    #[error("failed to spawn {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// パイプを開く前にサブプロセスが終了した
    #[error("inference process died during startup ({status})")]
    Startup { status: String, output: String },

    /// パイプ・ファイル操作の I/O エラー
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// 応答が期待した要素数に満たない
    #[error("short response: expected {expected} floats, got {got}")]
    Protocol { expected: usize, got: usize },

    /// 既に閉じたチャネルへの操作
    #[error("inference channel is closed")]
    Closed,
}

impl DeepclError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DeepclError::Io { context: context.into(), source }
    }
}

/// Result type for DeepCL bridge operations
pub type Result<T> = std::result::Result<T, DeepclError>;
