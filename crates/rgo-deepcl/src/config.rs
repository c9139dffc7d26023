//! 推論プロセス起動設定
//!
//! ```toml
//! executable = "/opt/DeepCL/build/deepclexec"
//! grace_period_ms = 3000
//!
//! [options]
//! dataset = "kgsgo"
//! weightsfile = "weights.dat"
//! ```
//!
//! `options` は `key=value` の位置引数としてそのまま実行ファイルへ渡す。
//! 正規化パラメータは学習時と同じ設定でなければならない点に注意。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DeepclError, Result};

/// 起動後、生存確認までに待つ既定時間
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// 入力パイプ（呼び出し側 → 推論プロセス）のパスを渡す予約キー
pub const INPUT_FILE_KEY: &str = "inputfile";
/// 出力パイプ（推論プロセス → 呼び出し側）のパスを渡す予約キー
pub const OUTPUT_FILE_KEY: &str = "outputfile";

/// 予約キー。利用者が指定しても上書きされる。
pub const RESERVED_KEYS: [&str; 2] = [INPUT_FILE_KEY, OUTPUT_FILE_KEY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub executable: PathBuf,
    pub grace_period: Duration,
    /// 実行ファイルへ渡すオプション（キー順に渡す）
    pub options: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChannelConfig {
    executable: PathBuf,
    #[serde(default)]
    grace_period_ms: Option<u64>,
    #[serde(default)]
    options: Option<BTreeMap<String, toml::Value>>,
}

impl ChannelConfig {
    /// 既定オプション（`dataset=kgsgo`）と既定の猶予時間で作る
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let mut options = BTreeMap::new();
        options.insert("dataset".to_string(), "kgsgo".to_string());
        Self { executable: executable.into(), grace_period: DEFAULT_GRACE_PERIOD, options }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn without_option(mut self, key: &str) -> Self {
        self.options.remove(key);
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// TOML 文字列から読む。`[options]` を省略すると既定オプションになる。
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawChannelConfig =
            toml::from_str(s).map_err(|e| DeepclError::Config(format!("invalid config: {e}")))?;
        let mut cfg = Self::new(raw.executable);
        if let Some(ms) = raw.grace_period_ms {
            cfg.grace_period = Duration::from_millis(ms);
        }
        if let Some(options) = raw.options {
            cfg.options = options
                .into_iter()
                .map(|(k, v)| value_to_arg(&k, v).map(|v| (k, v)))
                .collect::<Result<_>>()?;
        }
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| DeepclError::io(format!("read config {}", path.display()), e))?;
        Self::from_toml_str(&text)
    }

    /// 予約キーに利用者の値が入っているもの
    pub fn reserved_overrides(&self) -> impl Iterator<Item = &str> {
        RESERVED_KEYS.into_iter().filter(|k| self.options.contains_key(*k))
    }
}

fn value_to_arg(key: &str, value: toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(DeepclError::Config(format!(
            "option '{key}' must be a string, number or boolean, got {}",
            other.type_str()
        ))),
    }
}

/// `key=value` 形式の文字列を分解する（CLI の `--option` 用）
pub fn parse_option(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) =
        s.split_once('=').ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty option name in '{s}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
