//! 診断出力の注入口
//!
//! チャネルはグローバルロガーを直接呼ばず、構築時に渡された [`Diagnostics`] に書く。
//! 既定の [`LogDiagnostics`] は `log` ファサードへ流す。

use std::sync::{Arc, Mutex};

use log::Level;

/// チャネルが出す診断メッセージの受け口
pub trait Diagnostics: Send {
    fn debug(&self, msg: &str);
    fn warn(&self, msg: &str);
}

/// `log` クレートへ転送する既定実装
#[derive(Debug, Clone)]
pub struct LogDiagnostics {
    target: &'static str,
}

impl LogDiagnostics {
    pub const DEFAULT_TARGET: &'static str = "rgo_deepcl::channel";

    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogDiagnostics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl Diagnostics for LogDiagnostics {
    fn debug(&self, msg: &str) {
        log::debug!(target: self.target, "{msg}");
    }

    fn warn(&self, msg: &str) {
        log::warn!(target: self.target, "{msg}");
    }
}

/// 受け取ったメッセージを順に記録する。クローンは同じバッファを共有する。
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, msg: &str) {
        // poison されていても記録は続ける
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push((level, msg.to_string()));
    }

    /// 記録済みイベントのスナップショット
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|(_, m)| m).collect()
    }

    /// `needle` を含む最初のメッセージの位置
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.messages().iter().position(|m| m.contains(needle))
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn debug(&self, msg: &str) {
        self.push(Level::Debug, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order_and_levels() {
        let rec = RecordingDiagnostics::new();
        let sink: Box<dyn Diagnostics> = Box::new(rec.clone());
        sink.debug("first");
        sink.warn("second");
        sink.debug("third");
        assert_eq!(rec.messages(), vec!["first", "second", "third"]);
        assert_eq!(rec.warnings(), vec!["second"]);
        assert_eq!(rec.position("thi"), Some(2));
        assert_eq!(rec.position("missing"), None);
    }
}
