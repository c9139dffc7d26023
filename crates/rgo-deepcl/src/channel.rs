//! 推論プロセスと 2 本の名前付きパイプ
//!
//! 起動手順（順序が重要）:
//!
//! 1. 一時ディレクトリに `PIPE_to`（こちら → 推論プロセス）と `PIPE_from`（逆向き）を作る
//! 2. `inputfile=<PIPE_to> outputfile=<PIPE_from>` を含む `key=value` 引数で起動する
//!    （stdout/stderr はまとめて捕捉する）
//! 3. 猶予時間だけ待ってから生存確認する。既に死んでいればログを回収してエラー
//! 4. `PIPE_to` を書き込みで、次に `PIPE_from` を読み込みで開く
//!
//! FIFO の open は相手側が開くまでブロックする。相手がいない状態で開くと永久に
//! 戻らないので、4 は必ず 3 の後・この順で行う。猶予時間＋ポーリングは経験則で、
//! 起動完了の握手はしていない（既知の制限）。

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use rgo_core::FLOAT_SIZE;
use tempfile::TempDir;

use crate::config::{ChannelConfig, INPUT_FILE_KEY, OUTPUT_FILE_KEY, RESERVED_KEYS};
use crate::diagnostics::Diagnostics;
use crate::error::{DeepclError, Result};
use crate::{sys, wire};

pub const PIPE_TO_NAME: &str = "PIPE_to";
pub const PIPE_FROM_NAME: &str = "PIPE_from";

/// 要求 1 回 = 書いて読む、だけの同期チャネル。
///
/// 同時に 2 つ以上の要求を流すことはない（`&mut self` で表現）。
pub trait BlockingInferenceChannel {
    /// バイト列を送って flush する。応答は待たない。
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// `count` 要素を読むまでブロックする。途中で相手が閉じたら読めた分だけ返す。
    fn read(&mut self, count: usize, elem_size: usize) -> Result<Vec<f32>>;

    /// 要求途中の失敗後に呼ぶ。パイプを閉じてログを回収する。
    fn abort(&mut self);

    /// 全資源を解放する。2 回目以降は何もしない。
    fn close(&mut self) -> Result<()>;

    fn diagnostics(&self) -> &dyn Diagnostics;
}

/// f32 の幅がプロトコルと一致するか
pub(crate) fn check_float_size(size: usize) -> Result<()> {
    if size != FLOAT_SIZE {
        return Err(DeepclError::Config(format!(
            "platform f32 is {size} bytes, the pipe protocol needs {FLOAT_SIZE}"
        )));
    }
    Ok(())
}

/// 利用者のオプションにパイプのパスを差し込み、`key=value` 引数列にする。
///
/// 予約キーが既に入っていれば警告して上書きする。キー順に並ぶ。
pub(crate) fn build_args(
    options: &BTreeMap<String, String>,
    pipe_to: &Path,
    pipe_from: &Path,
    diag: &dyn Diagnostics,
) -> Vec<OsString> {
    let mut merged: BTreeMap<&str, OsString> =
        options.iter().map(|(k, v)| (k.as_str(), OsString::from(v))).collect();
    for key in RESERVED_KEYS {
        if merged.contains_key(key) {
            diag.warn(&format!("'{key}' option is reserved, overriding."));
        }
    }
    merged.insert(INPUT_FILE_KEY, pipe_to.as_os_str().to_owned());
    merged.insert(OUTPUT_FILE_KEY, pipe_from.as_os_str().to_owned());
    merged
        .into_iter()
        .map(|(k, v)| {
            let mut arg = OsString::from(k);
            arg.push("=");
            arg.push(v);
            arg
        })
        .collect()
}

/// 外部推論プロセス＋名前付きパイプ 2 本
pub struct ProcessChannel {
    child: Option<Child>,
    /// stdout/stderr をまとめた捕捉パイプの読み出し側
    log_reader: Option<File>,
    pipe_to: Option<BufWriter<File>>,
    pipe_from: Option<File>,
    pipe_to_path: PathBuf,
    pipe_from_path: PathBuf,
    tempdir: Option<TempDir>,
    diag: Box<dyn Diagnostics>,
    label: String,
    closed: bool,
}

impl ProcessChannel {
    /// 推論プロセスを起動してパイプを接続する。
    ///
    /// 猶予時間の間ブロックし、その後パイプの open でも相手が開くまでブロックする。
    pub fn spawn(cfg: &ChannelConfig, diag: Box<dyn Diagnostics>) -> Result<Self> {
        check_float_size(std::mem::size_of::<f32>())?;

        let tempdir = tempfile::Builder::new()
            .prefix("rgo-deepcl-")
            .tempdir()
            .map_err(|e| DeepclError::io("create temporary directory", e))?;
        let pipe_to_path = tempdir.path().join(PIPE_TO_NAME);
        let pipe_from_path = tempdir.path().join(PIPE_FROM_NAME);
        for path in [&pipe_to_path, &pipe_from_path] {
            sys::mkfifo(path)
                .map_err(|e| DeepclError::io(format!("mkfifo {}", path.display()), e))?;
        }

        let label = cfg
            .executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cfg.executable.display().to_string());
        let args = build_args(&cfg.options, &pipe_to_path, &pipe_from_path, diag.as_ref());
        diag.debug(&format!(
            "Launching {} {}",
            cfg.executable.display(),
            args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ")
        ));

        let (log_reader, child) = launch(&cfg.executable, &args)?;

        // ここから先の失敗は Drop の close() が後始末する
        let mut channel = Self {
            child: Some(child),
            log_reader: Some(log_reader),
            pipe_to: None,
            pipe_from: None,
            pipe_to_path,
            pipe_from_path,
            tempdir: Some(tempdir),
            diag,
            label,
            closed: false,
        };
        channel.wait_alive(cfg)?;
        channel.open_pipes()?;
        Ok(channel)
    }

    fn wait_alive(&mut self, cfg: &ChannelConfig) -> Result<()> {
        std::thread::sleep(cfg.grace_period);
        let polled = match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => return Err(DeepclError::Closed),
        };
        match polled {
            Ok(None) => {
                self.diag.debug(&format!(
                    "{} is alive after {:?} grace period",
                    self.label, cfg.grace_period
                ));
                Ok(())
            }
            Ok(Some(status)) => {
                // 死んでいるならパイプの open で永久に止まるので、ここで打ち切る
                self.diag.debug(&format!("{} died unexpectedly", self.label));
                let output = self.gather_logs();
                Err(DeepclError::Startup { status: status.to_string(), output })
            }
            Err(e) => Err(DeepclError::io(format!("poll {}", self.label), e)),
        }
    }

    fn open_pipes(&mut self) -> Result<()> {
        // 冗長に見えるが、open は相手が開くまで戻らないのでログに残しておく
        self.diag.debug(&format!("Setting up pipe: {}", self.pipe_to_path.display()));
        self.diag
            .debug(&format!("(If this hangs, {} failed to start properly)", self.label));
        let to = OpenOptions::new()
            .write(true)
            .open(&self.pipe_to_path)
            .map_err(|e| DeepclError::io(format!("open {}", self.pipe_to_path.display()), e))?;
        self.pipe_to = Some(BufWriter::new(to));

        self.diag.debug(&format!("Setting up pipe: {}", self.pipe_from_path.display()));
        let from = File::open(&self.pipe_from_path)
            .map_err(|e| DeepclError::io(format!("open {}", self.pipe_from_path.display()), e))?;
        self.pipe_from = Some(from);
        self.diag.debug("Pipes set up.");
        Ok(())
    }

    /// 書き込みバイト列をそのまま送る
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let pipe = self.pipe_to.as_mut().ok_or(DeepclError::Closed)?;
        pipe.write_all(bytes)
            .and_then(|()| pipe.flush())
            .map_err(|e| DeepclError::io(format!("write {} B to {PIPE_TO_NAME}", bytes.len()), e))
    }

    /// `count` 個の f32 を読む。相手が途中で閉じたら読めた分だけ返す（呼び出し側で検査すること）。
    pub fn read(&mut self, count: usize, elem_size: usize) -> Result<Vec<f32>> {
        if elem_size != FLOAT_SIZE {
            return Err(DeepclError::Config(format!(
                "element size {elem_size} is not supported (f32 = {FLOAT_SIZE} B)"
            )));
        }
        let pipe = self.pipe_from.as_mut().ok_or(DeepclError::Closed)?;
        let mut buf = vec![0u8; count * elem_size];
        let mut filled = 0;
        while filled < buf.len() {
            match pipe.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DeepclError::io(format!("read from {PIPE_FROM_NAME}"), e));
                }
            }
        }
        if filled < buf.len() {
            self.diag.debug(&format!(
                "{PIPE_FROM_NAME} closed early: {filled} of {} B",
                buf.len()
            ));
        }
        Ok(wire::decode_f32s(&buf[..filled]))
    }

    /// 両方のパイプを閉じる。既に閉じていれば何もしない。
    pub fn close_pipes(&mut self) {
        // BufWriter の drop で flush される。相手が死んでいれば失敗するが無視してよい
        self.pipe_to.take();
        self.pipe_from.take();
    }

    /// 捕捉している出力を最後まで読み、子プロセスを回収する。
    ///
    /// 子が出力を閉じる（= 終了する）までブロックする。2 回目以降は空文字列。
    pub fn gather_logs(&mut self) -> String {
        self.diag.debug("Gathering subprocess logs.");
        let mut raw = Vec::new();
        if let Some(mut reader) = self.log_reader.take() {
            if let Err(e) = reader.read_to_end(&mut raw) {
                self.diag.warn(&format!("failed to read {} output: {e}", self.label));
            }
        }
        let output = String::from_utf8_lossy(&raw).into_owned();
        if !output.is_empty() {
            self.diag.debug(&format!("{} output:\n{}", self.label, output));
        }
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) => self.diag.debug(&format!("{} exited: {status}", self.label)),
                Err(e) => self.diag.warn(&format!("failed to wait for {}: {e}", self.label)),
            }
        }
        output
    }

    /// パイプを閉じ、ログを回収し、FIFO と一時ディレクトリを消す。
    ///
    /// 子プロセスは kill しない（入力の EOF で自ら終了するのを待つ）。2 回目以降は `Ok(())`。
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.close_pipes();
        self.gather_logs();

        let mut first_err = None;
        for path in [&self.pipe_to_path, &self.pipe_from_path] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound && first_err.is_none() {
                    first_err = Some(DeepclError::io(format!("remove {}", path.display()), e));
                }
            }
        }
        if let Some(dir) = self.tempdir.take() {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                if first_err.is_none() {
                    first_err =
                        Some(DeepclError::io(format!("remove {}", dir_path.display()), e));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// パイプが開いていて要求を流せるか
    pub fn is_connected(&self) -> bool {
        self.pipe_to.is_some() && self.pipe_from.is_some()
    }

    /// (PIPE_to, PIPE_from) のパス
    pub fn pipe_paths(&self) -> (&Path, &Path) {
        (&self.pipe_to_path, &self.pipe_from_path)
    }

    /// 子プロセスの pid（回収済みなら `None`）
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// stdout/stderr を 1 本のパイプにまとめて起動する。
///
/// `Command` はこの関数内で drop され、親側の書き込み端が残らない。
fn launch(executable: &Path, args: &[OsString]) -> Result<(File, Child)> {
    let (log_reader, log_writer) =
        sys::log_pipe().map_err(|e| DeepclError::io("create log pipe", e))?;
    let stderr_writer =
        log_writer.try_clone().map_err(|e| DeepclError::io("duplicate log pipe", e))?;
    let child = Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_writer))
        .stderr(Stdio::from(stderr_writer))
        .spawn()
        .map_err(|source| DeepclError::Spawn { path: executable.to_path_buf(), source })?;
    Ok((log_reader, child))
}

impl BlockingInferenceChannel for ProcessChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        ProcessChannel::write(self, bytes)
    }

    fn read(&mut self, count: usize, elem_size: usize) -> Result<Vec<f32>> {
        ProcessChannel::read(self, count, elem_size)
    }

    fn abort(&mut self) {
        self.close_pipes();
        self.gather_logs();
    }

    fn close(&mut self) -> Result<()> {
        ProcessChannel::close(self)
    }

    fn diagnostics(&self) -> &dyn Diagnostics {
        self.diag.as_ref()
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;

    #[test]
    fn float_size_must_be_four_bytes() {
        assert!(check_float_size(4).is_ok());
        assert!(matches!(check_float_size(8), Err(DeepclError::Config(_))));
    }

    #[test]
    fn build_args_injects_pipes_in_key_order() {
        let rec = RecordingDiagnostics::new();
        let mut options = BTreeMap::new();
        options.insert("weightsfile".to_string(), "w.dat".to_string());
        options.insert("dataset".to_string(), "kgsgo".to_string());
        let args = build_args(&options, Path::new("/t/PIPE_to"), Path::new("/t/PIPE_from"), &rec);
        assert_eq!(
            args,
            vec![
                OsString::from("dataset=kgsgo"),
                OsString::from("inputfile=/t/PIPE_to"),
                OsString::from("outputfile=/t/PIPE_from"),
                OsString::from("weightsfile=w.dat"),
            ]
        );
        assert!(rec.warnings().is_empty());
    }

    #[test]
    fn build_args_overrides_reserved_keys_with_warning() {
        let rec = RecordingDiagnostics::new();
        let mut options = BTreeMap::new();
        options.insert("inputfile".to_string(), "/home/me/in".to_string());
        options.insert("outputfile".to_string(), "/home/me/out".to_string());
        let args = build_args(&options, Path::new("/t/PIPE_to"), Path::new("/t/PIPE_from"), &rec);
        assert_eq!(
            args,
            vec![OsString::from("inputfile=/t/PIPE_to"), OsString::from("outputfile=/t/PIPE_from")]
        );
        let warnings = rec.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'inputfile' option is reserved"));
        assert!(warnings[1].contains("'outputfile' option is reserved"));
    }

    #[test]
    fn spawn_reports_missing_executable() {
        let cfg = ChannelConfig::new("/nonexistent/rgo/deepclexec");
        let rec = RecordingDiagnostics::new();
        let err = ProcessChannel::spawn(&cfg, Box::new(rec.clone())).err().unwrap();
        assert!(matches!(err, DeepclError::Spawn { .. }), "unexpected error: {err}");
        assert!(rec.position("Setting up pipe").is_none());
    }
}
