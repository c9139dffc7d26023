//! `deepclexec` の代役。パイプのプロトコルだけを話す。
//!
//! ```shell
//! mock_deepclexec inputfile=/tmp/x/PIPE_to outputfile=/tmp/x/PIPE_from \
//!   side=9 channels=4 mode=fill value=0.5
//! ```
//!
//! | mode  | 挙動 |
//! |-------|------|
//! | fill  | 各キューブに `side*side` 個の `value` を返す |
//! | echo  | キューブ先頭の `side*side` 個をそのまま返す |
//! | short | 最初のキューブに半分だけ返して終了する |
//! | exit  | パイプを開く前に異常終了する |
//!
//! 未知のキー（`dataset` 等）は無視する。

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use rgo_deepcl::wire::{decode_f32s, encode_f32s};
use rgo_deepcl::{INPUT_FILE_KEY, OUTPUT_FILE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fill,
    Echo,
    Short,
    Exit,
}

struct MockArgs {
    input: PathBuf,
    output: PathBuf,
    side: usize,
    channels: usize,
    mode: Mode,
    value: f32,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<MockArgs> {
    let mut kv = HashMap::new();
    for arg in args {
        let (k, v) = arg.split_once('=').ok_or_else(|| anyhow!("expected key=value, got {arg}"))?;
        kv.insert(k.to_string(), v.to_string());
    }
    let get = |k: &str| kv.get(k).map(String::as_str);
    let mode = match get("mode").unwrap_or("fill") {
        "fill" => Mode::Fill,
        "echo" => Mode::Echo,
        "short" => Mode::Short,
        "exit" => Mode::Exit,
        other => bail!("unknown mode: {other}"),
    };
    Ok(MockArgs {
        input: get(INPUT_FILE_KEY).context("missing inputfile")?.into(),
        output: get(OUTPUT_FILE_KEY).context("missing outputfile")?.into(),
        side: get("side").unwrap_or("19").parse().context("side")?,
        channels: get("channels").unwrap_or("4").parse().context("channels")?,
        mode,
        value: get("value").unwrap_or("0.5").parse().context("value")?,
    })
}

/// キューブ 1 個分を読む。開始前に EOF なら `None`（呼び出し側が閉じた）。
fn read_cube(input: &mut File, len: usize) -> Result<Option<Vec<f32>>> {
    let mut buf = vec![0u8; len * 4];
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => bail!("truncated cube: {filled} of {} B", buf.len()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(decode_f32s(&buf)))
}

fn run(args: MockArgs) -> Result<()> {
    println!(
        "mock_deepclexec: side={} channels={} mode={:?}",
        args.side, args.channels, args.mode
    );
    if args.mode == Mode::Exit {
        bail!("weights file not found, giving up");
    }

    // 呼び出し側と同じ順（PIPE_to → PIPE_from）で開く
    let mut input = File::open(&args.input)
        .with_context(|| format!("open {}", args.input.display()))?;
    let mut output = OpenOptions::new()
        .write(true)
        .open(&args.output)
        .with_context(|| format!("open {}", args.output.display()))?;
    println!("mock_deepclexec ready");

    let cube_len = args.channels * args.side * args.side;
    let plane = args.side * args.side;
    let mut requests = 0u64;
    while let Some(cube) = read_cube(&mut input, cube_len)? {
        requests += 1;
        log::info!("request #{requests}: {} floats", cube.len());
        let response = match args.mode {
            Mode::Fill => vec![args.value; plane],
            Mode::Echo => cube[..plane.min(cube.len())].to_vec(),
            Mode::Short => {
                output.write_all(&encode_f32s(&vec![args.value; plane / 2]))?;
                output.flush()?;
                // 入力を先に閉じておく（呼び出し側が EOF を見た時点で書き込みは EPIPE になる）
                drop(input);
                drop(output);
                println!("mock_deepclexec: short reply sent, exiting");
                return Ok(());
            }
            Mode::Exit => unreachable!(),
        };
        output.write_all(&encode_f32s(&response))?;
        output.flush()?;
    }
    println!("mock_deepclexec: input closed after {requests} requests");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        eprintln!("mock_deepclexec: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parse_args_reads_protocol_keys_and_ignores_others() {
        let parsed = parse_args(args(&[
            "dataset=kgsgo",
            "inputfile=/t/PIPE_to",
            "outputfile=/t/PIPE_from",
            "side=9",
            "mode=echo",
        ]))
        .unwrap();
        assert_eq!(parsed.input, PathBuf::from("/t/PIPE_to"));
        assert_eq!(parsed.side, 9);
        assert_eq!(parsed.channels, 4);
        assert_eq!(parsed.mode, Mode::Echo);
        assert_eq!(parsed.value, 0.5);
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        assert!(parse_args(args(&["inputfile=/a"])).is_err());
        assert!(parse_args(args(&["noequals"])).is_err());
        assert!(parse_args(args(&["inputfile=/a", "outputfile=/b", "mode=dance"])).is_err());
    }
}
