/// DeepCL の CNN に 1 手だけ打たせる。
///
/// 空の盤面を用意し、推論プロセスが返した確率マップの最大点を出力する。
///
/// # 使用例
///
/// ```shell
/// cargo run -p rgo-deepcl --release --bin deepcl_genmove -- \
///   --exec /opt/DeepCL/build/deepclexec \
///   --option weightsfile=/opt/DeepCL/weights.dat \
///   --option datadir=/opt/DeepCL/data/kgsgo \
///   --option trainfile=kgsgo-train10k-v2.dat \
///   --side 19 --player w --debug
/// ```
///
/// 設定ファイルを使う場合:
/// ```shell
/// cargo run -p rgo-deepcl --bin deepcl_genmove -- --config deepcl.toml
/// ```
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser as _;
use rgo_core::{Color, DistWrappingMaxPlayer, GameState};
use rgo_deepcl::config::parse_option;
use rgo_deepcl::{ChannelConfig, InferenceAdapter};

#[derive(clap::Parser, Debug)]
#[command(about = "ask a DeepCL CNN (deepclexec) for one move on an empty board")]
struct Cli {
    /// TOML config (executable, grace_period_ms, [options])
    #[arg(long)]
    config: Option<PathBuf>,

    /// deepclexec binary path (overrides the config file)
    #[arg(long)]
    exec: Option<PathBuf>,

    /// Extra key=value option passed to the executable (repeatable)
    #[arg(long = "option", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// Startup grace period in milliseconds before the liveness check
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Board side length
    #[arg(long, default_value_t = 19)]
    side: usize,

    /// Player to move (b / w)
    #[arg(long, default_value = "w")]
    player: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn build_config(cli: &Cli) -> Result<ChannelConfig> {
    let mut cfg = match (&cli.config, &cli.exec) {
        (Some(path), exec) => {
            let mut cfg = ChannelConfig::load(path)?;
            if let Some(exec) = exec {
                cfg.executable = exec.clone();
            }
            cfg
        }
        (None, Some(exec)) => ChannelConfig::new(exec.clone()),
        (None, None) => bail!("either --config or --exec is required"),
    };
    for (k, v) in &cli.options {
        cfg = cfg.with_option(k.clone(), v.clone());
    }
    if let Some(ms) = cli.grace_ms {
        cfg = cfg.with_grace_period(Duration::from_millis(ms));
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .target(env_logger::Target::Stderr)
        .init();

    let cfg = build_config(&cli)?;
    let player: Color = cli.player.parse()?;
    let state = GameState::empty(cli.side)?;

    log::info!("starting {} (grace {:?})", cfg.executable.display(), cfg.grace_period);
    let adapter = InferenceAdapter::spawn(&cfg)?;
    let mut bot = DistWrappingMaxPlayer::new(adapter);

    let mv = bot.genmove(&state, player);
    // genmove が失敗していても後始末は必ず行う
    let closed = bot.handle_quit();
    let mv = mv?;
    closed?;

    log::info!("bot: {mv}");
    println!("{mv}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_or_config_is_required() {
        let cli = Cli::try_parse_from(["deepcl_genmove"]).unwrap();
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn options_and_grace_are_applied() {
        let cli = Cli::try_parse_from([
            "deepcl_genmove",
            "--exec",
            "/opt/deepclexec",
            "--option",
            "weightsfile=w.dat",
            "--option",
            "dataset=gogod",
            "--grace-ms",
            "150",
        ])
        .unwrap();
        let cfg = build_config(&cli).unwrap();
        assert_eq!(cfg.executable, PathBuf::from("/opt/deepclexec"));
        assert_eq!(cfg.options["weightsfile"], "w.dat");
        assert_eq!(cfg.options["dataset"], "gogod");
        assert_eq!(cfg.grace_period, Duration::from_millis(150));
    }

    #[test]
    fn malformed_option_is_rejected_by_clap() {
        let res = Cli::try_parse_from(["deepcl_genmove", "--exec", "x", "--option", "novalue"]);
        assert!(res.is_err());
    }
}
