//! # card-png：命令行入口
//!
//! 本文件仅负责参数解析与输出格式，业务逻辑见 `lib.rs` 架构文档。
//! `<src>` 可以是本地路径，也可以是 `http(s)://` 地址；完整用法见 `card-png --help`。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use card_png::character::{Revision, Sheet};
use card_png::png::{CardFetcher, CharacterCard, Processor, ScanMode};
use card_png::{CardConfig, CardError};

fn main() -> ExitCode {
    let matches = create_cmd_args().get_matches();

    let level = if matches.get_flag("debug") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

fn src_arg() -> Arg {
    Arg::new("src")
        .help("输入图片：本地路径或 http(s):// 地址")
        .required(true)
}

fn out_arg() -> Arg {
    Arg::new("out")
        .help("输出 PNG 路径")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

#[rustfmt::skip]
fn create_cmd_args() -> Command {
    Command::new("card-png")
        .about("读取、写入 PNG tEXt 块中的角色卡载荷")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("debug")
            .long("debug")
            .global(true)
            .action(ArgAction::SetTrue)
            .help_heading("LOGGING")
            .help("Display debug information and higher"))
        .subcommand(Command::new("inspect")
            .about("输出来源类型、尺寸、修订号与载荷大小")
            .arg(src_arg()))
        .subcommand(Command::new("extract")
            .about("输出解码后的角色卡 JSON")
            .arg(src_arg())
            .arg(Arg::new("mode")
                .help("多个卡片块并存时的选择策略")
                .value_parser(value_parser!(ScanMode))
                .default_value(ScanMode::FIRST.as_str())))
        .subcommand(Command::new("embed")
            .about("将 JSON 写入图片，替换已有载荷")
            .arg(src_arg().id("image"))
            .arg(Arg::new("json")
                .help("角色卡 JSON 文件")
                .value_parser(value_parser!(PathBuf))
                .required(true))
            .arg(out_arg())
            .arg(Arg::new("revision")
                .help("写入的修订号；缺省时沿用 JSON 自身的 spec 标记")
                .value_parser(value_parser!(Revision))))
        .subcommand(Command::new("strip")
            .about("写出不含载荷的图片")
            .arg(src_arg())
            .arg(out_arg()))
        .subcommand(Command::new("shrink")
            .about("降采样图片，保留载荷")
            .arg(src_arg())
            .arg(out_arg())
            .arg(Arg::new("size")
                .help("较长边的最大像素数")
                .value_parser(value_parser!(u32).range(1..))
                .required(true)))
}

fn run(matches: &ArgMatches) -> Result<(), CardError> {
    let config = CardConfig::default();

    match matches.subcommand() {
        Some(("inspect", args)) => inspect(text(args, "src"), &config),
        Some(("extract", args)) => {
            let mode = args.get_one::<ScanMode>("mode").copied().unwrap_or(config.scan_mode);
            extract(text(args, "src"), mode, &config)
        }
        Some(("embed", args)) => embed(
            text(args, "image"),
            path(args, "json")?,
            path(args, "out")?,
            args.get_one::<Revision>("revision").copied(),
            &config,
        ),
        Some(("strip", args)) => strip(text(args, "src"), path(args, "out")?, &config),
        Some(("shrink", args)) => {
            let size = args.get_one::<u32>("size").copied().unwrap_or(u32::MAX);
            shrink(text(args, "src"), path(args, "out")?, size, &config)
        }
        Some((other, _)) => Err(CardError::InvalidFormat(format!("未知子命令：{}", other))),
        None => Err(CardError::InvalidFormat("缺少子命令".to_string())),
    }
}

fn text<'a>(args: &'a ArgMatches, id: &str) -> &'a str {
    args.get_one::<String>(id).map(String::as_str).unwrap_or_default()
}

fn path<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a Path, CardError> {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| CardError::InvalidFormat(format!("缺少参数 <{}>", id)))
}

fn open(src: &str, config: &CardConfig) -> Result<Processor, CardError> {
    if src.starts_with("http://") || src.starts_with("https://") {
        let fetcher = CardFetcher::new(config)?;
        return Ok(Processor::from_url_with_config(&fetcher, &[src], config));
    }
    Ok(Processor::from_file_with_config(src, config))
}

fn inspect(src: &str, config: &CardConfig) -> Result<(), CardError> {
    let mut processor = open(src, config)?.last_version();
    let kind = if processor.is_scanning() { "png" } else { "converted" };
    let card = processor.get()?;

    println!("source:   {}", kind);
    println!("size:     {}x{}", card.png.width(), card.png.height());
    println!("revision: {}", card.revision);
    println!("payload:  {} bytes", card.raw_chara_data.len());

    if card.has_payload() {
        if let Some(sheet) = card.decode()?.sheet {
            println!("spec:     {} {}", sheet.spec, sheet.version);
            println!("name:     {}", sheet.name());
        }
    }
    Ok(())
}

/// 没有载荷不是错误：只记录警告，不输出 JSON。
fn extract(src: &str, mode: ScanMode, config: &CardConfig) -> Result<(), CardError> {
    let card = open(src, config)?.scan_mode(mode).get()?;
    if !card.has_payload() {
        log::warn!("⚠️ {} 中没有角色卡数据", src);
        return Ok(());
    }

    let raw_json = card.to_raw_json()?;
    let value: serde_json::Value = serde_json::from_slice(&raw_json.raw_json_data)
        .map_err(|e| CardError::Decode(format!("JSON 解析失败：{}", e)))?;
    let pretty =
        serde_json::to_string_pretty(&value).map_err(|e| CardError::Encode(format!("JSON 序列化失败：{}", e)))?;

    println!("{}", pretty);
    Ok(())
}

/// 未指定修订号时沿用 JSON 自身的 `spec` 标记。
fn embed(
    image: &str,
    json: &Path,
    out: &Path,
    revision: Option<Revision>,
    config: &CardConfig,
) -> Result<(), CardError> {
    let json_bytes = std::fs::read(json)
        .map_err(|e| CardError::FileSystem(format!("无法读取 {}：{}", json.display(), e)))?;
    let mut sheet = Sheet::from_bytes(&json_bytes)?;
    if let Some(revision) = revision {
        sheet.set_revision(revision);
    }

    // 旧载荷全部剥离后再写入
    let png = open(image, config)?.last_version().get()?.png;
    let card = CharacterCard {
        png,
        sheet: Some(sheet),
    }
    .encode()?;

    card.to_file(out)?;
    log::info!("💾 已写入 {}（{}，{} 字节）", out.display(), card.revision, card.encoded_len());
    Ok(())
}

fn strip(src: &str, out: &Path, config: &CardConfig) -> Result<(), CardError> {
    // 深度扫描，确保所有卡片块都被剥离
    let mut card = open(src, config)?.last_version().get()?;
    let had_payload = card.has_payload();
    card.raw_chara_data.clear();

    card.to_file(out)?;
    log::info!("🧹 已写入 {}（移除载荷：{}）", out.display(), had_payload);
    Ok(())
}

/// 降采样图片，保留卡片载荷。
fn shrink(src: &str, out: &Path, size: u32, config: &CardConfig) -> Result<(), CardError> {
    let mut card = open(src, config)?.last_version().get()?;
    let (width, height) = (card.png.width(), card.png.height());
    if width.max(height) > size {
        card.png.scale_down(size, config.resize_filter)?;
    }

    card.to_file(out)?;
    log::info!(
        "📐 已写入 {}（{}x{} -> {}x{}，载荷 {} 字节）",
        out.display(),
        width,
        height,
        card.png.width(),
        card.png.height(),
        card.raw_chara_data.len()
    );
    Ok(())
}
