// src/cli.rs

use crate::constants;
use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// 解析音质参数：支持别名 (64k, 132k, 192k, dolby, hires) 或接口中的数字 ID
pub fn parse_audio_quality(value: &str) -> Result<u32, String> {
    use constants::audio_quality::*;
    match value.trim().to_lowercase().as_str() {
        "64k" => Ok(K64),
        "132k" => Ok(K132),
        "192k" => Ok(K192),
        "dolby" => Ok(DOLBY),
        "hires" | "hi-res" => Ok(HI_RES),
        other => other.parse::<u32>().map_err(|_| {
            format!("无效的音质 '{}'，可选: 64k, 132k, 192k, dolby, hires 或数字 ID", value)
        }),
    }
}

// command 属性
#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["interactive", "url", "batch_file", "sessdata_help"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 启动交互式会话，逐一输入链接
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub interactive: bool,
    /// 视频链接或任意包含 BV 号的文本
    #[arg(long, value_name = "TEXT", help_heading = "Mode")]
    pub url: Option<String>,
    /// 从文本文件批量处理多个链接 (每行一个)
    #[arg(short, long, value_name = "FILE", help_heading = "Mode")]
    pub batch_file: Option<PathBuf>,
    /// 显示如何获取 SESSDATA 的指南并退出
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub sessdata_help: bool,

    // --- 下载选项 (Options) ---
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", default_value_os_t = PathBuf::from(constants::DEFAULT_SAVE_DIR), help_heading = "Options")]
    pub output: PathBuf,
    /// 首选音质: '64k', '132k', '192k', 'dolby', 'hires' 或数字 ID (缺失时回退到第一条音轨)
    #[arg(short, long, value_parser = parse_audio_quality, help_heading = "Options")]
    pub quality: Option<u32>,
    /// 转换时使用的固定码率 (例如 '192k')
    #[arg(long, help_heading = "Options")]
    pub bitrate: Option<String>,
    /// 外部编码器程序路径
    #[arg(long, value_name = "PROGRAM", help_heading = "Options")]
    pub encoder: Option<String>,
    /// 编码器使用的音频编码名 (例如 'libmp3lame')
    #[arg(long, help_heading = "Options")]
    pub codec: Option<String>,
    /// 输出音频文件的扩展名 (例如 'mp3')
    #[arg(long, help_heading = "Options")]
    pub format: Option<String>,
    /// 提供登录 Cookie 中的 SESSDATA，优先级最高
    #[arg(long, help_heading = "Options")]
    pub sessdata: Option<String>,
    /// 强制重新下载已存在的原始文件
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub force_redownload: bool,
    /// 某个 BV 号失败后继续处理后续 BV 号 (默认立即停止整批任务)
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub keep_going: bool,
    /// 实时显示编码器的输出
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub verbose: bool,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
