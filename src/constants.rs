// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const FILENAME_TRUNCATE_LENGTH: usize = 65;
/// 单个路径分量允许的最大字节数，统一上限，不按平台查询
pub const MAX_FILENAME_BYTES: usize = 255;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const SESSDATA_ENV: &str = "BILI_SESSDATA";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const REFERER: &str = "https://www.bilibili.com";

/// 流式下载时每次读取的固定块大小
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;
pub const RAW_EXTENSION: &str = "mp4";
pub const PART_FILE_SUFFIX: &str = ".part";

pub mod api {
    pub const VIEW_URL: &str = "https://api.bilibili.com/x/web-interface/view";
    pub const PLAY_URL: &str = "https://api.bilibili.com/x/player/wbi/playurl";
    pub const NAV_URL: &str = "https://api.bilibili.com/x/web-interface/nav";
    /// 请求 DASH 格式的流
    pub const FNVAL_DASH: &str = "16";
}

pub mod transcode {
    pub const ENCODER: &str = "ffmpeg";
    pub const CODEC: &str = "libmp3lame";
    /// 固定码率，不按输入文件探测
    pub const BITRATE: &str = "192k";
    pub const AUDIO_EXTENSION: &str = "mp3";
}

pub mod audio_quality {
    pub const K64: u32 = 30216;
    pub const K132: u32 = 30232;
    pub const K192: u32 = 30280;
    pub const DOLBY: u32 = 30250;
    pub const HI_RES: u32 = 30251;
    pub const DEFAULT: u32 = K192;
}

pub const HELP_SESSDATA_GUIDE: &str = r#"
1. 使用浏览器登录 https://www.bilibili.com
2. 打开开发者工具 (F12 / Cmd+Opt+I)，切换到 "应用" (Application) 标签页。
3. 在左侧 Cookies -> https://www.bilibili.com 中找到名为 SESSDATA 的条目。
4. 复制其值，通过以下任一方式提供：
   - 命令行参数: --sessdata <值>
   - 环境变量:   BILI_SESSDATA=<值>
   - 配置文件:   ~/.bili-audio-dl/config.json 中的 "sessdata" 字段
未登录时仍可下载，但只能获取较低音质。"#;
