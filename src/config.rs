// src/config.rs

pub mod session;

use self::session::load_or_create_external_config;
use crate::{cli::Cli, constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// 接口地址，可在配置文件中覆盖 (例如使用反向代理)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub view_url: String,
    pub play_url: String,
    pub nav_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            view_url: constants::api::VIEW_URL.into(),
            play_url: constants::api::PLAY_URL.into(),
            nav_url: constants::api::NAV_URL.into(),
        }
    }
}

/// 外部编码器的固定参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscodeConfig {
    pub encoder: String,
    pub codec: String,
    pub bitrate: String,
    pub audio_extension: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            encoder: constants::transcode::ENCODER.into(),
            codec: constants::transcode::CODEC.into(),
            bitrate: constants::transcode::BITRATE.into(),
            audio_extension: constants::transcode::AUDIO_EXTENSION.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessdata: Option<String>,
    #[serde(default)]
    pub audio_quality: Option<u32>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        Self {
            sessdata: None,
            audio_quality: Some(constants::audio_quality::DEFAULT),
            network: NetworkConfig {
                connect_timeout_secs: Some(10),
                timeout_secs: Some(60),
                max_retries: Some(3),
            },
            endpoints: EndpointConfig::default(),
            transcode: TranscodeConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub audio_quality: u32,
    pub endpoints: EndpointConfig,
    pub transcode: TranscodeConfig,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        Ok(Self::from_parts(external_config, args))
    }

    /// 合并配置文件与命令行参数，命令行优先
    pub fn from_parts(external_config: ExternalConfig, args: &Cli) -> Self {
        let mut transcode = external_config.transcode;
        if let Some(encoder) = &args.encoder {
            transcode.encoder = encoder.clone();
        }
        if let Some(codec) = &args.codec {
            transcode.codec = codec.clone();
        }
        if let Some(bitrate) = &args.bitrate {
            transcode.bitrate = bitrate.clone();
        }
        if let Some(format) = &args.format {
            transcode.audio_extension = format.trim_start_matches('.').to_string();
        }

        Self {
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(
                external_config.network.connect_timeout_secs.unwrap_or(10),
            ),
            timeout: Duration::from_secs(external_config.network.timeout_secs.unwrap_or(60)),
            max_retries: external_config.network.max_retries.unwrap_or(3),
            audio_quality: args
                .quality
                .or(external_config.audio_quality)
                .unwrap_or(constants::audio_quality::DEFAULT),
            endpoints: external_config.endpoints,
            transcode,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 1,
            audio_quality: constants::audio_quality::DEFAULT,
            endpoints: EndpointConfig::default(),
            transcode: TranscodeConfig::default(),
        }
    }
}
