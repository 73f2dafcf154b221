// src/config/session.rs

use crate::{
    config::ExternalConfig,
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use std::{fs, path::PathBuf};

/// 程序数据目录，可通过环境变量 BILI_AUDIO_DL_HOME 覆盖
pub fn get_app_dir() -> AppResult<PathBuf> {
    if let Ok(dir) = std::env::var("BILI_AUDIO_DL_HOME") && !dir.is_empty() {
        return Ok(PathBuf::from(dir));
    }
    let path = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
        .join(constants::CONFIG_DIR_NAME);
    Ok(path)
}

pub(super) fn get_config_path() -> AppResult<PathBuf> {
    Ok(get_app_dir()?.join(constants::CONFIG_FILE_NAME))
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    if config_path.is_file() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("配置文件 {:?} 不存在，将创建默认配置。", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(&config_path, json_content)?;

        Ok(config)
    }
}

pub fn load_sessdata_from_config() -> Option<String> {
    load_or_create_external_config()
        .ok()
        .and_then(|config| config.sessdata)
}

/// 按 命令行 -> 环境变量 -> 配置文件 的顺序查找 SESSDATA
pub fn resolve_sessdata(cli_value: Option<&str>) -> (Option<String>, String) {
    if let Some(value) = cli_value && !value.is_empty() {
        debug!("使用来自命令行参数的 SESSDATA");
        return (Some(value.to_string()), "命令行参数".to_string());
    }
    if let Ok(value) = std::env::var(constants::SESSDATA_ENV) && !value.is_empty() {
        debug!("使用来自环境变量 {} 的 SESSDATA", constants::SESSDATA_ENV);
        return (
            Some(value),
            format!("环境变量 ({})", constants::SESSDATA_ENV),
        );
    }
    if let Some(value) = load_sessdata_from_config() && !value.is_empty() {
        debug!("使用来自本地配置文件的 SESSDATA");
        return (Some(value), "本地配置文件".to_string());
    }
    debug!("未在任何位置找到可用的 SESSDATA");
    (None, "未找到".to_string())
}
