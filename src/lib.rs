// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod symbols;
pub mod ui;
pub mod utils;
mod workflows;

use crate::{cli::Cli, client::RobustClient, config::AppConfig, error::AppResult};
use colored::*;
use log::{debug, info};
use std::sync::Arc;

/// 核心的执行上下文，包含所有任务所需的状态和工具
#[derive(Clone)]
pub struct DownloadJobContext {
    pub config: Arc<AppConfig>,
    pub http_client: Arc<RobustClient>,
    pub args: Arc<Cli>,
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    if args.sessdata_help {
        ui::box_message(
            "获取 SESSDATA 指南",
            constants::HELP_SESSDATA_GUIDE
                .lines()
                .collect::<Vec<_>>()
                .as_slice(),
            |s| s.cyan(),
        );
        println!(
            "\n{} 安全提醒: SESSDATA 等同于登录凭据，请勿分享给他人。",
            *symbols::INFO
        );
        return Ok(());
    }

    let config = Arc::new(AppConfig::new(&args)?);
    debug!("加载的应用配置: {:?}", config);

    let (sessdata, source) = config::session::resolve_sessdata(args.sessdata.as_deref());
    if sessdata.is_some() {
        info!("从 {} 加载 SESSDATA", source);
        ui::info(&format!("已从 {} 加载 SESSDATA。", source));
    } else {
        info!("未找到 SESSDATA，以游客身份请求");
        println!(
            "{}",
            format!("{} 未找到 SESSDATA，将以游客身份下载 (音质可能受限)。", *symbols::INFO)
                .yellow()
        );
    }

    let http_client = Arc::new(RobustClient::with_session(
        config.clone(),
        sessdata.as_deref(),
    )?);

    let context = DownloadJobContext {
        config,
        http_client,
        args: args.clone(),
    };

    if args.interactive {
        workflows::run_interactive(context).await
    } else if let Some(batch_file) = &args.batch_file {
        workflows::run_batch(context, batch_file).await
    } else if let Some(text) = &args.url {
        workflows::run_single(context, text).await
    } else {
        Ok(())
    }
}
