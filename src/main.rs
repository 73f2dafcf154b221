// src/main.rs

use bili_audio_dl::{cli::Cli, logging, run_from_cli, ui};
use clap::{CommandFactory, FromArgMatches};
use colored::*;
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() {
    // 为 Windows 终端启用 ANSI 颜色支持
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| "bili-audio-dl".to_string());

    let after_help = format!(
        "示例:\n  # 启动交互模式\n  {bin} -i\n\n  # 下载链接中所有 BV 号的音频\n  {bin} --url \"https://www.bilibili.com/video/BV166YizqEjc\"\n\n  # 批量处理并在失败后继续\n  {bin} -b my_links.txt --keep-going\n\n  # 获取 SESSDATA 帮助\n  {bin} --sessdata-help",
        bin = bin_name
    );

    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };

    logging::setup_logging(args.log_level);
    log::info!("{} v{} 启动", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    // 任务在独立的 tokio 任务中运行，中断时将其取消：
    // 未完成的临时文件随之删除，编码器进程随之结束
    let mut task = tokio::spawn(run_from_cli(args));
    let result = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} 用户强制中断程序。", "[!]".yellow());
            log::warn!("收到 Ctrl+C，正在取消当前任务");
            task.abort();
            // 交互模式可能阻塞在读取输入上，不无限等待
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
            std::process::exit(130);
        }
    };

    let error = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("任务异常终止: {}", e),
    };
    log::error!("程序执行出错: {}", error);
    eprintln!();
    ui::error(&format!("程序执行出错: {}", error));
    std::process::exit(1);
}
