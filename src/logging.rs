// src/logging.rs

use crate::{cli::LogLevel, config::session, constants};
use log::{LevelFilter, warn};
use std::{env, fs, path::PathBuf};

/// 日志只写入文件，终端输出由 ui 模块负责。级别为 Off 时不创建任何文件。
pub fn setup_logging(level: LogLevel) {
    let filter = LevelFilter::from(level);
    if filter == LevelFilter::Off {
        return;
    }
    let app_name = clap::crate_name!();

    let log_file_path = match session::get_app_dir() {
        Ok(dir) => dir.join(constants::LOG_FILE_NAME),
        Err(_) => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir().join(app_name).join(constants::LOG_FILE_NAME)
        }
    };
    if let Some(dir) = log_file_path.parent()
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(&log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "警告: 无法打开日志文件 {:?} : {}。将尝试使用备用日志文件。",
                log_file_path, e
            );
            let fallback_path: PathBuf = env::temp_dir().join(format!(
                "{}-{}",
                app_name,
                constants::LOG_FALLBACK_FILE_NAME
            ));
            match fern::log_file(&fallback_path) {
                Ok(file) => {
                    warn!("日志将写入备用文件: {:?}", fallback_path);
                    file
                }
                Err(e_fb) => {
                    eprintln!(
                        "错误: 无法创建备用日志文件 {:?}: {}。日志将不会被记录。",
                        fallback_path, e_fb
                    );
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(filter)
        // 第三方库最多输出到 info 级别
        .level_for("reqwest", filter.min(LevelFilter::Info))
        .level_for("hyper_util", filter.min(LevelFilter::Info))
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender)
        .apply();

    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}
