// src/workflows.rs

use crate::{
    DownloadJobContext,
    downloader::{self, AudioJob, ConsoleObserver},
    error::{AppError, AppResult},
    models::{BatchReport, IdentifierStatus},
    symbols, ui, utils,
};
use colored::*;
use log::{error, info, warn};
use reqwest::StatusCode;
use std::path::Path;

/// 运行单任务模式 (--url)
pub(crate) async fn run_single(context: DownloadJobContext, text: &str) -> AppResult<()> {
    let destination = prepare_output_dir(&context.args.output)?;
    let job = AudioJob::new(context.clone());
    let mut observer = ConsoleObserver::new(context.args.verbose);

    let report = job.run_text(text, &destination, &mut observer).await?;
    downloader::print_report(&report);
    report_to_result(&report)
}

/// 运行交互模式：逐行读取输入，空行或 EOF 退出
pub(crate) async fn run_interactive(context: DownloadJobContext) -> AppResult<()> {
    ui::print_header("交互模式");
    ui::plain(&format!(
        "在此模式下，你可以逐一输入包含 BV 号的链接或文本。直接按回车或 {} 可随时退出。",
        *symbols::CTRL_C
    ));
    let destination = prepare_output_dir(&context.args.output)?;
    let job = AudioJob::new(context.clone());

    loop {
        match ui::prompt("请输入视频链接或 BV 号", None) {
            Ok(input) if !input.is_empty() => {
                let mut observer = ConsoleObserver::new(context.args.verbose);
                let result = job
                    .run_text(&input, &destination, &mut observer)
                    .await
                    .and_then(|report| {
                        downloader::print_report(&report);
                        report_to_result(&report)
                    });
                if let Err(e) = result {
                    error!("交互模式任务 '{}' 失败: {}", input, e);
                    eprintln!("\n{}", friendly_error_message(&e));
                }
            }
            _ => break,
        }
    }

    ui::plain("");
    ui::info("退出交互模式。");
    Ok(())
}

/// 运行批量模式：文件中每行各自作为一次独立输入
pub(crate) async fn run_batch(context: DownloadJobContext, batch_file: &Path) -> AppResult<()> {
    let content = std::fs::read_to_string(batch_file).map_err(|e| {
        error!("读取批量文件 '{}' 失败: {}", batch_file.display(), e);
        AppError::from(e)
    })?;
    let tasks: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect();
    if tasks.is_empty() {
        warn!("批量文件 '{}' 为空或不含有效行。", batch_file.display());
        ui::warn(&format!("批量文件 '{}' 为空。", batch_file.display()));
        return Ok(());
    }

    let destination = prepare_output_dir(&context.args.output)?;
    let job = AudioJob::new(context.clone());
    let mut combined = BatchReport::default();
    let mut failed_tasks = 0;

    ui::print_header(&format!(
        "开始批量处理任务 (共 {} 个，按 {} 可随时退出)",
        tasks.len(),
        *symbols::CTRL_C
    ));
    for (i, task) in tasks.iter().enumerate() {
        ui::print_sub_header(&format!(
            "批量任务 {}/{} - {}",
            i + 1,
            tasks.len(),
            utils::truncate_text(task, 60)
        ));
        let mut observer = ConsoleObserver::new(context.args.verbose);
        match job.run_text(task, &destination, &mut observer).await {
            Ok(report) => {
                if !report.all_succeeded() {
                    failed_tasks += 1;
                }
                combined.outcomes.extend(report.outcomes);
            }
            Err(AppError::NoIdentifiers) => {
                // 无效条目不算失败
                warn!("跳过不含 BV 号的条目: {}", task);
                ui::warn(&format!("跳过无效条目: {}", utils::truncate_text(task, 60)));
            }
            Err(e) => {
                failed_tasks += 1;
                error!("批量任务 '{}' 失败: {}", task, e);
                eprintln!("\n{}", friendly_error_message(&e));
            }
        }
    }

    ui::print_header("批量任务报告");
    downloader::print_report(&combined);
    if failed_tasks > 0 {
        Err(AppError::TaskFailed(format!("{} 个批量任务执行失败", failed_tasks)))
    } else {
        Ok(())
    }
}

fn prepare_output_dir(output: &Path) -> AppResult<std::path::PathBuf> {
    std::fs::create_dir_all(output)?;
    let absolute_path = dunce::canonicalize(output)?;
    info!("文件将保存到目录: \"{}\"", absolute_path.display());
    ui::info(&format!("文件将保存到目录: \"{}\"", absolute_path.display()));
    Ok(absolute_path)
}

fn report_to_result(report: &BatchReport) -> AppResult<()> {
    if report.all_succeeded() {
        return Ok(());
    }
    match report.first_failure() {
        Some(outcome) => {
            let detail = outcome
                .failure
                .as_ref()
                .map(|(stage, msg)| format!("[{:?}] {}", stage, msg))
                .unwrap_or_default();
            Err(AppError::TaskFailed(format!("{} 处理失败 {}", outcome.bvid, detail)))
        }
        None => Err(AppError::TaskFailed(format!(
            "{} 个 BV 号未处理",
            report.count(IdentifierStatus::NotAttempted)
        ))),
    }
}

fn friendly_error_message(e: &AppError) -> String {
    match e {
        AppError::NoIdentifiers => {
            format!("{} {}", *symbols::WARN, "输入中不含有效的 BV 号。".yellow())
        }
        AppError::Network(req_err)
            if req_err
                .status()
                .is_some_and(|s| s == StatusCode::FORBIDDEN || s == StatusCode::NOT_FOUND) =>
        {
            format!(
                "{} {}",
                *symbols::WARN,
                "资源不存在或无权访问，请检查输入是否正确。".yellow()
            )
        }
        _ => format!("{} 处理时发生错误: {}", *symbols::ERROR, e.to_string().red()),
    }
}
