// src/downloader/mod.rs

mod job;
pub mod progress;
pub mod stream;
pub mod transcoder;

pub use job::AudioJob;
pub use progress::{ConsoleObserver, NullObserver, PipelineEvent, PipelineObserver};
pub use stream::StreamDownloader;
pub use transcoder::{FfmpegTranscoder, Transcoder};

use crate::{
    models::{BatchReport, IdentifierStatus},
    symbols, ui,
};
use colored::*;
use log::info;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_attempted: usize,
    /// 处理失败的 BV 号，包括尚未列出任何分P就失败的
    pub identifiers_failed: usize,
}

impl DownloadStats {
    /// 以分P为单位统计；未处理的 BV 号各计一次
    pub fn from_report(report: &BatchReport) -> Self {
        let mut stats = DownloadStats::default();
        for part in report.parts() {
            stats.total += 1;
            if part.status.is_failure() {
                stats.failed += 1;
            } else if part.status.is_skip() {
                stats.skipped += 1;
            } else {
                stats.converted += 1;
            }
        }
        stats.not_attempted = report.count(IdentifierStatus::NotAttempted);
        stats.identifiers_failed = report.count(IdentifierStatus::Failed);
        stats
    }
}

pub fn print_report(report: &BatchReport) {
    let stats = DownloadStats::from_report(report);
    info!(
        "处理报告: Total={}, Converted={}, Skipped={}, Failed={}, NotAttempted={}, IdentifiersFailed={}",
        stats.total,
        stats.converted,
        stats.skipped,
        stats.failed,
        stats.not_attempted,
        stats.identifiers_failed
    );

    let skipped: Vec<(String, String)> = report
        .parts()
        .filter(|p| p.status.is_skip())
        .map(|p| (p.file_name.clone(), p.status.get_display_info().2.to_string()))
        .collect();
    let failed: Vec<(String, String)> = report
        .parts()
        .filter(|p| p.status.is_failure())
        .map(|p| (p.file_name.clone(), p.status.get_display_info().2.to_string()))
        .collect();
    // 获取视频信息时就失败的 BV 号没有任何分P记录
    let unresolved: Vec<(String, String)> = report
        .outcomes
        .iter()
        .filter(|o| o.status == IdentifierStatus::Failed && o.parts.is_empty())
        .map(|o| {
            let reason = o.failure.as_ref().map_or("未知错误", |(_, msg)| msg.as_str());
            (o.bvid.to_string(), reason.to_string())
        })
        .collect();
    let pending: Vec<String> = report
        .outcomes
        .iter()
        .filter(|o| o.status == IdentifierStatus::NotAttempted)
        .map(|o| o.bvid.to_string())
        .collect();

    if !skipped.is_empty() || !failed.is_empty() || !unresolved.is_empty() || !pending.is_empty()
    {
        ui::print_sub_header("处理详情报告");
        if !skipped.is_empty() {
            println!("\n{} 跳过的文件 ({}个):", *symbols::INFO, skipped.len());
            print_grouped_report(&skipped, |s| s.cyan());
        }
        if !failed.is_empty() {
            println!("\n{} 失败的文件 ({}个):", *symbols::ERROR, failed.len());
            print_grouped_report(&failed, |s| s.red());
        }
        if !unresolved.is_empty() {
            println!("\n{} 处理失败的 BV 号 ({}个):", *symbols::ERROR, unresolved.len());
            print_grouped_report(&unresolved, |s| s.red());
        }
        if !pending.is_empty() {
            println!("\n{} 未处理的 BV 号 ({}个):", *symbols::WARN, pending.len());
            println!("  - {}", pending.join(", ").yellow());
        }
    }

    ui::print_sub_header("任务总结");
    println!("{}", summary_line(report, &stats));
}

fn summary_line(report: &BatchReport, stats: &DownloadStats) -> String {
    if report.all_succeeded() {
        return format!(
            "{} 所有 {} 个分P均已处理完成 ({} 个已跳过)。",
            *symbols::OK,
            stats.total,
            stats.skipped
        );
    }
    format!(
        "{} | {} | {} | {} | {}",
        format!("成功: {}", stats.converted).green(),
        format!("失败: {}", stats.failed).red(),
        format!("跳过: {}", stats.skipped).yellow(),
        format!("未处理: {}", stats.not_attempted).dimmed(),
        format!("失败的 BV 号: {}", stats.identifiers_failed).red()
    )
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (filename, reason) in items {
        grouped.entry(reason).or_default().push(filename);
    }
    for (reason, mut filenames) in grouped {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        filenames.sort();
        for filename in filenames {
            println!("    - {}", filename);
        }
    }
}
