// src/downloader/progress.rs

use crate::{
    constants,
    extractor::Bvid,
    models::{IdentifierOutcome, IdentifierStatus, MediaPart, PartOutcome, VideoInfo},
    symbols, ui, utils,
};
use colored::*;
use indicatif::{HumanBytes, ProgressBar};
use itertools::Itertools;
use std::{path::Path, time::Duration};

/// 流水线在各阶段发出的事件
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    IdentifiersFound(&'a [Bvid]),
    IdentifierStarted {
        bvid: &'a Bvid,
        index: usize,
        total: usize,
    },
    VideoResolved(&'a VideoInfo),
    PartStarted {
        part: &'a MediaPart,
        file_name: &'a str,
    },
    DownloadProgress {
        written: u64,
        total: u64,
    },
    Downloaded {
        path: &'a Path,
        bytes: u64,
        elapsed: Duration,
    },
    AlreadyPresent(&'a Path),
    Converting {
        input: &'a Path,
        output: &'a Path,
    },
    EncoderLine(&'a str),
    Converted(&'a Path),
    RawRemoved(&'a Path),
    PartFinished(&'a PartOutcome),
    IdentifierFinished(&'a IdentifierOutcome),
}

pub trait PipelineObserver: Send {
    fn on_event(&mut self, event: PipelineEvent<'_>);
}

/// 丢弃所有事件
#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn on_event(&mut self, _event: PipelineEvent<'_>) {}
}

/// 终端输出：下载进度条与每个阶段的提示
#[derive(Default)]
pub struct ConsoleObserver {
    verbose: bool,
    pbar: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            pbar: None,
        }
    }

    fn finish_bar(&mut self) {
        if let Some(pbar) = self.pbar.take() {
            pbar.finish_and_clear();
        }
    }

    fn println(&self, line: &str) {
        match &self.pbar {
            Some(pbar) => pbar.println(line),
            None => println!("{}", line),
        }
    }
}

impl PipelineObserver for ConsoleObserver {
    fn on_event(&mut self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::IdentifiersFound(ids) => {
                ui::info(&format!("成功获取到BV号：{}", ids.iter().join("、")));
            }
            PipelineEvent::IdentifierStarted { bvid, index, total } => {
                ui::print_sub_header(&format!("[{}/{}] {}", index + 1, total, bvid));
            }
            PipelineEvent::VideoResolved(info) => {
                ui::info(&format!(
                    "《{}》 共 {} 个分P",
                    utils::truncate_text(&info.title, 60),
                    info.parts.len()
                ));
            }
            PipelineEvent::PartStarted { part, file_name } => {
                ui::plain(&format!(
                    "  P{} {}",
                    part.page,
                    utils::truncate_text(file_name, constants::FILENAME_TRUNCATE_LENGTH).bold()
                ));
            }
            PipelineEvent::DownloadProgress { written, total } => {
                let pbar = self.pbar.get_or_insert_with(|| {
                    if total > 0 {
                        ui::new_bytes_progress_bar(total, "下载")
                    } else {
                        ui::new_spinner("下载")
                    }
                });
                pbar.set_position(written);
            }
            PipelineEvent::Downloaded {
                bytes, elapsed, ..
            } => {
                self.finish_bar();
                ui::success(&format!(
                    "下载完成 ({}, 用时 {:.1}s)",
                    HumanBytes(bytes),
                    elapsed.as_secs_f64()
                ));
            }
            PipelineEvent::AlreadyPresent(path) => {
                self.finish_bar();
                println!(
                    "{} {}",
                    *symbols::SKIP,
                    format!("文件已存在，跳过: {}", path.display()).dimmed()
                );
            }
            PipelineEvent::Converting { output, .. } => {
                ui::info(&format!("正在转换为 {}", output.display()));
            }
            PipelineEvent::EncoderLine(line) => {
                if self.verbose {
                    self.println(&format!("    {}", line.dimmed()));
                }
            }
            PipelineEvent::Converted(path) => {
                ui::success(&format!("转换完成: {}", path.display()));
            }
            PipelineEvent::RawRemoved(_) => {}
            PipelineEvent::PartFinished(outcome) => {
                self.finish_bar();
                if outcome.status.is_failure() {
                    let (symbol, color, text) = outcome.status.get_display_info();
                    let detail = outcome.message.as_deref().unwrap_or(text);
                    eprintln!("{} {}", symbol, color(detail.into()));
                }
            }
            PipelineEvent::IdentifierFinished(outcome) => {
                self.finish_bar();
                if outcome.status == IdentifierStatus::Skipped {
                    ui::info(&format!("{} 的所有分P均已存在", outcome.bvid));
                }
            }
        }
    }
}
