// src/models/mod.rs

pub mod api;

use crate::error::{AppError, PipelineStage, TransferFault};
use crate::extractor::bvid::Bvid;
use crate::symbols;
use colored::{ColoredString, Colorize};
use std::{path::PathBuf, time::Duration};

/// 视频中的一个分P
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub cid: u64,
    pub title: String,
    /// 从 1 开始的序号
    pub page: u32,
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub bvid: Bvid,
    pub title: String,
    pub parts: Vec<MediaPart>,
}

impl VideoInfo {
    pub fn is_multi_part(&self) -> bool {
        self.parts.len() > 1
    }
}

/// 某一音质的音轨及其限时下载地址，只在一次下载中有效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub quality: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded {
        path: PathBuf,
        bytes: u64,
        elapsed: Duration,
    },
    /// 目标文件已存在，未发起任何请求
    AlreadyPresent(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Converted,
    MissingInput,
    SpawnFailed,
    EncoderExit(Option<i32>),
}

#[derive(Debug, Clone)]
pub struct TranscodeReport {
    pub outcome: TranscodeOutcome,
    /// 编码器 stderr 的全部行 (无法解码的字节已被替换)
    pub log: Vec<String>,
}

impl TranscodeReport {
    pub fn success(&self) -> bool {
        self.outcome == TranscodeOutcome::Converted
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PartStatus {
    Converted,
    SkippedRawExists,
    SkippedConverted,
    NoData,
    NoAudioTrack,
    ApiError,
    HttpError,
    NetworkError,
    ConnectionError,
    TimeoutError,
    IoError,
    MissingInput,
    ConversionFailed,
    CleanupFailed,
    UnexpectedError,
}

impl PartStatus {
    pub fn is_skip(&self) -> bool {
        matches!(self, PartStatus::SkippedRawExists | PartStatus::SkippedConverted)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_skip() && *self != PartStatus::Converted
    }

    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            PartStatus::Converted => (&symbols::OK, |s| s.green(), "下载并转换成功"),
            PartStatus::SkippedRawExists => (&symbols::SKIP, |s| s.cyan(), "原始文件已存在，跳过"),
            PartStatus::SkippedConverted => (&symbols::SKIP, |s| s.cyan(), "音频文件已存在，跳过"),
            PartStatus::NoData => (&symbols::ERROR, |s| s.red(), "数据字段无效"),
            PartStatus::NoAudioTrack => (&symbols::ERROR, |s| s.red(), "音频字段为空"),
            PartStatus::ApiError => (&symbols::ERROR, |s| s.red(), "接口返回错误"),
            PartStatus::HttpError => (&symbols::ERROR, |s| s.red(), "服务器返回错误"),
            PartStatus::NetworkError => (&symbols::ERROR, |s| s.red(), "网络请求失败"),
            PartStatus::ConnectionError => (&symbols::ERROR, |s| s.red(), "无法建立连接"),
            PartStatus::TimeoutError => (&symbols::WARN, |s| s.yellow(), "网络连接超时"),
            PartStatus::IoError => (&symbols::ERROR, |s| s.red(), "本地文件读写错误"),
            PartStatus::MissingInput => (&symbols::ERROR, |s| s.red(), "待转换文件不存在"),
            PartStatus::ConversionFailed => (&symbols::ERROR, |s| s.red(), "转换格式失败"),
            PartStatus::CleanupFailed => (&symbols::ERROR, |s| s.red(), "删除原文件失败"),
            PartStatus::UnexpectedError => {
                (&symbols::ERROR, |s| s.red(), "发生未预期的程序错误")
            }
        }
    }
}

impl From<&AppError> for PartStatus {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::NoData { .. } => PartStatus::NoData,
            AppError::NoAudioTrack { .. } => PartStatus::NoAudioTrack,
            AppError::Api { .. } | AppError::ApiParseFailed { .. } | AppError::NoParts { .. } => {
                PartStatus::ApiError
            }
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                classify_reqwest(err)
            }
            AppError::NetworkMiddleware(_) => PartStatus::NetworkError,
            AppError::Download { source, .. } => match source {
                TransferFault::Network(err) => classify_reqwest(err),
                TransferFault::Io(_) => PartStatus::IoError,
            },
            AppError::Io(_) => PartStatus::IoError,
            AppError::MissingInput(_) => PartStatus::MissingInput,
            AppError::EncoderFailed { .. } => PartStatus::ConversionFailed,
            AppError::CleanupFailed { .. } => PartStatus::CleanupFailed,
            _ => PartStatus::UnexpectedError,
        }
    }
}

fn classify_reqwest(err: &reqwest::Error) -> PartStatus {
    if err.is_timeout() {
        PartStatus::TimeoutError
    } else if err.is_connect() {
        PartStatus::ConnectionError
    } else if err.is_status() {
        PartStatus::HttpError
    } else {
        PartStatus::NetworkError
    }
}

#[derive(Debug, Clone)]
pub struct PartOutcome {
    pub part: MediaPart,
    pub file_name: String,
    pub status: PartStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierStatus {
    /// 至少一个分P转换成功，且没有失败
    Completed,
    /// 所有分P均已存在
    Skipped,
    Failed,
    /// 整批任务在此之前已中止
    NotAttempted,
}

#[derive(Debug, Clone)]
pub struct IdentifierOutcome {
    pub bvid: Bvid,
    pub title: Option<String>,
    pub status: IdentifierStatus,
    pub parts: Vec<PartOutcome>,
    pub failure: Option<(PipelineStage, String)>,
}

impl IdentifierOutcome {
    pub fn not_attempted(bvid: Bvid) -> Self {
        Self {
            bvid,
            title: None,
            status: IdentifierStatus::NotAttempted,
            parts: Vec::new(),
            failure: None,
        }
    }
}

/// 一次输入对应的全部处理结果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<IdentifierOutcome>,
}

impl BatchReport {
    pub fn count(&self, status: IdentifierStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| {
            matches!(o.status, IdentifierStatus::Completed | IdentifierStatus::Skipped)
        })
    }

    pub fn first_failure(&self) -> Option<&IdentifierOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status == IdentifierStatus::Failed)
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartOutcome> {
        self.outcomes.iter().flat_map(|o| o.parts.iter())
    }
}
