// src/error.rs

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// 流式下载过程中的底层故障
#[derive(Error, Debug)]
pub enum TransferFault {
    #[error("网络中断: {0}")]
    Network(#[from] reqwest::Error),
    #[error("写入失败: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("输入中不含有效的 BV 号")]
    NoIdentifiers,
    #[error("无效的 BV 号: '{0}'")]
    InvalidIdentifier(String),
    #[error("接口未返回数据字段 (BV: {bvid}, cid: {cid})")]
    NoData { bvid: String, cid: u64 },
    #[error("音频字段为空 (BV: {bvid}, cid: {cid})")]
    NoAudioTrack { bvid: String, cid: u64 },
    #[error("视频 {bvid} 没有任何分P")]
    NoParts { bvid: String },
    #[error("接口返回错误 (code: {code}): {message}")]
    Api { code: i64, message: String },
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("无法解析来自 '{url}' 的API响应: {source}")]
    ApiParseFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("下载 '{}' 失败 (HTTP 状态: {}): {source}", .path.display(), display_status(.status))]
    Download {
        path: PathBuf,
        status: Option<StatusCode>,
        #[source]
        source: TransferFault,
    },
    #[error("原文件 '{}' 不存在，无法进行转换", .0.display())]
    MissingInput(PathBuf),
    #[error("转换 '{}' 失败 (退出码: {}): {detail}", .path.display(), display_code(.code))]
    EncoderFailed {
        path: PathBuf,
        code: Option<i32>,
        detail: String,
    },
    #[error("删除原文件 '{}' 失败: {source}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("任务未完成: {0}")]
    TaskFailed(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 错误发生在流水线的哪个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineStage {
    Extraction,
    Resolution,
    Download,
    Conversion,
    Cleanup,
    Setup,
}

impl AppError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            AppError::NoIdentifiers | AppError::InvalidIdentifier(_) => PipelineStage::Extraction,
            AppError::NoData { .. }
            | AppError::NoAudioTrack { .. }
            | AppError::NoParts { .. }
            | AppError::Api { .. }
            | AppError::Network(_)
            | AppError::NetworkMiddleware(_)
            | AppError::ApiParseFailed { .. }
            | AppError::Json(_)
            | AppError::Url(_) => PipelineStage::Resolution,
            AppError::Download { .. } => PipelineStage::Download,
            AppError::MissingInput(_) | AppError::EncoderFailed { .. } => PipelineStage::Conversion,
            AppError::CleanupFailed { .. } => PipelineStage::Cleanup,
            AppError::Io(_)
            | AppError::TaskFailed(_)
            | AppError::Other(_) => PipelineStage::Setup,
        }
    }

    /// 下载失败时最后一次观察到的 HTTP 状态
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            AppError::Download { status, .. } => *status,
            AppError::Network(e) => e.status(),
            AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(e)) => e.status(),
            _ => None,
        }
    }
}

fn display_status(status: &Option<StatusCode>) -> String {
    status.map_or_else(|| "未知".to_string(), |s| s.as_u16().to_string())
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "无".to_string(), |c| c.to_string())
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(AppError::NoIdentifiers.stage(), PipelineStage::Extraction);
        assert_eq!(
            AppError::NoAudioTrack { bvid: "BV166YizqEjc".into(), cid: 1 }.stage(),
            PipelineStage::Resolution
        );
        assert_eq!(
            AppError::MissingInput(PathBuf::from("a.mp4")).stage(),
            PipelineStage::Conversion
        );
        let cleanup = AppError::CleanupFailed {
            path: PathBuf::from("a.mp4"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(cleanup.stage(), PipelineStage::Cleanup);
    }

    #[test]
    fn test_download_error_reports_status() {
        let err = AppError::Download {
            path: PathBuf::from("x.mp4"),
            status: Some(StatusCode::OK),
            source: TransferFault::Io(std::io::Error::other("disk full")),
        };
        assert_eq!(err.http_status(), Some(StatusCode::OK));
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("x.mp4"));
    }
}
