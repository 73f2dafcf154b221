// src/downloader/transcoder.rs

use crate::{
    config::TranscodeConfig,
    models::{TranscodeOutcome, TranscodeReport},
};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::{ffi::OsString, path::Path, process::Stdio};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};

/// 编码器输出回调，每行调用一次
pub type LineFn<'a> = dyn FnMut(&str) + Send + 'a;

/// 把下载得到的媒体文件转换为目标音频格式
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// 不返回错误：所有失败都体现在 [`TranscodeReport`] 中
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        on_line: &mut LineFn<'_>,
    ) -> TranscodeReport;
}

/// 调用外部 ffmpeg (或兼容程序)
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    pub fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c:a".into(),
            self.config.codec.clone().into(),
            "-b:a".into(),
            self.config.bitrate.clone().into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        on_line: &mut LineFn<'_>,
    ) -> TranscodeReport {
        if !input.exists() {
            let line = format!("原文件【{}】不存在，无法进行转换", input.display());
            error!("{}", line);
            return TranscodeReport {
                outcome: TranscodeOutcome::MissingInput,
                log: vec![line],
            };
        }

        info!(
            "开始转换 '{}' -> '{}' (编码: {}, 码率: {})",
            input.display(),
            output.display(),
            self.config.codec,
            self.config.bitrate
        );
        // 只清理本次生成的输出；已存在的文件由编码器自行拒绝覆盖
        let mut partial = if output.exists() {
            None
        } else {
            Some(PartialOutput(output))
        };
        let mut cmd = Command::new(&self.config.encoder);
        cmd.args(self.build_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("执行命令: {:?}", cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let line = format!("无法启动编码器 '{}': {}", self.config.encoder, e);
                error!("{}", line);
                return TranscodeReport {
                    outcome: TranscodeOutcome::SpawnFailed,
                    log: vec![line],
                };
            }
        };

        let mut log = Vec::new();
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        // 编码器输出不保证是合法 UTF-8
                        let decoded = String::from_utf8_lossy(&buf);
                        let line = decoded.trim_end_matches(['\r', '\n']);
                        debug!("encoder: {}", line);
                        on_line(line);
                        log.push(line.to_string());
                    }
                    Err(e) => {
                        warn!("读取编码器输出失败: {}", e);
                        break;
                    }
                }
            }
        }

        let outcome = match child.wait().await {
            Ok(status) if status.success() => {
                info!("转换成功: {}", output.display());
                if let Some(guard) = partial.take() {
                    guard.keep();
                }
                TranscodeOutcome::Converted
            }
            Ok(status) => {
                error!("编码器异常退出: {}", status);
                TranscodeOutcome::EncoderExit(status.code())
            }
            Err(e) => {
                error!("等待编码器退出失败: {}", e);
                log.push(e.to_string());
                TranscodeOutcome::EncoderExit(None)
            }
        };
        TranscodeReport { outcome, log }
    }
}

/// 转换失败或被取消 (future 被丢弃) 时删除不完整的输出文件
struct PartialOutput<'a>(&'a Path);

impl PartialOutput<'_> {
    fn keep(self) {
        std::mem::forget(self);
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if self.0.exists() {
            match std::fs::remove_file(self.0) {
                Ok(()) => warn!("已删除不完整的输出文件: {}", self.0.display()),
                Err(e) => error!("删除不完整的输出文件 '{}' 失败: {}", self.0.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_args_order() {
        let transcoder = FfmpegTranscoder::new(TranscodeConfig::default());
        let args = transcoder.build_args(&PathBuf::from("in.mp4"), &PathBuf::from("out.mp3"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            vec!["-i", "in.mp4", "-c:a", "libmp3lame", "-b:a", "192k", "out.mp3"]
        );
    }

    #[tokio::test]
    async fn test_missing_input_does_not_spawn() {
        let transcoder = FfmpegTranscoder::new(TranscodeConfig {
            encoder: "definitely-not-a-real-encoder".into(),
            ..TranscodeConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let mut lines = Vec::new();
        let report = transcoder
            .transcode(
                &dir.path().join("missing.mp4"),
                &dir.path().join("missing.mp3"),
                &mut |l: &str| lines.push(l.to_string()),
            )
            .await;
        assert_eq!(report.outcome, TranscodeOutcome::MissingInput);
        assert!(!report.success());
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let transcoder = FfmpegTranscoder::new(TranscodeConfig {
            encoder: "definitely-not-a-real-encoder".into(),
            ..TranscodeConfig::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"data").unwrap();
        let report = transcoder
            .transcode(&input, &dir.path().join("out.mp3"), &mut |_: &str| {})
            .await;
        assert_eq!(report.outcome, TranscodeOutcome::SpawnFailed);
        assert!(input.exists());
    }
}
