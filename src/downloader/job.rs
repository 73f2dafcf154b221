// src/downloader/job.rs

use super::{
    progress::{PipelineEvent, PipelineObserver},
    stream::StreamDownloader,
    transcoder::{FfmpegTranscoder, Transcoder},
};
use crate::{
    DownloadJobContext,
    error::*,
    extractor::{BilibiliResolver, Bvid, StreamResolver, WbiSigner, extract_identifiers},
    models::{
        BatchReport, DownloadOutcome, IdentifierOutcome, IdentifierStatus, MediaPart,
        PartOutcome, PartStatus, TranscodeOutcome, VideoInfo,
    },
    utils,
};
use itertools::Itertools;
use log::{debug, error, info, warn};
use std::{
    fs,
    path::Path,
    sync::Arc,
};

/// 提取 -> 解析 -> 下载 -> 转换 -> 清理，依次处理每个 BV 号的每个分P
pub struct AudioJob {
    context: DownloadJobContext,
    resolver: Arc<dyn StreamResolver>,
    downloader: StreamDownloader,
    transcoder: Arc<dyn Transcoder>,
}

impl AudioJob {
    pub fn new(context: DownloadJobContext) -> Self {
        let signer = Arc::new(WbiSigner::new(
            context.http_client.clone(),
            context.config.endpoints.nav_url.clone(),
        ));
        let resolver = Arc::new(BilibiliResolver::new(
            context.http_client.clone(),
            signer,
            context.config.endpoints.clone(),
        ));
        let transcoder = Arc::new(FfmpegTranscoder::new(context.config.transcode.clone()));
        Self::with_components(context, resolver, transcoder)
    }

    pub fn with_components(
        context: DownloadJobContext,
        resolver: Arc<dyn StreamResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let downloader = StreamDownloader::new(context.http_client.clone());
        Self {
            context,
            resolver,
            downloader,
            transcoder,
        }
    }

    /// 从任意文本中提取 BV 号并逐个处理。文本中没有 BV 号时返回 [`AppError::NoIdentifiers`]。
    pub async fn run_text(
        &self,
        text: &str,
        destination: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> AppResult<BatchReport> {
        let ids = extract_identifiers(text);
        if ids.is_empty() {
            warn!("输入中不含有效的 BV 号: {}", utils::truncate_text(text, 80));
            return Err(AppError::NoIdentifiers);
        }
        info!("成功获取到BV号：{}", ids.iter().join("、"));
        observer.on_event(PipelineEvent::IdentifiersFound(&ids));
        Ok(self.run_batch(&ids, destination, observer).await)
    }

    /// 默认在某个 BV 号失败后停止，其余标记为未处理；开启 keep_going 时继续
    pub async fn run_batch(
        &self,
        ids: &[Bvid],
        destination: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut aborted = false;
        for (index, bvid) in ids.iter().enumerate() {
            if aborted {
                report.outcomes.push(IdentifierOutcome::not_attempted(bvid.clone()));
                continue;
            }
            observer.on_event(PipelineEvent::IdentifierStarted {
                bvid,
                index,
                total: ids.len(),
            });
            let outcome = self.run_identifier(bvid, destination, observer).await;
            observer.on_event(PipelineEvent::IdentifierFinished(&outcome));
            if outcome.status == IdentifierStatus::Failed && !self.context.args.keep_going {
                warn!("{} 处理失败，停止处理剩余的 BV 号", bvid);
                aborted = true;
            }
            report.outcomes.push(outcome);
        }
        report
    }

    /// 处理单个 BV 号的所有分P。出错时立即停止，不会向上返回错误。
    pub async fn run_identifier(
        &self,
        bvid: &Bvid,
        destination: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> IdentifierOutcome {
        let mut parts = Vec::new();
        let mut title = None;
        let result = self
            .process_identifier(bvid, destination, observer, &mut parts, &mut title)
            .await;

        let (status, failure) = match result {
            Ok(()) if parts.iter().any(|p| p.status == PartStatus::Converted) => {
                (IdentifierStatus::Completed, None)
            }
            Ok(()) => (IdentifierStatus::Skipped, None),
            Err(e) => {
                error!("处理 {} 时在 {:?} 阶段出错: {}", bvid, e.stage(), e);
                (IdentifierStatus::Failed, Some((e.stage(), e.to_string())))
            }
        };
        IdentifierOutcome {
            bvid: bvid.clone(),
            title,
            status,
            parts,
            failure,
        }
    }

    async fn process_identifier(
        &self,
        bvid: &Bvid,
        destination: &Path,
        observer: &mut dyn PipelineObserver,
        parts: &mut Vec<PartOutcome>,
        title: &mut Option<String>,
    ) -> AppResult<()> {
        fs::create_dir_all(destination)?;
        let info = self.resolver.fetch_video_info(bvid).await?;
        *title = Some(info.title.clone());
        observer.on_event(PipelineEvent::VideoResolved(&info));

        for part in &info.parts {
            let part_title = info.is_multi_part().then_some(part.title.as_str());
            let file_name = utils::raw_file_name(&info.title, part_title);
            observer.on_event(PipelineEvent::PartStarted {
                part,
                file_name: &file_name,
            });

            let result = self
                .process_part(&info, part, &file_name, destination, observer)
                .await;
            let outcome = match &result {
                Ok(status) => PartOutcome {
                    part: part.clone(),
                    file_name,
                    status: *status,
                    message: None,
                },
                Err(e) => PartOutcome {
                    part: part.clone(),
                    file_name,
                    status: PartStatus::from(e),
                    message: Some(e.to_string()),
                },
            };
            observer.on_event(PipelineEvent::PartFinished(&outcome));
            parts.push(outcome);
            result?;
        }
        Ok(())
    }

    async fn process_part(
        &self,
        info: &VideoInfo,
        part: &MediaPart,
        file_name: &str,
        destination: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> AppResult<PartStatus> {
        let raw_path = destination.join(file_name);
        let converted_name =
            utils::converted_file_name(file_name, &self.context.config.transcode.audio_extension);
        let converted_path = destination.join(&converted_name);

        // 已转换的音频永远不会被覆盖或删除
        if converted_path.exists() {
            info!("音频文件已存在，跳过: {}", converted_path.display());
            observer.on_event(PipelineEvent::AlreadyPresent(&converted_path));
            return Ok(PartStatus::SkippedConverted);
        }
        if raw_path.exists() {
            if self.context.args.force_redownload {
                info!("强制重新下载，删除已存在的原始文件: {}", raw_path.display());
                fs::remove_file(&raw_path)?;
            } else {
                info!("原始文件已存在，跳过: {}", raw_path.display());
                observer.on_event(PipelineEvent::AlreadyPresent(&raw_path));
                return Ok(PartStatus::SkippedRawExists);
            }
        }

        let descriptor = self
            .resolver
            .resolve(&info.bvid, part, self.context.config.audio_quality)
            .await?;

        let outcome = self
            .downloader
            .download(&descriptor, &raw_path, &mut |written: u64, total: u64| {
                observer.on_event(PipelineEvent::DownloadProgress { written, total })
            })
            .await?;
        match outcome {
            DownloadOutcome::Downloaded {
                path,
                bytes,
                elapsed,
            } => observer.on_event(PipelineEvent::Downloaded {
                path: &path,
                bytes,
                elapsed,
            }),
            DownloadOutcome::AlreadyPresent(path) => {
                observer.on_event(PipelineEvent::AlreadyPresent(&path));
                return Ok(PartStatus::SkippedRawExists);
            }
        }

        observer.on_event(PipelineEvent::Converting {
            input: &raw_path,
            output: &converted_path,
        });
        let report = self
            .transcoder
            .transcode(&raw_path, &converted_path, &mut |line: &str| {
                observer.on_event(PipelineEvent::EncoderLine(line))
            })
            .await;
        match report.outcome {
            TranscodeOutcome::Converted => {}
            TranscodeOutcome::MissingInput => return Err(AppError::MissingInput(raw_path)),
            TranscodeOutcome::SpawnFailed => {
                return Err(AppError::EncoderFailed {
                    path: raw_path,
                    code: None,
                    detail: last_line(&report.log),
                });
            }
            TranscodeOutcome::EncoderExit(code) => {
                return Err(AppError::EncoderFailed {
                    path: raw_path,
                    code,
                    detail: last_line(&report.log),
                });
            }
        }
        observer.on_event(PipelineEvent::Converted(&converted_path));

        debug!("正在删除原文件: {}", raw_path.display());
        fs::remove_file(&raw_path).map_err(|source| AppError::CleanupFailed {
            path: raw_path.clone(),
            source,
        })?;
        observer.on_event(PipelineEvent::RawRemoved(&raw_path));
        Ok(PartStatus::Converted)
    }
}

fn last_line(log: &[String]) -> String {
    log.iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}
