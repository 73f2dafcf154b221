// tests/pipeline_test.rs

use async_trait::async_trait;
use bili_audio_dl::{
    DownloadJobContext,
    cli::Cli,
    client::RobustClient,
    config::AppConfig,
    downloader::{
        AudioJob, NullObserver, PipelineEvent, PipelineObserver, Transcoder, transcoder::LineFn,
    },
    error::{AppError, AppResult, PipelineStage},
    extractor::{Bvid, StreamResolver},
    models::{
        IdentifierStatus, MediaPart, PartStatus, StreamDescriptor, TranscodeOutcome,
        TranscodeReport, VideoInfo,
    },
};
use clap::Parser;
use mockito::{Matcher, Server, ServerGuard};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::tempdir;

const SINGLE: &str = "BV1aa411c7aa";
const MULTI: &str = "BV1bb411c7bb";
const SILENT: &str = "BV1cc411c7cc";

/// 固定返回预设的视频信息，音频流指向测试服务器
struct FakeResolver {
    media_base: String,
    videos: HashMap<String, VideoInfo>,
    without_audio: HashSet<String>,
}

impl FakeResolver {
    fn new(server: &ServerGuard) -> Self {
        let mut videos = HashMap::new();
        let part = |cid: u64, page: u32, title: &str| MediaPart {
            cid,
            title: title.to_string(),
            page,
        };
        videos.insert(
            SINGLE.to_string(),
            VideoInfo {
                bvid: Bvid::parse(SINGLE).unwrap(),
                title: "单曲 Live".into(),
                parts: vec![part(11, 1, "ignored")],
            },
        );
        videos.insert(
            MULTI.to_string(),
            VideoInfo {
                bvid: Bvid::parse(MULTI).unwrap(),
                title: "合集".into(),
                parts: vec![part(21, 1, "序章"), part(22, 2, "终章")],
            },
        );
        videos.insert(
            SILENT.to_string(),
            VideoInfo {
                bvid: Bvid::parse(SILENT).unwrap(),
                title: "无声".into(),
                parts: vec![part(31, 1, "P1")],
            },
        );
        Self {
            media_base: server.url(),
            videos,
            without_audio: HashSet::from([SILENT.to_string()]),
        }
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn fetch_video_info(&self, bvid: &Bvid) -> AppResult<VideoInfo> {
        self.videos
            .get(bvid.as_str())
            .cloned()
            .ok_or(AppError::Api {
                code: -404,
                message: "啥都木有".into(),
            })
    }

    async fn resolve(
        &self,
        bvid: &Bvid,
        part: &MediaPart,
        quality: u32,
    ) -> AppResult<StreamDescriptor> {
        if self.without_audio.contains(bvid.as_str()) {
            return Err(AppError::NoAudioTrack {
                bvid: bvid.to_string(),
                cid: part.cid,
            });
        }
        Ok(StreamDescriptor {
            quality,
            url: format!("{}/media/{}.m4s", self.media_base, part.cid),
        })
    }
}

/// 把输入复制为输出，并记录调用
#[derive(Default)]
struct CopyTranscoder {
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
    /// 转换后自行删掉输入，使后续的清理步骤失败
    remove_input: bool,
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        on_line: &mut LineFn<'_>,
    ) -> TranscodeReport {
        self.calls.lock().unwrap().push(input.to_path_buf());
        if self.fail {
            on_line("Invalid data found when processing input");
            return TranscodeReport {
                outcome: TranscodeOutcome::EncoderExit(Some(1)),
                log: vec!["Invalid data found when processing input".into()],
            };
        }
        on_line("size=     100kB time=00:00:03.00");
        fs::copy(input, output).unwrap();
        if self.remove_input {
            fs::remove_file(input).unwrap();
        }
        TranscodeReport {
            outcome: TranscodeOutcome::Converted,
            log: vec!["size=     100kB time=00:00:03.00".into()],
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Vec<String>,
    progress: Vec<(u64, u64)>,
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&mut self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::DownloadProgress { written, total } => {
                self.progress.push((written, total))
            }
            PipelineEvent::IdentifierStarted { bvid, .. } => {
                self.events.push(format!("start {}", bvid))
            }
            PipelineEvent::Converted(_) => self.events.push("converted".into()),
            PipelineEvent::RawRemoved(_) => self.events.push("removed".into()),
            PipelineEvent::EncoderLine(line) => self.events.push(format!("line {}", line)),
            _ => {}
        }
    }
}

fn context(extra_args: &[&str]) -> DownloadJobContext {
    let mut argv = vec!["bili-audio-dl", "--url", "unused"];
    argv.extend_from_slice(extra_args);
    let config = Arc::new(AppConfig::default());
    DownloadJobContext {
        http_client: Arc::new(RobustClient::new(config.clone()).unwrap()),
        config,
        args: Arc::new(Cli::parse_from(argv)),
    }
}

fn job(server: &ServerGuard, transcoder: Arc<CopyTranscoder>, extra_args: &[&str]) -> AudioJob {
    AudioJob::with_components(
        context(extra_args),
        Arc::new(FakeResolver::new(server)),
        transcoder,
    )
}

async fn media_mock(server: &mut Server, hits: usize) -> mockito::Mock {
    server
        .mock("GET", Matcher::Regex(r"^/media/\d+\.m4s$".into()))
        .with_status(200)
        .with_body(vec![7u8; 10_000])
        .expect(hits)
        .create_async()
        .await
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_single_part_video_leaves_only_converted_file() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let transcoder = Arc::new(CopyTranscoder::default());
    let dir = tempdir().unwrap();
    let mut observer = RecordingObserver::default();

    let report = job(&server, transcoder.clone(), &[])
        .run_text(
            &format!("https://www.bilibili.com/video/{}?p=1", SINGLE),
            dir.path(),
            &mut observer,
        )
        .await
        .unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.outcomes[0].status, IdentifierStatus::Completed);
    assert_eq!(report.outcomes[0].parts[0].file_name, "单曲 Live.mp4");
    assert_eq!(file_names(dir.path()), vec!["单曲 Live.mp3"]);
    assert_eq!(transcoder.calls.lock().unwrap().len(), 1);
    assert_eq!(observer.progress.last().map(|p| p.0), Some(10_000));
    assert_eq!(
        observer.events,
        vec![
            format!("start {}", SINGLE),
            "line size=     100kB time=00:00:03.00".to_string(),
            "converted".to_string(),
            "removed".to_string(),
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multi_part_names_include_part_title() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 2).await;
    let dir = tempdir().unwrap();

    let report = job(&server, Arc::new(CopyTranscoder::default()), &[])
        .run_text(MULTI, dir.path(), &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].parts.len(), 2);
    assert_eq!(file_names(dir.path()), vec!["合集-序章.mp3", "合集-终章.mp3"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_second_run_skips_converted_parts() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let transcoder = Arc::new(CopyTranscoder::default());
    let dir = tempdir().unwrap();
    let job = job(&server, transcoder.clone(), &[]);

    job.run_text(SINGLE, dir.path(), &mut NullObserver).await.unwrap();
    let report = job.run_text(SINGLE, dir.path(), &mut NullObserver).await.unwrap();

    assert_eq!(report.outcomes[0].status, IdentifierStatus::Skipped);
    assert_eq!(report.outcomes[0].parts[0].status, PartStatus::SkippedConverted);
    assert_eq!(transcoder.calls.lock().unwrap().len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_duplicate_identifiers_produce_one_artifact() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let dir = tempdir().unwrap();

    let report = job(&server, Arc::new(CopyTranscoder::default()), &[])
        .run_text(&format!("{} {}", SINGLE, SINGLE), dir.path(), &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[1].status, IdentifierStatus::Skipped);
    assert_eq!(file_names(dir.path()), vec!["单曲 Live.mp3"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_existing_raw_file_is_skipped_without_conversion() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 0).await;
    let transcoder = Arc::new(CopyTranscoder::default());
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("单曲 Live.mp4"), b"leftover").unwrap();

    let report = job(&server, transcoder.clone(), &[])
        .run_text(SINGLE, dir.path(), &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].parts[0].status, PartStatus::SkippedRawExists);
    assert!(transcoder.calls.lock().unwrap().is_empty());
    assert_eq!(file_names(dir.path()), vec!["单曲 Live.mp4"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_force_redownload_replaces_raw_file() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("单曲 Live.mp4"), b"leftover").unwrap();

    let report = job(&server, Arc::new(CopyTranscoder::default()), &["--force-redownload"])
        .run_text(SINGLE, dir.path(), &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].parts[0].status, PartStatus::Converted);
    assert_eq!(file_names(dir.path()), vec!["单曲 Live.mp3"]);
    assert_eq!(fs::read(dir.path().join("单曲 Live.mp3")).unwrap().len(), 10_000);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_failure_stops_remaining_identifiers() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 0).await;
    let dir = tempdir().unwrap();

    let report = job(&server, Arc::new(CopyTranscoder::default()), &[])
        .run_text(&format!("{} {}", SILENT, SINGLE), dir.path(), &mut NullObserver)
        .await
        .unwrap();

    let failed = &report.outcomes[0];
    assert_eq!(failed.status, IdentifierStatus::Failed);
    assert_eq!(failed.parts[0].status, PartStatus::NoAudioTrack);
    assert_eq!(failed.failure.as_ref().map(|f| f.0), Some(PipelineStage::Resolution));
    assert_eq!(report.outcomes[1].status, IdentifierStatus::NotAttempted);
    assert!(!report.all_succeeded());
    assert!(file_names(dir.path()).is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_keep_going_processes_remaining_identifiers() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let dir = tempdir().unwrap();

    let report = job(&server, Arc::new(CopyTranscoder::default()), &["--keep-going"])
        .run_text(&format!("{} {}", SILENT, SINGLE), dir.path(), &mut NullObserver)
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].status, IdentifierStatus::Failed);
    assert_eq!(report.outcomes[1].status, IdentifierStatus::Completed);
    assert_eq!(report.first_failure().map(|o| o.bvid.as_str()), Some(SILENT));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_conversion_failure_keeps_raw_file() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let dir = tempdir().unwrap();
    let transcoder = Arc::new(CopyTranscoder {
        fail: true,
        ..CopyTranscoder::default()
    });

    let report = job(&server, transcoder, &[])
        .run_text(MULTI, dir.path(), &mut NullObserver)
        .await
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, IdentifierStatus::Failed);
    // 第一个分P失败后不再处理第二个
    assert_eq!(outcome.parts.len(), 1);
    assert_eq!(outcome.parts[0].status, PartStatus::ConversionFailed);
    assert!(
        outcome.parts[0]
            .message
            .as_deref()
            .is_some_and(|m| m.contains("Invalid data found"))
    );
    assert_eq!(file_names(dir.path()), vec!["合集-序章.mp4"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_text_without_identifier_is_an_error() {
    let server = Server::new_async().await;
    let dir = tempdir().unwrap();

    let result = job(&server, Arc::new(CopyTranscoder::default()), &[])
        .run_text("https://www.bilibili.com/", dir.path(), &mut NullObserver)
        .await;

    assert!(matches!(result, Err(AppError::NoIdentifiers)));
}

#[tokio::test]
async fn test_unknown_video_fails_at_resolution() {
    let server = Server::new_async().await;
    let dir = tempdir().unwrap();
    let bvid = Bvid::parse("BV1zz411c7zz").unwrap();

    let outcome = job(&server, Arc::new(CopyTranscoder::default()), &[])
        .run_identifier(&bvid, dir.path(), &mut NullObserver)
        .await;

    assert_eq!(outcome.status, IdentifierStatus::Failed);
    assert!(outcome.parts.is_empty());
    assert_eq!(outcome.title, None);
}

#[tokio::test]
async fn test_cleanup_failure_stops_identifier_and_batch() {
    let mut server = Server::new_async().await;
    let mock = media_mock(&mut server, 1).await;
    let dir = tempdir().unwrap();
    let transcoder = Arc::new(CopyTranscoder {
        remove_input: true,
        ..CopyTranscoder::default()
    });

    let report = job(&server, transcoder, &[])
        .run_text(&format!("{} {}", SINGLE, MULTI), dir.path(), &mut NullObserver)
        .await
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, IdentifierStatus::Failed);
    assert_eq!(outcome.failure.as_ref().map(|f| f.0), Some(PipelineStage::Cleanup));
    assert_eq!(outcome.parts.len(), 1);
    assert_eq!(outcome.parts[0].status, PartStatus::CleanupFailed);
    assert_eq!(report.outcomes[1].status, IdentifierStatus::NotAttempted);
    // 转换结果保留
    assert_eq!(file_names(dir.path()), vec!["单曲 Live.mp3"]);
    mock.assert_async().await;
}
