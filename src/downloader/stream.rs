// src/downloader/stream.rs

use crate::{
    client::RobustClient,
    constants,
    error::*,
    models::{DownloadOutcome, StreamDescriptor},
};
use futures::StreamExt;
use log::{debug, error, info};
use reqwest::{StatusCode, header};
use std::{
    fs,
    io::Write,
    path::Path,
    sync::Arc,
    time::Instant,
};

/// 下载进度回调: (已写入字节数, 总字节数；未知时为 0)
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + Send + 'a;

/// 将音频流写入目标路径。写入过程中使用同目录下的临时文件，
/// 只有完整写完才会出现在目标路径上。
pub struct StreamDownloader {
    http_client: Arc<RobustClient>,
}

impl StreamDownloader {
    pub fn new(http_client: Arc<RobustClient>) -> Self {
        Self { http_client }
    }

    pub async fn download(
        &self,
        descriptor: &StreamDescriptor,
        destination: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> AppResult<DownloadOutcome> {
        if destination.exists() {
            info!("文件已存在，跳过下载: {}", destination.display());
            return Ok(DownloadOutcome::AlreadyPresent(destination.to_path_buf()));
        }

        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let started = Instant::now();
        let result = self.fetch_into(descriptor, destination, dir, progress).await;
        match result {
            Ok(bytes) => {
                let elapsed = started.elapsed();
                info!(
                    "下载完成: {} ({} 字节, 用时 {:.2?})",
                    destination.display(),
                    bytes,
                    elapsed
                );
                Ok(DownloadOutcome::Downloaded {
                    path: destination.to_path_buf(),
                    bytes,
                    elapsed,
                })
            }
            Err(e) => {
                error!("下载 '{}' 失败: {}", destination.display(), e);
                Err(e)
            }
        }
    }

    async fn fetch_into(
        &self,
        descriptor: &StreamDescriptor,
        destination: &Path,
        dir: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> AppResult<u64> {
        let failed = |status: Option<StatusCode>, source: TransferFault| AppError::Download {
            path: destination.to_path_buf(),
            status,
            source,
        };

        let res = self
            .http_client
            .get_stream(descriptor.url.as_str())
            .await
            .map_err(|e| failed(e.status(), e.into()))?;
        let status = res.status();
        let res = res
            .error_for_status()
            .map_err(|e| failed(Some(status), e.into()))?;

        // 不依赖 reqwest 的解压后长度，直接读取响应头
        let total = res
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        debug!("开始接收音频流: HTTP {}, 总长度 {}", status, total);

        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(constants::PART_FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| failed(Some(status), e.into()))?;

        let mut written: u64 = 0;
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(Some(status), e.into()))?;
            for piece in chunk.chunks(constants::DOWNLOAD_CHUNK_SIZE) {
                temp.write_all(piece)
                    .map_err(|e| failed(Some(status), e.into()))?;
                written += piece.len() as u64;
                progress(written, total);
            }
        }
        temp.flush().map_err(|e| failed(Some(status), e.into()))?;

        // 临时文件在出错返回时随 drop 自动删除
        temp.persist(destination)
            .map_err(|e| failed(Some(status), e.error.into()))?;
        Ok(written)
    }
}
