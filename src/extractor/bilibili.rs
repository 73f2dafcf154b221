// src/extractor/bilibili.rs

use super::{Bvid, ParamSigner, StreamResolver, select_audio_stream};
use crate::{
    client::RobustClient,
    config::EndpointConfig,
    constants,
    error::*,
    models::{
        MediaPart, StreamDescriptor, VideoInfo,
        api::{ApiResponse, PlayUrlData, ViewData},
    },
};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use url::Url;

pub struct BilibiliResolver {
    http_client: Arc<RobustClient>,
    signer: Arc<dyn ParamSigner>,
    endpoints: EndpointConfig,
}

impl BilibiliResolver {
    pub fn new(
        http_client: Arc<RobustClient>,
        signer: Arc<dyn ParamSigner>,
        endpoints: EndpointConfig,
    ) -> Self {
        Self {
            http_client,
            signer,
            endpoints,
        }
    }

    fn view_url(&self, bvid: &Bvid) -> AppResult<Url> {
        Ok(Url::parse_with_params(
            &self.endpoints.view_url,
            &[("bvid", bvid.as_str())],
        )?)
    }

    async fn play_url(&self, bvid: &Bvid, cid: u64) -> AppResult<Url> {
        let params = vec![
            ("fnval".to_string(), constants::api::FNVAL_DASH.to_string()),
            ("bvid".to_string(), bvid.to_string()),
            ("cid".to_string(), cid.to_string()),
        ];
        let signed = self.signer.sign(params).await?;
        Ok(Url::parse_with_params(&self.endpoints.play_url, &signed)?)
    }
}

#[async_trait]
impl StreamResolver for BilibiliResolver {
    async fn fetch_video_info(&self, bvid: &Bvid) -> AppResult<VideoInfo> {
        info!("正在获取视频信息: {}", bvid);
        let res: ApiResponse<ViewData> = self.http_client.fetch_json(self.view_url(bvid)?).await?;
        let data = match res.data {
            Some(data) if res.code == 0 => data,
            _ => {
                error!("获取 {} 的视频信息失败: code={}, message={}", bvid, res.code, res.message);
                return Err(AppError::Api {
                    code: res.code,
                    message: res.message,
                });
            }
        };

        if data.pages.is_empty() {
            return Err(AppError::NoParts {
                bvid: bvid.to_string(),
            });
        }

        let parts: Vec<MediaPart> = data
            .pages
            .into_iter()
            .map(|p| MediaPart {
                cid: p.cid,
                title: p.part,
                page: p.page,
            })
            .collect();
        debug!("视频 '{}' 共 {} 个分P", data.title, parts.len());

        Ok(VideoInfo {
            bvid: bvid.clone(),
            title: data.title,
            parts,
        })
    }

    async fn resolve(
        &self,
        bvid: &Bvid,
        part: &MediaPart,
        quality: u32,
    ) -> AppResult<StreamDescriptor> {
        debug!("正在解析 {} P{} (cid: {}) 的音频流", bvid, part.page, part.cid);
        let url = self.play_url(bvid, part.cid).await?;
        let res: ApiResponse<PlayUrlData> = self.http_client.fetch_json(url).await?;

        let Some(data) = res.data else {
            warn!(
                "{} (cid: {}) 的 data 字段无效: code={}, message={}",
                bvid, part.cid, res.code, res.message
            );
            return Err(AppError::NoData {
                bvid: bvid.to_string(),
                cid: part.cid,
            });
        };

        let tracks = data.dash.and_then(|d| d.audio).unwrap_or_default();
        let descriptor = select_audio_stream(&tracks, quality).ok_or_else(|| {
            warn!("{} (cid: {}) 的 audio 字段为空", bvid, part.cid);
            AppError::NoAudioTrack {
                bvid: bvid.to_string(),
                cid: part.cid,
            }
        })?;
        info!(
            "{} P{} 使用音质 {} 的音轨",
            bvid, part.page, descriptor.quality
        );
        Ok(descriptor)
    }
}
