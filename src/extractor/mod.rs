// src/extractor/mod.rs

pub mod bilibili;
pub mod bvid;
mod utils;
pub mod wbi;

pub use bilibili::BilibiliResolver;
pub use bvid::{Bvid, extract_identifiers};
pub use utils::select_audio_stream;
pub use wbi::{ParamSigner, WbiKeys, WbiSigner};

use crate::{
    error::*,
    models::{MediaPart, StreamDescriptor, VideoInfo},
};
use async_trait::async_trait;

/// 将 BV 号解析为分P列表，并为每个分P取得可下载的音频流
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn fetch_video_info(&self, bvid: &Bvid) -> AppResult<VideoInfo>;

    async fn resolve(
        &self,
        bvid: &Bvid,
        part: &MediaPart,
        quality: u32,
    ) -> AppResult<StreamDescriptor>;
}
