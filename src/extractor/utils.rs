// src/extractor/utils.rs

use crate::models::{StreamDescriptor, api::DashAudio};
use itertools::Itertools;
use log::{debug, warn};

/// 优先选择与期望音质 ID 一致的音轨，否则退回接口返回的第一条。
/// 列表为空时返回 None。
pub fn select_audio_stream(tracks: &[DashAudio], preferred: u32) -> Option<StreamDescriptor> {
    debug!(
        "可用音轨: [{}]",
        tracks.iter().map(|t| t.id).join(", ")
    );
    let track = match tracks.iter().find(|t| t.id == preferred) {
        Some(track) => track,
        None => {
            let fallback = tracks.first()?;
            warn!(
                "未找到音质 {} 的音轨，改用第一条音轨 (音质 {})",
                preferred, fallback.id
            );
            fallback
        }
    };
    Some(StreamDescriptor {
        quality: track.id,
        url: track.base_url.clone(),
    })
}
