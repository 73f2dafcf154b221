// src/models/api.rs

use serde::Deserialize;

// --- 通用结构体 ---

/// B 站接口统一的外层结构
#[derive(Deserialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

// --- 视频信息 (view) API 响应结构体 ---

#[derive(Deserialize, Debug, Clone)]
pub struct ViewData {
    pub title: String,
    #[serde(default)]
    pub pages: Vec<ViewPage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ViewPage {
    pub cid: u64,
    pub page: u32,
    pub part: String,
}

// --- 播放地址 (playurl) API 响应结构体 ---

#[derive(Deserialize, Debug, Clone)]
pub struct PlayUrlData {
    pub dash: Option<Dash>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Dash {
    pub audio: Option<Vec<DashAudio>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DashAudio {
    pub id: u32,
    // 响应中同时带有 baseUrl 与 base_url，只读取前者
    #[serde(rename = "baseUrl")]
    pub base_url: String,
}

// --- 导航 (nav) API 响应结构体，用于获取 WBI 密钥 ---

#[derive(Deserialize, Debug, Clone)]
pub struct NavData {
    pub wbi_img: WbiImg,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WbiImg {
    pub img_url: String,
    pub sub_url: String,
}
