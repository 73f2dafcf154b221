// src/client.rs

use crate::{config::AppConfig, constants, error::*};
use anyhow::anyhow;
use log::{debug, trace};
use reqwest::{
    IntoUrl, Response,
    header::{self, HeaderMap, HeaderValue},
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// 接口请求带指数退避重试；媒体流请求不重试 (断开的流无法续传)
#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    media_client: reqwest::Client,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        Self::with_session(config, None)
    }

    pub fn with_session(config: Arc<AppConfig>, sessdata: Option<&str>) -> AppResult<Self> {
        let headers = default_headers(sessdata)?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let api_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        let client = ClientBuilder::new(api_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        // 下载可能持续很久，只限制连接超时
        let media_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            media_client,
        })
    }

    pub async fn get<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let res = self.client.get(url).send().await?;
        Ok(res.error_for_status()?)
    }

    /// 请求并解析 JSON；解析失败时附带请求地址
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: url::Url) -> AppResult<T> {
        debug!("GET {}", redact_query(&url));
        let body = self.get(url.clone()).await?.text().await?;
        trace!("响应内容: {}", body);
        serde_json::from_str(&body).map_err(|source| AppError::ApiParseFailed {
            url: redact_query(&url),
            source,
        })
    }

    /// 发起媒体流请求，不检查状态码，交由调用方处理
    pub async fn get_stream<T: IntoUrl>(&self, url: T) -> reqwest::Result<Response> {
        self.media_client.get(url).send().await
    }
}

fn default_headers(sessdata: Option<&str>) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::REFERER, HeaderValue::from_static(constants::REFERER));
    if let Some(value) = sessdata.filter(|v| !v.is_empty()) {
        let cookie = HeaderValue::from_str(&format!("SESSDATA={}", value))
            .map_err(|e| AppError::Other(anyhow!("SESSDATA 含有非法字符: {}", e)))?;
        headers.insert(header::COOKIE, cookie);
    }
    Ok(headers)
}

/// 日志中隐藏签名参数
fn redact_query(url: &url::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
