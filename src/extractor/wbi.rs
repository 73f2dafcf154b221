// src/extractor/wbi.rs

use crate::{
    client::RobustClient,
    error::{AppError, AppResult},
    models::api::{ApiResponse, NavData},
};
use anyhow::anyhow;
use async_trait::async_trait;
use log::{debug, info};
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex as TokioMutex;
use url::Url;

/// 为请求参数添加鉴权字段。对调用方而言是无副作用的纯函数。
#[async_trait]
pub trait ParamSigner: Send + Sync {
    async fn sign(&self, params: Vec<(String, String)>) -> AppResult<Vec<(String, String)>>;
}

const CACHE_EXPIRATION: Duration = Duration::from_secs(2 * 60 * 60);

const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

// 除 RFC 3986 非保留字符外全部编码
const WBI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WbiKeys {
    pub img_key: String,
    pub sub_key: String,
}

#[derive(Clone, Debug)]
struct CachedKeys {
    keys: WbiKeys,
    fetched_at: Instant,
}

/// 使用导航接口下发的 img_key / sub_key 进行 WBI 签名
pub struct WbiSigner {
    client: Arc<RobustClient>,
    nav_url: String,
    cache: TokioMutex<Option<CachedKeys>>,
}

impl WbiSigner {
    pub fn new(client: Arc<RobustClient>, nav_url: impl Into<String>) -> Self {
        Self {
            client,
            nav_url: nav_url.into(),
            cache: TokioMutex::new(None),
        }
    }

    /// 使用已知密钥，跳过导航接口请求
    pub fn with_keys(client: Arc<RobustClient>, nav_url: impl Into<String>, keys: WbiKeys) -> Self {
        Self {
            client,
            nav_url: nav_url.into(),
            cache: TokioMutex::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
        }
    }

    async fn keys(&self) -> AppResult<WbiKeys> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && cached.fetched_at.elapsed() < CACHE_EXPIRATION
        {
            return Ok(cached.keys.clone());
        }
        let keys = self.fetch_keys().await?;
        *cache = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    async fn fetch_keys(&self) -> AppResult<WbiKeys> {
        info!("正在获取 WBI 签名密钥");
        // 未登录时 code 为 -101，但 data.wbi_img 仍然存在
        let res: ApiResponse<NavData> = self.client.fetch_json(Url::parse(&self.nav_url)?).await?;
        let data = res.data.ok_or(AppError::Api {
            code: res.code,
            message: res.message,
        })?;
        let img_key = take_filename(&data.wbi_img.img_url)
            .ok_or_else(|| AppError::Other(anyhow!("无法解析 img_url: {}", data.wbi_img.img_url)))?;
        let sub_key = take_filename(&data.wbi_img.sub_url)
            .ok_or_else(|| AppError::Other(anyhow!("无法解析 sub_url: {}", data.wbi_img.sub_url)))?;
        debug!("WBI 密钥: img_key={}, sub_key={}", img_key, sub_key);
        Ok(WbiKeys { img_key, sub_key })
    }
}

#[async_trait]
impl ParamSigner for WbiSigner {
    async fn sign(&self, params: Vec<(String, String)>) -> AppResult<Vec<(String, String)>> {
        let keys = self.keys().await?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Other(anyhow!("系统时间早于 UNIX 纪元: {}", e)))?
            .as_secs();
        encode_wbi(params, &keys, timestamp)
    }
}

// 对 imgKey 和 subKey 进行字符顺序打乱编码
fn get_mixin_key(orig: &[u8]) -> Option<String> {
    MIXIN_KEY_ENC_TAB
        .iter()
        .take(32)
        .map(|&i| orig.get(i).map(|&b| b as char))
        .collect()
}

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, WBI_ENCODE_SET).to_string()
}

/// 追加 wts 并按键排序，返回带 w_rid 的完整参数列表
pub(crate) fn encode_wbi(
    mut params: Vec<(String, String)>,
    keys: &WbiKeys,
    timestamp: u64,
) -> AppResult<Vec<(String, String)>> {
    let mixin_key = get_mixin_key(format!("{}{}", keys.img_key, keys.sub_key).as_bytes())
        .ok_or_else(|| AppError::Other(anyhow!("WBI 密钥长度不足")))?;

    params.push(("wts".to_string(), timestamp.to_string()));
    params.sort_by(|a, b| a.0.cmp(&b.0));
    // 这些字符会被服务端过滤，签名前必须同样去掉
    for (_, value) in params.iter_mut() {
        value.retain(|c| !"!'()*".contains(c));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Md5::new();
    hasher.update(format!("{}{}", query, mixin_key));
    let w_rid = format!("{:x}", hasher.finalize());

    params.push(("w_rid".to_string(), w_rid));
    Ok(params)
}

fn take_filename(url: &str) -> Option<String> {
    url.rsplit_once('/')
        .and_then(|(_, s)| s.rsplit_once('.'))
        .map(|(s, _)| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_keys() -> WbiKeys {
        WbiKeys {
            img_key: "7cd084941338484aae1ad9425b84077c".into(),
            sub_key: "4932caff0ff746eab6f01bf08b70ac45".into(),
        }
    }

    #[test]
    fn test_take_filename() {
        assert_eq!(
            take_filename("https://i0.hdslb.com/bfs/wbi/7cd084941338484aae1ad9425b84077c.png"),
            Some("7cd084941338484aae1ad9425b84077c".to_string())
        );
        assert_eq!(take_filename("no-slash"), None);
    }

    #[test]
    fn test_get_mixin_key() {
        let keys = sample_keys();
        let concat = format!("{}{}", keys.img_key, keys.sub_key);
        assert_eq!(
            get_mixin_key(concat.as_bytes()).as_deref(),
            Some("ea1db124af3c7062474693fa704f4ff8")
        );
        assert_eq!(get_mixin_key(b"too short"), None);
    }

    #[test]
    fn test_encode_wbi_matches_reference_vector() {
        let params = vec![
            ("foo".to_string(), "114".to_string()),
            ("bar".to_string(), "514".to_string()),
            ("zab".to_string(), "1919810".to_string()),
        ];
        let signed = encode_wbi(params, &sample_keys(), 1702204169).unwrap();
        let keys: Vec<&str> = signed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["bar", "foo", "wts", "zab", "w_rid"]);
        assert_eq!(
            signed.last().unwrap(),
            &("w_rid".to_string(), "8f6f2b5b3d485fe1886cec6a0be8c5d4".to_string())
        );
    }

    #[test]
    fn test_encode_wbi_strips_filtered_characters() {
        let params = vec![("keyword".to_string(), "a(b)*c!".to_string())];
        let signed = encode_wbi(params, &sample_keys(), 1).unwrap();
        assert_eq!(signed[0], ("keyword".to_string(), "abc".to_string()));
    }
}
