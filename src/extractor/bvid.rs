// src/extractor/bvid.rs

use crate::error::{AppError, AppResult};
use regex::Regex;
use std::{fmt, str::FromStr, sync::LazyLock};

static BVID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"BV[a-zA-Z0-9]{10}").unwrap());
static BVID_EXACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BV[a-zA-Z0-9]{10}$").unwrap());

/// 视频的 BV 号：固定前缀 `BV` 加 10 位字母数字
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bvid(String);

impl Bvid {
    pub fn parse(text: &str) -> AppResult<Self> {
        let text = text.trim();
        if is_bvid(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(AppError::InvalidIdentifier(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bvid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Bvid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Bvid {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn is_bvid(text: &str) -> bool {
    BVID_EXACT_RE.is_match(text)
}

/// 按出现顺序提取文本中所有不重叠的 BV 号，保留重复项。
/// 没有匹配时返回空列表，由调用方自行判断。
pub fn extract_identifiers(text: &str) -> Vec<Bvid> {
    BVID_RE
        .find_iter(text)
        .map(|m| Bvid(m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(text: &str) -> Vec<String> {
        extract_identifiers(text)
            .into_iter()
            .map(|b| b.to_string())
            .collect()
    }

    #[test]
    fn test_extract_keeps_order_and_duplicates() {
        assert_eq!(
            ids("watch BV166YizqEjc now, BV166YizqEjc again"),
            vec!["BV166YizqEjc", "BV166YizqEjc"]
        );
        assert_eq!(
            ids("BV1xx411c7mD then BV166YizqEjc"),
            vec!["BV1xx411c7mD", "BV166YizqEjc"]
        );
    }

    #[test]
    fn test_extract_from_page_url() {
        assert_eq!(
            ids("https://www.bilibili.com/video/BV166YizqEjc/?spm_id_from=333.1007&p=2"),
            vec!["BV166YizqEjc"]
        );
    }

    #[test]
    fn test_extract_empty_and_invalid_input() {
        assert!(ids("").is_empty());
        assert!(ids("no identifiers here").is_empty());
        // 少于 10 位
        assert!(ids("BV166Yizq").is_empty());
        // 小写前缀不匹配
        assert!(ids("bv166YizqEjc").is_empty());
    }

    #[test]
    fn test_extract_does_not_overlap() {
        // 22 个字符只能产生一个匹配，剩余部分不足 12 位
        assert_eq!(ids("BV166YizqEjcBV166Yizq"), vec!["BV166YizqEjc"]);
        assert_eq!(
            ids("BV166YizqEjcBV166YizqEjc"),
            vec!["BV166YizqEjc", "BV166YizqEjc"]
        );
    }

    #[test]
    fn test_parse_exact() {
        assert_eq!(Bvid::parse(" BV166YizqEjc ").unwrap().as_str(), "BV166YizqEjc");
        assert!(Bvid::parse("BV166YizqEjc1").is_err());
        assert!(matches!(
            "av170001".parse::<Bvid>(),
            Err(AppError::InvalidIdentifier(_))
        ));
    }
}
