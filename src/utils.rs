// src/utils.rs

use crate::constants;
use regex::Regex;
use std::{ffi::OsStr, path::Path, sync::LazyLock};

static ILLEGAL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|\x00-\x1f]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

pub fn sanitize_filename(name: &str) -> String {
    let original_name = name.trim();
    if original_name.is_empty() {
        return "unknown".to_string();
    }

    let stem = Path::new(original_name)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(original_name))
        .to_string_lossy()
        .to_uppercase();
    let mut name = if WINDOWS_RESERVED.contains(&stem.as_ref()) {
        format!("_{}", original_name)
    } else {
        original_name.to_string()
    };

    name = ILLEGAL_CHARS_RE.replace_all(&name, " ").into_owned();
    name = WHITESPACE_RE.replace_all(&name, " ").trim().to_string();
    name = name
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();
    if name.is_empty() {
        return "unnamed".to_string();
    }

    if name.len() > constants::MAX_FILENAME_BYTES {
        name = truncate_keep_extension(&name, constants::MAX_FILENAME_BYTES);
    }
    name
}

// 超长时截断主干部分，扩展名保持不变
fn truncate_keep_extension(name: &str, max_bytes: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let ext = format!(".{}", ext.to_string_lossy());
            let stem = stem.to_string_lossy();
            let max_stem_bytes = max_bytes.saturating_sub(ext.len());
            format!("{}{}", safe_truncate_utf8(&stem, max_stem_bytes), ext)
        }
        _ => safe_truncate_utf8(name, max_bytes).to_string(),
    }
}

pub fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    &s[..i]
}

/// 原始媒体文件名：多P视频为 `标题-分P标题.mp4`，单P视频为 `标题.mp4`
pub fn raw_file_name(video_title: &str, part_title: Option<&str>) -> String {
    let name = match part_title {
        Some(part) => format!("{}-{}.{}", video_title, part, constants::RAW_EXTENSION),
        None => format!("{}.{}", video_title, constants::RAW_EXTENSION),
    };
    sanitize_filename(&name)
}

/// 去掉原始文件名的最后一个扩展名，换成目标格式的扩展名
pub fn converted_file_name(raw_name: &str, extension: &str) -> String {
    let stem = raw_name
        .rsplit_once('.')
        .map_or(raw_name, |(stem, _)| stem);
    sanitize_filename(&format!("{}.{}", stem, extension))
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let budget = max_width.saturating_sub(3);
    let mut width = 0;
    let mut cut_at = None;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > budget {
            cut_at = Some(i);
            break;
        }
    }
    match cut_at {
        // 整段文本不超过宽度时原样返回
        Some(_) if display_width(text) <= max_width => text.to_string(),
        Some(end) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}
