//! Display helpers for document listings.

use chrono::{DateTime, Utc};

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Human-readable byte count: `512 B`, `2 KB`, `1.50 MB`, `3.25 GB`.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < MIB {
        format!("{:.0} KB", b / KIB)
    } else if b < GIB {
        format!("{:.2} MB", b / MIB)
    } else {
        format!("{:.2} GB", b / GIB)
    }
}

/// Emoji for a file name, chosen by its lowercased extension.
#[must_use]
pub fn file_icon(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "📎",
    };

    match ext.as_str() {
        "pdf" | "xml" | "json" => "📄",
        "doc" | "docx" | "csv" => "📋",
        "xls" | "xlsx" | "xlsm" | "xlsb" => "📊",
        "ppt" | "pptx" => "📽️",
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "tif" | "tiff" => "🖼️",
        "zip" | "rar" | "7z" | "tar" | "gz" => "📦",
        "txt" => "📝",
        "mp3" | "wav" => "🎵",
        "mp4" | "avi" | "mov" => "🎬",
        "exe" => "⚙️",
        "dmg" => "💿",
        "psd" | "ai" | "css" => "🎨",
        "indd" => "📰",
        "html" | "htm" => "🌐",
        "js" => "📜",
        "py" => "🐍",
        "java" => "☕",
        "c" | "cpp" => "🔧",
        _ => "📎",
    }
}

#[must_use]
pub fn display_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Splits a comma-separated tag string, dropping blanks.
#[must_use]
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
