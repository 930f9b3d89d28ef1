//! Everything search syntax builders
//!
//! Each tool maps its arguments onto one Everything query string.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Query listing every drive root
pub const DRIVES_QUERY: &str = "root:";

/// Which timestamp a date search filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    #[default]
    Modified,
    Created,
}

impl DateKind {
    fn prefix(self) -> &'static str {
        match self {
            DateKind::Modified => "dm:",
            DateKind::Created => "dc:",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateKind::Modified => "modified",
            DateKind::Created => "created",
        }
    }
}

/// Empty files or empty folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmptyKind {
    #[default]
    File,
    Folder,
}

/// Broad content categories mapped to extension lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Executable,
}

impl ContentType {
    pub fn extension_filter(self) -> &'static str {
        match self {
            ContentType::Image => "ext:jpg;jpeg;png;gif;bmp;webp;svg;ico",
            ContentType::Video => "ext:mp4;avi;mkv;mov;wmv;flv;webm;m4v",
            ContentType::Audio => "ext:mp3;wav;flac;aac;ogg;wma;m4a",
            ContentType::Document => "ext:doc;docx;pdf;txt;rtf;odt;xls;xlsx;ppt;pptx",
            ContentType::Archive => "ext:zip;rar;7z;tar;gz;bz2;xz",
            ContentType::Executable => "ext:exe;msi;bat;cmd;sh;app;dmg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Document => "document",
            ContentType::Archive => "archive",
            ContentType::Executable => "executable",
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn with_keywords(base: String, keywords: Option<&str>) -> String {
    match non_empty(keywords) {
        Some(q) => format!("{} {}", base, q),
        None => base,
    }
}

fn with_path(base: String, path: Option<&str>) -> String {
    match non_empty(path) {
        Some(p) => format!("{} path:\"{}\"", base, p),
        None => base,
    }
}

/// Strip a leading dot from an extension
pub fn normalize_extension(extension: &str) -> &str {
    extension.trim().trim_start_matches('.')
}

pub fn extension_query(extension: &str) -> String {
    format!("ext:{}", normalize_extension(extension))
}

pub fn path_query(path: &str, keywords: Option<&str>) -> String {
    with_keywords(path.to_string(), keywords)
}

/// `None` when neither bound nor keywords are given
pub fn size_query(min: Option<&str>, max: Option<&str>, keywords: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(min) = non_empty(min) {
        parts.push(format!("size:>{}", min));
    }
    if let Some(max) = non_empty(max) {
        parts.push(format!("size:<{}", max));
    }
    if let Some(q) = non_empty(keywords) {
        parts.push(q.to_string());
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// `None` when neither date bound is given
pub fn date_query(
    kind: DateKind,
    from: Option<&str>,
    to: Option<&str>,
    keywords: Option<&str>,
) -> Option<String> {
    let prefix = kind.prefix();
    let base = match (non_empty(from), non_empty(to)) {
        (Some(from), Some(to)) => format!("{}{}..{}", prefix, from, to),
        (Some(from), None) => format!("{}>{}", prefix, from),
        (None, Some(to)) => format!("{}<{}", prefix, to),
        (None, None) => return None,
    };
    Some(with_keywords(base, keywords))
}

pub fn recent_query(days: u32, keywords: Option<&str>) -> String {
    with_keywords(format!("dm:last{}days", days), keywords)
}

pub fn large_files_query(min_size: &str, path: Option<&str>) -> String {
    with_path(format!("size:>{}", min_size), path)
}

pub fn empty_query(kind: EmptyKind, path: Option<&str>) -> String {
    let base = match kind {
        EmptyKind::File => "file: size:0",
        EmptyKind::Folder => "folder: empty:",
    };
    with_path(base.to_string(), path)
}

pub fn content_type_query(content_type: ContentType, keywords: Option<&str>) -> String {
    with_keywords(content_type.extension_filter().to_string(), keywords)
}

pub fn regex_query(regex: &str, path: Option<&str>) -> String {
    with_path(format!("regex:{}", regex), path)
}

pub fn duplicate_name_query(filename: &str) -> String {
    format!("file:{}", filename)
}

/// Normalize a directory path to end with a backslash and build the
/// `parent:` query listing its direct children.
pub fn directory_query(path: &str) -> (String, String) {
    let mut dir = path.trim().to_string();
    if !dir.ends_with('\\') && !dir.ends_with('/') {
        dir.push('\\');
    }
    let query = format!("parent:\"{}\"", dir.trim_end_matches('\\'));
    (dir, query)
}

pub fn file_info_query(path: &str) -> String {
    format!("\"{}\"", path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_query_strips_dot() {
        assert_eq!(extension_query(".pdf"), "ext:pdf");
        assert_eq!(extension_query("txt"), "ext:txt");
    }

    #[test]
    fn test_size_query_combinations() {
        assert_eq!(size_query(Some("1MB"), None, None).unwrap(), "size:>1MB");
        assert_eq!(
            size_query(Some("1MB"), Some("1GB"), Some("iso")).unwrap(),
            "size:>1MB size:<1GB iso"
        );
        assert!(size_query(None, Some(""), None).is_none());
    }

    #[test]
    fn test_date_query_ranges() {
        assert_eq!(
            date_query(DateKind::Modified, Some("2024-01-01"), Some("2024-12-31"), None).unwrap(),
            "dm:2024-01-01..2024-12-31"
        );
        assert_eq!(
            date_query(DateKind::Created, None, Some("2024-06-01"), Some("report")).unwrap(),
            "dc:<2024-06-01 report"
        );
        assert!(date_query(DateKind::Modified, None, None, Some("x")).is_none());
    }

    #[test]
    fn test_recent_and_large_queries() {
        assert_eq!(recent_query(7, None), "dm:last7days");
        assert_eq!(
            large_files_query("100MB", Some("D:\\Videos")),
            "size:>100MB path:\"D:\\Videos\""
        );
    }

    #[test]
    fn test_empty_queries() {
        assert_eq!(empty_query(EmptyKind::File, None), "file: size:0");
        assert_eq!(empty_query(EmptyKind::Folder, Some("C:\\tmp")), "folder: empty: path:\"C:\\tmp\"");
    }

    #[test]
    fn test_content_type_query() {
        assert_eq!(
            content_type_query(ContentType::Archive, Some("backup")),
            "ext:zip;rar;7z;tar;gz;bz2;xz backup"
        );
    }

    #[test]
    fn test_directory_query_normalizes_path() {
        let (dir, query) = directory_query("C:\\Users");
        assert_eq!(dir, "C:\\Users\\");
        assert_eq!(query, "parent:\"C:\\Users\"");

        let (dir, _) = directory_query("D:\\");
        assert_eq!(dir, "D:\\");
    }
}
