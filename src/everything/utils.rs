//! Utility functions for rendering search results

use crate::everything::types::SearchResult;

/// Format file size for display (1024 base)
pub fn format_file_size(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, unit)
}

/// Drive roots look like `C:`
pub fn is_drive_path(path: &str) -> bool {
    path.len() <= 3 && path.ends_with(':')
}

/// ` (1.5 MB)` for known sizes, empty otherwise
pub fn size_suffix(result: &SearchResult) -> String {
    if result.size > 0 {
        format!(" ({})", format_file_size(result.size))
    } else {
        String::new()
    }
}

/// Numbered listing of at most `limit` results
pub fn render_results(header: &str, results: &[SearchResult], limit: usize, with_size: bool) -> String {
    let mut text = format!("{}\nFound {} results:\n\n", header, results.len());
    for (i, result) in results.iter().take(limit).enumerate() {
        let suffix = if with_size { size_suffix(result) } else { String::new() };
        text.push_str(&format!("{}. {}{}\n", i + 1, result.path, suffix));
    }
    text
}
