//! MCP Tool definitions and handlers
//!
//! Defines all available search tools and their implementations.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::error::ValidationError;
use crate::everything::client::Searcher;
use crate::everything::query::{self, ContentType, DateKind, EmptyKind};
use crate::everything::types::SearchResult;
use crate::everything::utils::{format_file_size, is_drive_path, render_results, size_suffix};
use crate::mcp::types::{CallToolResult, Tool};

/// Names of every tool, in listing order
pub const TOOL_NAMES: [&str; 14] = [
    "search_files",
    "search_by_extension",
    "search_by_path",
    "search_by_size",
    "search_by_date",
    "search_recent_files",
    "search_large_files",
    "search_empty_files",
    "search_by_content_type",
    "search_with_regex",
    "search_duplicate_names",
    "list_drives",
    "list_directory",
    "get_file_info",
];

/// Tool handler
pub struct ToolHandler {
    searcher: Arc<dyn Searcher>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(searcher: Arc<dyn Searcher>) -> Self {
        Self { searcher }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def::<SearchFilesArgs>("search_files", "Search files and folders by name, path, or extension"),
            tool_def::<ExtensionArgs>("search_by_extension", "Search files by extension, for example all .txt or .pdf files"),
            tool_def::<PathArgs>("search_by_path", "Search inside a path, optionally narrowed by keywords"),
            tool_def::<SizeArgs>("search_by_size", "Search files larger than, smaller than, or within a size range"),
            tool_def::<DateArgs>("search_by_date", "Search files modified or created within a date range"),
            tool_def::<RecentArgs>("search_recent_files", "Search recently modified files"),
            tool_def::<LargeFilesArgs>("search_large_files", "Find files taking up a lot of space"),
            tool_def::<EmptyArgs>("search_empty_files", "Find empty files or empty folders"),
            tool_def::<ContentTypeArgs>("search_by_content_type", "Search by content type: image, video, audio, document, archive, executable"),
            tool_def::<RegexArgs>("search_with_regex", "Search file names with a regular expression"),
            tool_def::<DuplicateArgs>("search_duplicate_names", "Find files sharing the same file name"),
            Tool {
                name: "list_drives".to_string(),
                description: Some("List all drives (C:, D:, ...)".to_string()),
                input_schema: json!({"type": "object", "properties": {}}),
            },
            tool_def::<DirectoryArgs>("list_directory", "List the files and folders of a directory"),
            tool_def::<FileInfoArgs>("get_file_info", "Show size, date, and type of a file or folder"),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        match name {
            "search_files" => self.handle_search_files(args).await,
            "search_by_extension" => self.handle_search_by_extension(args).await,
            "search_by_path" => self.handle_search_by_path(args).await,
            "search_by_size" => self.handle_search_by_size(args).await,
            "search_by_date" => self.handle_search_by_date(args).await,
            "search_recent_files" => self.handle_search_recent(args).await,
            "search_large_files" => self.handle_search_large(args).await,
            "search_empty_files" => self.handle_search_empty(args).await,
            "search_by_content_type" => self.handle_search_by_content_type(args).await,
            "search_with_regex" => self.handle_search_with_regex(args).await,
            "search_duplicate_names" => self.handle_search_duplicates(args).await,
            "list_drives" => self.handle_list_drives().await,
            "list_directory" => self.handle_list_directory(args).await,
            "get_file_info" => self.handle_get_file_info(args).await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, CallToolResult> {
        self.searcher
            .search(query, max_results)
            .await
            .map_err(|e| CallToolResult::error(format!("Search failed: {}", e)))
    }

    // ==================== Tool Handlers ====================

    async fn handle_search_files(&self, args: Value) -> CallToolResult {
        let args: SearchFilesArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        match self.search(&args.query, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Search query: {}", args.query),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_by_extension(&self, args: Value) -> CallToolResult {
        let args: ExtensionArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let extension = query::normalize_extension(&args.extension);
        if extension.is_empty() {
            return CallToolResult::error(
                ValidationError::MissingField {
                    field: "extension".to_string(),
                }
                .to_string(),
            );
        }

        match self.search(&query::extension_query(extension), args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Extension search: .{}", extension),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_by_path(&self, args: Value) -> CallToolResult {
        let args: PathArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::path_query(&args.path, args.query.as_deref());
        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Path search: {}", args.path),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_by_size(&self, args: Value) -> CallToolResult {
        let args: SizeArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let Some(search) = query::size_query(
            args.size_min.as_deref(),
            args.size_max.as_deref(),
            args.query.as_deref(),
        ) else {
            return CallToolResult::error(
                ValidationError::MissingField {
                    field: "size_min or size_max".to_string(),
                }
                .to_string(),
            );
        };

        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Size search: {}", search),
                &results,
                args.max_results as usize,
                true,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_by_date(&self, args: Value) -> CallToolResult {
        let args: DateArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let Some(search) = query::date_query(
            args.date_type,
            args.date_from.as_deref(),
            args.date_to.as_deref(),
            args.query.as_deref(),
        ) else {
            return CallToolResult::error(
                ValidationError::MissingField {
                    field: "date_from or date_to".to_string(),
                }
                .to_string(),
            );
        };

        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Date search ({}): {}", args.date_type.as_str(), search),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_recent(&self, args: Value) -> CallToolResult {
        let args: RecentArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::recent_query(args.days, args.query.as_deref());
        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Files modified in the last {} days", args.days),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_large(&self, args: Value) -> CallToolResult {
        let args: LargeFilesArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::large_files_query(&args.min_size, args.path.as_deref());
        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Large files (>{})", args.min_size),
                &results,
                args.max_results as usize,
                true,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_empty(&self, args: Value) -> CallToolResult {
        let args: EmptyArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::empty_query(args.kind, args.path.as_deref());
        let header = match args.kind {
            EmptyKind::File => "Empty files",
            EmptyKind::Folder => "Empty folders",
        };
        match self.search(&search, args.max_results).await {
            Ok(results) => {
                CallToolResult::text(render_results(header, &results, args.max_results as usize, false))
            }
            Err(e) => e,
        }
    }

    async fn handle_search_by_content_type(&self, args: Value) -> CallToolResult {
        let args: ContentTypeArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::content_type_query(args.content_type, args.query.as_deref());
        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Content type search: {}", args.content_type.as_str()),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_with_regex(&self, args: Value) -> CallToolResult {
        let args: RegexArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::regex_query(&args.regex, args.path.as_deref());
        match self.search(&search, args.max_results).await {
            Ok(results) => CallToolResult::text(render_results(
                &format!("Regex search: {}", args.regex),
                &results,
                args.max_results as usize,
                false,
            )),
            Err(e) => e,
        }
    }

    async fn handle_search_duplicates(&self, args: Value) -> CallToolResult {
        let args: DuplicateArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let search = query::duplicate_name_query(&args.filename);
        match self.search(&search, args.max_results).await {
            Ok(results) => {
                let mut text = render_results(
                    &format!("Duplicate name search: {}", args.filename),
                    &results,
                    args.max_results as usize,
                    false,
                );
                if results.len() > 1 {
                    text.push_str(&format!("\nFound {} files with the same name.\n", results.len()));
                }
                CallToolResult::text(text)
            }
            Err(e) => e,
        }
    }

    async fn handle_list_drives(&self) -> CallToolResult {
        let results = match self.search(query::DRIVES_QUERY, 100).await {
            Ok(r) => r,
            Err(e) => return e,
        };

        let drives: Vec<&SearchResult> = results.iter().filter(|r| is_drive_path(&r.path)).collect();

        let mut text = format!("Drives\nFound {} drives:\n\n", drives.len());
        for (i, drive) in drives.iter().enumerate() {
            text.push_str(&format!("{}. {}\\\n", i + 1, drive.path));
        }
        if drives.is_empty() {
            text.push_str("Hint: use list_directory to browse a drive directly, for example C:\\ or D:\\\n");
        }

        CallToolResult::text(text)
    }

    async fn handle_list_directory(&self, args: Value) -> CallToolResult {
        let args: DirectoryArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let (dir, search) = query::directory_query(&args.path);
        let results = match self.search(&search, args.max_results).await {
            Ok(r) => r,
            Err(e) => return e,
        };

        let (folders, files): (Vec<&SearchResult>, Vec<&SearchResult>) =
            results.iter().partition(|r| r.is_folder());
        let per_section = (args.max_results / 2) as usize;

        let mut text = format!(
            "Directory: {}\nFound {} folders, {} files\n\n",
            dir,
            folders.len(),
            files.len()
        );

        if !folders.is_empty() {
            text.push_str("Folders:\n");
            for (i, folder) in folders.iter().enumerate() {
                if i >= per_section {
                    text.push_str(&format!("... and {} more folders\n", folders.len() - i));
                    break;
                }
                text.push_str(&format!("{}. [DIR] {}\n", i + 1, entry_name(&folder.path, &dir)));
            }
            text.push('\n');
        }

        if !files.is_empty() {
            text.push_str("Files:\n");
            for (i, file) in files.iter().enumerate() {
                if i >= per_section {
                    text.push_str(&format!("... and {} more files\n", files.len() - i));
                    break;
                }
                text.push_str(&format!(
                    "{}. {}{}\n",
                    i + 1,
                    entry_name(&file.path, &dir),
                    size_suffix(file)
                ));
            }
        }

        if folders.is_empty() && files.is_empty() {
            text.push_str("The directory is empty or does not exist\n");
        }

        CallToolResult::text(text)
    }

    async fn handle_get_file_info(&self, args: Value) -> CallToolResult {
        let args: FileInfoArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let results = match self.search(&query::file_info_query(&args.path), 1).await {
            Ok(r) => r,
            Err(e) => return e,
        };

        let Some(info) = results.first() else {
            return CallToolResult::error(format!("File or folder not found: {}", args.path));
        };

        let mut text = format!("File info: {}\n\nType: {}\n", info.path, info.kind);
        if info.size > 0 {
            text.push_str(&format!("Size: {} ({} bytes)\n", format_file_size(info.size), info.size));
        } else if info.kind == "file" {
            text.push_str("Size: 0 bytes (empty file)\n");
        }
        if !info.date.is_empty() {
            text.push_str(&format!("Modified: {}\n", info.date));
        }
        text.push_str(&format!("Full path: {}\n", info.full_path));

        CallToolResult::text(text)
    }
}

fn entry_name<'a>(path: &'a str, dir: &str) -> &'a str {
    match path.strip_prefix(dir) {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

fn tool_def<T: JsonSchema>(name: &str, description: &str) -> Tool {
    let schema = schemars::schema_for!(T);
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: serde_json::to_value(schema)
            .unwrap_or_else(|_| json!({"type": "object", "properties": {}})),
    }
}

fn parse_args<T>(args: Value) -> Result<T, CallToolResult>
where
    T: DeserializeOwned + Validate,
{
    let args = if args.is_null() { json!({}) } else { args };
    let parsed: T = serde_json::from_value(args).map_err(|e| {
        CallToolResult::error(
            ValidationError::InvalidParameter {
                name: "arguments".to_string(),
                message: e.to_string(),
            }
            .to_string(),
        )
    })?;
    parsed
        .validate()
        .map_err(|e| CallToolResult::error(validation_failure(&e).to_string()))?;
    Ok(parsed)
}

/// First failing field, by name; an empty required string counts as missing
fn validation_failure(errors: &validator::ValidationErrors) -> ValidationError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    match fields.first() {
        Some((field, errs)) if errs.iter().any(|e| e.code == "length") => {
            ValidationError::MissingField {
                field: field.to_string(),
            }
        }
        Some((field, errs)) => ValidationError::InvalidParameter {
            name: field.to_string(),
            message: errs
                .iter()
                .map(|e| format!("failed {} check", e.code))
                .collect::<Vec<_>>()
                .join(", "),
        },
        None => ValidationError::InvalidParameter {
            name: "arguments".to_string(),
            message: errors.to_string(),
        },
    }
}

// ==================== Tool Arguments ====================

fn default_max_results() -> u32 {
    100
}

fn default_days() -> u32 {
    7
}

fn default_min_size() -> String {
    "100MB".to_string()
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct SearchFilesArgs {
    /// Search keywords matched against file names, paths, and extensions
    #[validate(length(min = 1))]
    query: String,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct ExtensionArgs {
    /// File extension without the dot, for example txt, pdf, jpg
    #[validate(length(min = 1))]
    extension: String,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct PathArgs {
    /// Path to search in, for example C:\Users\Documents
    #[validate(length(min = 1))]
    path: String,

    /// Optional keywords
    #[serde(default)]
    query: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct SizeArgs {
    /// Minimum size, for example 1MB, 100KB, 1GB
    #[serde(default)]
    size_min: Option<String>,

    /// Maximum size, for example 10MB, 1GB
    #[serde(default)]
    size_max: Option<String>,

    /// Optional keywords
    #[serde(default)]
    query: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct DateArgs {
    /// Which date to filter on (default modified)
    #[serde(default)]
    date_type: DateKind,

    /// Start date, YYYY-MM-DD
    #[serde(default)]
    date_from: Option<String>,

    /// End date, YYYY-MM-DD
    #[serde(default)]
    date_to: Option<String>,

    /// Optional keywords
    #[serde(default)]
    query: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct RecentArgs {
    /// Files modified within this many days (default 7)
    #[serde(default = "default_days")]
    #[validate(range(min = 1))]
    days: u32,

    /// Optional keywords
    #[serde(default)]
    query: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct LargeFilesArgs {
    /// Minimum size (default 100MB)
    #[serde(default = "default_min_size")]
    #[validate(length(min = 1))]
    min_size: String,

    /// Optional path to search in
    #[serde(default)]
    path: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct EmptyArgs {
    /// Search for empty files or empty folders (default file)
    #[serde(default, rename = "type")]
    kind: EmptyKind,

    /// Optional path to search in
    #[serde(default)]
    path: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct ContentTypeArgs {
    /// Content category
    content_type: ContentType,

    /// Optional keywords
    #[serde(default)]
    query: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct RegexArgs {
    /// Regular expression, for example .*\.log$
    #[validate(length(min = 1))]
    regex: String,

    /// Optional path to search in
    #[serde(default)]
    path: Option<String>,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct DuplicateArgs {
    /// File name to look for, for example config.txt
    #[validate(length(min = 1))]
    filename: String,

    /// Maximum number of results (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct DirectoryArgs {
    /// Directory to list, for example C:\, C:\Users, D:\Projects
    #[validate(length(min = 1))]
    path: String,

    /// Maximum number of entries (default 100)
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1))]
    max_results: u32,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct FileInfoArgs {
    /// Full path of the file or folder
    #[validate(length(min = 1))]
    path: String,
}
