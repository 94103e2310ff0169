//! `search_project`: case-insensitive substring search across the workspace

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use serde_json::json;

use crate::context::EditorEnvironment;
use crate::types::{Tool, ToolCall};
use super::traits::{require_str, ToolExecutor, ToolOutcome};

pub const DEFAULT_MAX_RESULTS: usize = 50;
/// Upper bound on files scanned per search
pub const MAX_FILES_SCANNED: usize = 1000;
/// Directory names never descended into
pub const EXCLUDED_DIRS: [&str; 4] = ["node_modules", "dist", "target", ".git"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Workspace-relative path with `/` separators
    pub file: String,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    /// Matching line, trimmed
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutput {
    pub search_term: String,
    pub results: Vec<SearchMatch>,
    pub total_matches: usize,
    pub max_results_reached: bool,
}

pub struct SearchProjectTool {
    environment: Arc<dyn EditorEnvironment>,
}

impl SearchProjectTool {
    pub fn new(environment: Arc<dyn EditorEnvironment>) -> Self {
        Self { environment }
    }
}

#[async_trait]
impl ToolExecutor for SearchProjectTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "search_project",
            "Search for a text string across all files in the project. Use this to find where something is defined, used, or mentioned.",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The text to search for"
                },
                "file_pattern": {
                    "type": "string",
                    "description": "Optional glob pattern to limit search (e.g., \"**/*.ts\" for TypeScript files only)"
                },
                "max_results": {
                    "type": "number",
                    "description": "Maximum number of results to return (default: 50)"
                }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let root = self
            .environment
            .workspace_root()
            .ok_or_else(|| "No workspace folder open".to_string())?;
        let query = require_str(call, "query")?.to_string();
        let max_results = call.get_arg_count("max_results").unwrap_or(DEFAULT_MAX_RESULTS);
        let matcher = match call.get_arg_str("file_pattern").filter(|p| !p.trim().is_empty()) {
            Some(pattern) => Some(
                Glob::new(pattern)
                    .map_err(|e| format!("Invalid file pattern: {}", e))?
                    .compile_matcher(),
            ),
            None => None,
        };

        let output = tokio::task::spawn_blocking(move || {
            search_workspace(&root, &query, matcher.as_ref(), max_results)
        })
        .await
        .map_err(|e| format!("Search failed: {}", e))?;

        serde_json::to_value(output).map_err(|e| format!("Search failed: {}", e))
    }
}

/// Walk `root` and collect up to `max_results` matches of `query`.
///
/// Unreadable files are skipped.
pub fn search_workspace(
    root: &Path,
    query: &str,
    file_pattern: Option<&GlobMatcher>,
    max_results: usize,
) -> SearchOutput {
    let needle = query.to_lowercase();
    let mut results = Vec::new();

    for (path, relative) in candidate_files(root, file_pattern) {
        if results.len() >= max_results {
            break;
        }
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let Ok(text) = String::from_utf8(bytes) else {
            continue;
        };

        for (index, line) in text.split('\n').enumerate() {
            let haystack = line.to_lowercase();
            if let Some(at) = haystack.find(&needle) {
                results.push(SearchMatch {
                    file: relative.clone(),
                    line: index + 1,
                    column: haystack[..at].chars().count() + 1,
                    text: line.trim().to_string(),
                });
                if results.len() >= max_results {
                    break;
                }
            }
        }
    }

    SearchOutput {
        search_term: query.to_string(),
        total_matches: results.len(),
        max_results_reached: results.len() >= max_results,
        results,
    }
}

/// Files under `root` matching the pattern, in path order, capped at
/// [`MAX_FILES_SCANNED`]. Yields `(absolute, relative)` pairs.
fn candidate_files(root: &Path, file_pattern: Option<&GlobMatcher>) -> Vec<(PathBuf, String)> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir && entry.depth() > 0 && EXCLUDED_DIRS.iter().any(|d| entry.file_name() == *d))
        })
        .build();

    walker
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .ok()?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match file_pattern {
                Some(matcher) if !matcher.is_match(&relative) => None,
                _ => Some((entry.into_path(), relative)),
            }
        })
        .take(MAX_FILES_SCANNED)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticEnvironment;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn workspace() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/components")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("src/app.ts"), "import { Button } from './components/button';\n  const button = Button();\n").unwrap();
        fs::write(root.join("src/components/button.tsx"), "export function Button() {}\n").unwrap();
        fs::write(root.join("README.md"), "The BUTTON docs\n").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "button everywhere\n").unwrap();
        fs::write(root.join("dist/app.js"), "button bundled\n").unwrap();
        fs::write(root.join(".git/config"), "button\n").unwrap();
        fs::write(root.join("binary.bin"), [0xff, 0xfe, b'b', b'u', b't', b't', b'o', b'n']).unwrap();
        dir
    }

    fn tool(dir: &TempDir) -> SearchProjectTool {
        SearchProjectTool::new(Arc::new(StaticEnvironment::new(dir.path())))
    }

    #[tokio::test]
    async fn test_case_insensitive_with_excludes() {
        let dir = workspace();
        let data = tool(&dir)
            .execute(&ToolCall::new("t", "search_project", json!({ "query": "button" })))
            .await
            .unwrap();

        let files: Vec<&str> = data["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["file"].as_str().unwrap())
            .collect();
        assert!(files.contains(&"README.md"));
        assert!(files.contains(&"src/app.ts"));
        assert!(files.contains(&"src/components/button.tsx"));
        assert!(files.iter().all(|f| !f.starts_with("node_modules") && !f.starts_with("dist") && !f.starts_with(".git")));
        assert!(!files.contains(&"binary.bin"));
        assert_eq!(data["searchTerm"], "button");
        assert_eq!(data["maxResultsReached"], false);
    }

    #[tokio::test]
    async fn test_line_column_and_trim() {
        let dir = workspace();
        let data = tool(&dir)
            .execute(&ToolCall::new(
                "t",
                "search_project",
                json!({ "query": "const button", "file_pattern": "**/*.ts" }),
            ))
            .await
            .unwrap();

        assert_eq!(data["totalMatches"], 1);
        let hit = &data["results"][0];
        assert_eq!(hit["file"], "src/app.ts");
        assert_eq!(hit["line"], 2);
        assert_eq!(hit["column"], 3);
        assert_eq!(hit["text"], "const button = Button();");
    }

    #[tokio::test]
    async fn test_result_cap() {
        let dir = workspace();
        let data = tool(&dir)
            .execute(&ToolCall::new("t", "search_project", json!({ "query": "button", "max_results": 2 })))
            .await
            .unwrap();
        assert_eq!(data["totalMatches"], 2);
        assert_eq!(data["maxResultsReached"], true);
    }

    #[tokio::test]
    async fn test_invalid_pattern_and_missing_query() {
        let dir = workspace();
        let bad = tool(&dir)
            .execute(&ToolCall::new("t", "search_project", json!({ "query": "x", "file_pattern": "[" })))
            .await;
        assert!(bad.unwrap_err().starts_with("Invalid file pattern"));

        let missing = tool(&dir)
            .execute(&ToolCall::new("t", "search_project", json!({})))
            .await;
        assert_eq!(missing.unwrap_err(), "Missing required argument: query");
    }
}
