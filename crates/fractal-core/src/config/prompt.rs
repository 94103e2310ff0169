//! System instructions loading

use std::path::{Path, PathBuf};

use crate::log_debug;
use crate::logging::Logger;

pub const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful coding tutor for bootcamp students.";

/// Default location of the prompt file inside a workspace
pub fn default_prompt_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".fractal").join("system-prompt.md")
}

/// Read the system instructions.
///
/// `explicit` (from settings) wins over the workspace default; relative
/// paths resolve against `workspace_root`. Unreadable or blank files fall
/// back to [`FALLBACK_SYSTEM_PROMPT`].
pub fn load_system_prompt(workspace_root: &Path, explicit: Option<&Path>, logger: &dyn Logger) -> String {
    let candidates = explicit
        .map(|p| if p.is_absolute() { p.to_path_buf() } else { workspace_root.join(p) })
        .into_iter()
        .chain(std::iter::once(default_prompt_path(workspace_root)));

    for path in candidates {
        match std::fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => {
                log_debug!(logger, "[config] System prompt loaded from {}", path.display());
                return text;
            }
            Ok(_) => log_debug!(logger, "[config] System prompt file {} is empty", path.display()),
            Err(e) => log_debug!(logger, "[config] No system prompt at {}: {}", path.display(), e),
        }
    }
    FALLBACK_SYSTEM_PROMPT.to_string()
}
