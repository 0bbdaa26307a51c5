use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Input received from Claude Code via stdin
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HookInput {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub hook_event_name: Option<String>,
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    /// Parse a hook payload. Blank or malformed input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(raw) {
            Ok(input) => Some(input),
            Err(e) => {
                log::debug!("ignoring malformed hook input: {e}");
                None
            }
        }
    }

    /// Read the payload from stdin, unless stdin is an interactive terminal.
    pub fn from_stdin() -> Option<Self> {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return None;
        }
        let mut raw = String::new();
        if let Err(e) = stdin.lock().read_to_string(&mut raw) {
            log::debug!("could not read hook input: {e}");
            return None;
        }
        Self::parse(&raw)
    }
}

/// Pick the project root: explicit override, then the hook's `cwd`, then `fallback`.
pub fn resolve_project_dir(explicit: Option<&str>, input: Option<&HookInput>, fallback: &Path) -> PathBuf {
    explicit
        .filter(|s| !s.is_empty())
        .or_else(|| input.and_then(|i| i.cwd.as_deref()).filter(|s| !s.is_empty()))
        .map(expand_path)
        .unwrap_or_else(|| fallback.to_path_buf())
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
