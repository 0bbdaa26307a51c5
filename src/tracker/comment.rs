//! The tracker comment: a marker line, the history as JSON in an HTML
//! comment, then a summary for humans.

use std::sync::LazyLock;

use regex::Regex;

use super::gh::IssueComment;
use super::history::FailureHistory;

pub const TRACKER_MARKER: &str = "<!-- claude-failure-tracker -->";

static HISTORY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!-- failures:(\{.*?\}) -->").expect("valid history pattern"));

/// Which headline the comment gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    Failing,
    /// The workflow that just failed reached its cap; others may still retry.
    WorkflowExhausted,
    AllExhausted,
}

impl CommentState {
    pub fn from_flags(just_exhausted: bool, all_exhausted: bool) -> Self {
        if all_exhausted {
            CommentState::AllExhausted
        } else if just_exhausted {
            CommentState::WorkflowExhausted
        } else {
            CommentState::Failing
        }
    }
}

/// First comment carrying the tracker marker.
pub fn find_tracker(comments: &[IssueComment]) -> Option<&IssueComment> {
    comments
        .iter()
        .find(|c| c.body.as_deref().is_some_and(|b| b.contains(TRACKER_MARKER)))
}

/// Pull the history out of a tracker comment body.
///
/// `Ok(None)` when the body has no history line; `Err` when it does but the
/// JSON does not parse.
pub fn parse_history(body: &str) -> serde_json::Result<Option<FailureHistory>> {
    match HISTORY_LINE.captures(body) {
        Some(caps) => FailureHistory::from_json(&caps[1]).map(Some),
        None => Ok(None),
    }
}

/// One bullet per workflow, pointing at its most recent failure.
pub fn summary(history: &FailureHistory, cap: usize) -> String {
    history
        .workflows()
        .filter_map(|(name, runs)| {
            let latest = runs.last()?;
            let status = if runs.len() >= cap { " (giving up)" } else { "" };
            Some(format!(
                "- **{name}** [failed]({}) on commit {} (attempt {}/{cap}){status}",
                latest.url,
                latest.sha,
                runs.len()
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// History JSON safe to embed in an HTML comment.
///
/// `-->` inside a string would close the comment early; `\u003e` decodes back
/// to `>` so the JSON value is unchanged.
fn embedded_json(history: &FailureHistory) -> String {
    history.to_json().replace("-->", "--\\u003e")
}

/// Full comment body for the current history.
pub fn render(history: &FailureHistory, workflow: &str, cap: usize, state: CommentState) -> String {
    let header = format!("{TRACKER_MARKER}\n<!-- failures:{} -->\n", embedded_json(history));
    let failure_list = summary(history, cap);
    match state {
        CommentState::AllExhausted => format!(
            "{header}**Automated fix attempts exhausted.** The following workflows failed repeatedly:\n\n\
             {failure_list}\n\nHuman review is needed."
        ),
        CommentState::WorkflowExhausted => format!(
            "{header}The following workflows have failed:\n\n{failure_list}\n\n\
             **{workflow}** has exhausted its {cap} attempts."
        ),
        CommentState::Failing => {
            format!("{header}The following workflows have failed on this PR:\n\n{failure_list}")
        }
    }
}
