//! Track repeated CI failures on a pull request.
//!
//! Each failing workflow run is recorded in one tracker comment on the PR.
//! A workflow gets [`MAX_ATTEMPTS`] recorded failures; after that further
//! failures for it are ignored. Once every failing workflow is at the cap the
//! PR is labelled [`ESCALATION_LABEL`] so a human picks it up. Nothing here
//! asks the agent to fix anything; that is the Stop hook's job.

pub mod comment;
pub mod gh;
pub mod history;

use std::fmt;

use self::comment::CommentState;
use self::gh::{GhApi, GhError};
use self::history::{FailureHistory, FailureRecord, RecordOutcome};

pub const MAX_ATTEMPTS: usize = 2;
pub const ESCALATION_LABEL: &str = "needs-human-review";
const ESCALATION_LABEL_COLOR: &str = "d93f0b";
const ESCALATION_LABEL_DESCRIPTION: &str = "Automated CI fix attempts exhausted";

/// The failure event being reported.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub repo: String,
    pub pr_number: u64,
    pub workflow: String,
    pub run_url: String,
    pub run_id: u64,
    pub head_sha: String,
}

impl FailureEvent {
    fn record(&self) -> FailureRecord {
        FailureRecord {
            run: self.run_id,
            sha: self.head_sha.chars().take(7).collect(),
            url: self.run_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    NotNeeded,
    Labeled,
    /// Labeling failed; the comment was still written.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    AlreadyTracked { workflow: String, run_id: u64 },
    WorkflowExhausted { workflow: String },
    Created { workflow: String, escalation: Escalation },
    Updated { workflow: String, escalation: Escalation },
}

impl TrackOutcome {
    pub fn escalation(&self) -> Option<&Escalation> {
        match self {
            TrackOutcome::Created { escalation, .. } | TrackOutcome::Updated { escalation, .. } => {
                Some(escalation)
            }
            _ => None,
        }
    }

    /// Attach the label result to a written comment; skips pass through.
    pub fn with_escalation(self, escalation: Escalation) -> Self {
        match self {
            TrackOutcome::Created { workflow, .. } => TrackOutcome::Created { workflow, escalation },
            TrackOutcome::Updated { workflow, .. } => TrackOutcome::Updated { workflow, escalation },
            other => other,
        }
    }
}

impl fmt::Display for TrackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackOutcome::AlreadyTracked { workflow, run_id } => {
                write!(f, "Already tracked run {run_id} for {workflow}, skipping")
            }
            TrackOutcome::WorkflowExhausted { workflow } => {
                write!(f, "{workflow} already at {MAX_ATTEMPTS} attempts, skipping")
            }
            TrackOutcome::Created { workflow, .. } => {
                write!(f, "Created tracker comment for {workflow} failure")
            }
            TrackOutcome::Updated { workflow, .. } => {
                write!(f, "Updated tracker comment for {workflow} failure")
            }
        }
    }
}

/// Record `event` on its PR and escalate if every workflow is out of attempts.
///
/// Re-delivering the same run is a no-op. Only the label step may fail
/// without failing the call.
pub fn track_failure(event: &FailureEvent, api: &GhApi<'_>) -> Result<TrackOutcome, GhError> {
    let comments = api.list_comments(&event.repo, event.pr_number)?;
    let tracker = comment::find_tracker(&comments);

    let mut history = match tracker.and_then(|c| c.body.as_deref()).map(comment::parse_history) {
        Some(Ok(Some(history))) => history,
        Some(Err(e)) => {
            log::warn!("Corrupt failure state, starting fresh: {e}");
            FailureHistory::new()
        }
        Some(Ok(None)) | None => FailureHistory::new(),
    };

    let (just_exhausted, all_exhausted) =
        match history.record(&event.workflow, event.record(), MAX_ATTEMPTS) {
            RecordOutcome::Recorded {
                just_exhausted,
                all_exhausted,
            } => (just_exhausted, all_exhausted),
            RecordOutcome::AlreadyTracked => {
                return Ok(skipped(TrackOutcome::AlreadyTracked {
                    workflow: event.workflow.clone(),
                    run_id: event.run_id,
                }))
            }
            RecordOutcome::AtCap => {
                return Ok(skipped(TrackOutcome::WorkflowExhausted {
                    workflow: event.workflow.clone(),
                }))
            }
        };

    let state = CommentState::from_flags(just_exhausted, all_exhausted);
    let body = comment::render(&history, &event.workflow, MAX_ATTEMPTS, state);

    let workflow = event.workflow.clone();
    let outcome = match tracker {
        Some(existing) => {
            api.update_comment(&event.repo, existing.id, &body)?;
            TrackOutcome::Updated {
                workflow,
                escalation: Escalation::NotNeeded,
            }
        }
        None => {
            api.create_comment(&event.repo, event.pr_number, &body)?;
            TrackOutcome::Created {
                workflow,
                escalation: Escalation::NotNeeded,
            }
        }
    };
    log::info!("{outcome}");

    if !all_exhausted {
        return Ok(outcome);
    }
    Ok(outcome.with_escalation(escalate(event, api)))
}

fn skipped(outcome: TrackOutcome) -> TrackOutcome {
    log::info!("{outcome}");
    outcome
}

/// Apply the escalation label, creating it once if the repo lacks it.
/// Never fails; the outcome is logged and returned.
fn escalate(event: &FailureEvent, api: &GhApi<'_>) -> Escalation {
    let labels = [ESCALATION_LABEL];
    let result = api.add_labels(&event.repo, event.pr_number, &labels).or_else(|first| {
        log::debug!("adding {ESCALATION_LABEL} failed ({first}); creating the label");
        api.create_label(
            &event.repo,
            ESCALATION_LABEL,
            ESCALATION_LABEL_COLOR,
            ESCALATION_LABEL_DESCRIPTION,
        )
        .map_err(|create_err| {
            log::warn!("Could not create {ESCALATION_LABEL} label: {create_err}");
            first
        })?;
        api.add_labels(&event.repo, event.pr_number, &labels)
    });

    match result {
        Ok(()) => {
            log::info!("Added {ESCALATION_LABEL} label");
            Escalation::Labeled
        }
        Err(e) => {
            log::warn!("Could not add label (may not exist): {e}");
            Escalation::Failed(e.to_string())
        }
    }
}
