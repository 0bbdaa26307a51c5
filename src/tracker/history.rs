use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One failed workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub run: u64,
    pub sha: String,
    pub url: String,
}

/// Failures per workflow, in the order workflows first failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureHistory(IndexMap<String, Vec<FailureRecord>>);

/// Result of [`FailureHistory::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The run id is already in the workflow's list.
    AlreadyTracked,
    /// The workflow used up its attempts earlier; the failure is dropped.
    AtCap,
    Recorded {
        /// This failure brought the workflow to the cap.
        just_exhausted: bool,
        /// Every workflow with failures is now at the cap.
        all_exhausted: bool,
    },
}

impl FailureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> String {
        // Map of strings to plain records; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn runs(&self, workflow: &str) -> &[FailureRecord] {
        self.0.get(workflow).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Workflows with at least one recorded failure, in insertion order.
    pub fn workflows(&self) -> impl Iterator<Item = (&str, &[FailureRecord])> {
        self.0
            .iter()
            .filter(|(_, runs)| !runs.is_empty())
            .map(|(name, runs)| (name.as_str(), runs.as_slice()))
    }

    pub fn is_exhausted(&self, workflow: &str, cap: usize) -> bool {
        self.runs(workflow).len() >= cap
    }

    /// True when every workflow that has failed at all is at the cap.
    pub fn all_exhausted(&self, cap: usize) -> bool {
        let mut any = false;
        for (_, runs) in self.workflows() {
            any = true;
            if runs.len() < cap {
                return false;
            }
        }
        any
    }

    /// Append `record` for `workflow` unless its run is already known or the
    /// workflow has reached `cap`. Records are never reordered or removed.
    pub fn record(&mut self, workflow: &str, record: FailureRecord, cap: usize) -> RecordOutcome {
        let runs = self.runs(workflow);
        if runs.iter().any(|r| r.run == record.run) {
            return RecordOutcome::AlreadyTracked;
        }
        if runs.len() >= cap {
            return RecordOutcome::AtCap;
        }

        self.0.entry(workflow.to_string()).or_default().push(record);
        RecordOutcome::Recorded {
            just_exhausted: self.is_exhausted(workflow, cap),
            all_exhausted: self.all_exhausted(cap),
        }
    }
}
