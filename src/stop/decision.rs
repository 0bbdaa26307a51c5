use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Block,
}

/// Output to control Claude's behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookOutput {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HookOutput {
    pub fn approve() -> Self {
        Self {
            decision: Decision::Approve,
            reason: None,
        }
    }

    pub fn approve_with(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Approve,
            reason: Some(reason.into()),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Block,
            reason: Some(reason.into()),
        }
    }

    /// The single stdout line Claude Code reads.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A check that exited non-zero, with everything it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub name: String,
    pub output: String,
}

impl CheckFailure {
    /// Section of the block reason showing this failure.
    pub fn report(&self) -> String {
        format!("=== {} FAILED ===\n{}\n", self.name, self.output)
    }
}

/// What to do with the on-disk retry counter after deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Clear,
    Store(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub output: HookOutput,
    pub counter: CounterUpdate,
}

/// Decide the hook outcome for `attempt` (1-based) given the failed checks.
///
/// Passing clears the counter and approves. Failing below the cap blocks and
/// stores `attempt`. Failing at the cap clears the counter and approves with a
/// warning, so a session never loops on checks it cannot fix.
pub fn decide(attempt: u32, max_retries: u32, failures: &[CheckFailure]) -> Verdict {
    if failures.is_empty() {
        return Verdict {
            output: HookOutput::approve(),
            counter: CounterUpdate::Clear,
        };
    }

    if attempt >= max_retries {
        let remaining = failures
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if attempt == 1 { "attempt" } else { "attempts" };
        log::warn!("Giving up after {attempt} {noun}. Failures remain: {remaining}");
        return Verdict {
            output: HookOutput::approve_with(format!(
                "Approved despite failures after {attempt} {noun}. Remaining: {remaining}\nHuman review needed."
            )),
            counter: CounterUpdate::Clear,
        };
    }

    let summary = failures
        .iter()
        .map(|f| format!("{} failed", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    let details = failures
        .iter()
        .map(CheckFailure::report)
        .collect::<Vec<_>>()
        .join("\n");
    Verdict {
        output: HookOutput::block(format!(
            "CI failed (attempt {attempt}/{max_retries}): {summary}.\n\n{details}"
        )),
        counter: CounterUpdate::Store(attempt),
    }
}
