//! Stop hook: re-run the project's checks before a session may finish.

pub mod decision;
pub mod detect;
pub mod input;
pub mod retry;

use std::path::PathBuf;

use anyhow::Result;

use crate::exec::CommandRunner;

use self::decision::{CheckFailure, CounterUpdate, HookOutput};
use self::detect::Check;
use self::retry::RetryCounter;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HookConfig {
    pub project_dir: PathBuf,
    pub max_retries: u32,
    /// Directory holding the retry counter file.
    pub state_dir: PathBuf,
}

/// Read a retry-cap override, falling back to [`DEFAULT_MAX_RETRIES`].
///
/// A bad value must not stop the hook from answering, so anything that is
/// not a non-negative integer is logged and ignored. `0` is accepted and
/// means failures are approved straight away.
pub fn parse_max_retries(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_MAX_RETRIES;
    };
    raw.parse().unwrap_or_else(|_| {
        log::warn!("ignoring invalid retry cap {raw:?}, using {DEFAULT_MAX_RETRIES}");
        DEFAULT_MAX_RETRIES
    })
}

/// Run one check. Progress goes to the log; only failures are returned.
pub fn run_check(check: &Check, runner: &dyn CommandRunner) -> Option<CheckFailure> {
    log::info!("Running {}...", check.name);
    let output = match runner.run(&check.command.program, &check.command.args, None) {
        Ok(out) if out.success() => return None,
        Ok(out) => out.combined(),
        Err(e) => format!("failed to run `{}`: {e}\n", check.command),
    };
    Some(CheckFailure {
        name: check.name.to_string(),
        output,
    })
}

pub fn run_checks(checks: &[Check], runner: &dyn CommandRunner) -> Vec<CheckFailure> {
    checks.iter().filter_map(|c| run_check(c, runner)).collect()
}

/// Plan and run the checks for `config.project_dir`, update the retry
/// counter and return the decision to print.
///
/// `runner` must already execute in the project directory.
pub fn run_hook(config: &HookConfig, runner: &dyn CommandRunner) -> Result<HookOutput> {
    let counter = RetryCounter::for_project(&config.state_dir, &config.project_dir);

    let checks = detect::plan_checks(&config.project_dir, runner);
    let failures = run_checks(&checks, runner);

    let attempt = counter.next_attempt();
    let verdict = decision::decide(attempt, config.max_retries, &failures);
    match verdict.counter {
        CounterUpdate::Clear => counter.clear()?,
        CounterUpdate::Store(n) => counter.store(n)?,
    }
    Ok(verdict.output)
}

/// Fail open: internal errors approve rather than trapping the session.
pub fn error_output(err: &anyhow::Error) -> HookOutput {
    HookOutput::approve_with(format!("Stop hook error: {err:#}"))
}
