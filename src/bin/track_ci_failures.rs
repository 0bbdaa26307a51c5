//! Record a failed workflow run on its pull request and escalate once every
//! failing workflow is out of attempts.
//!
//! Intended to run from a `workflow_run` job with `gh` authenticated.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use ci_guard::exec::SystemRunner;
use ci_guard::logging;
use ci_guard::tracker::gh::GhApi;
use ci_guard::tracker::{self, FailureEvent};

#[derive(Parser)]
#[command(name = "track-ci-failures", version, about = "Track CI failures on a pull request")]
struct Cli {
    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: String,

    #[arg(long, env = "PR_NUMBER")]
    pr_number: u64,

    /// Name of the workflow that failed
    #[arg(long, env = "WORKFLOW_NAME")]
    workflow: String,

    #[arg(long, env = "RUN_URL")]
    run_url: String,

    #[arg(long, env = "RUN_ID")]
    run_id: u64,

    /// Commit the run was for; shortened to 7 characters
    #[arg(long, env = "HEAD_SHA")]
    head_sha: String,
}

impl From<Cli> for FailureEvent {
    fn from(cli: Cli) -> Self {
        FailureEvent {
            repo: cli.repo,
            pr_number: cli.pr_number,
            workflow: cli.workflow,
            run_url: cli.run_url,
            run_id: cli.run_id,
            head_sha: cli.head_sha,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = run(cli.into()) {
        log::error!("{e:#}");
        process::exit(1);
    }
}

fn run(event: FailureEvent) -> Result<()> {
    let runner = SystemRunner::new();
    let api = GhApi::new(&runner);
    tracker::track_failure(&event, &api)
        .with_context(|| format!("failed to track {} run {}", event.workflow, event.run_id))?;
    Ok(())
}
