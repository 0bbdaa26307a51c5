//! Claude Code Stop hook: re-run project checks before the session may end.
//!
//! Prints exactly one JSON decision line on stdout, whatever happens. Progress
//! and warnings go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use ci_guard::exec::SystemRunner;
use ci_guard::logging;
use ci_guard::stop::decision::HookOutput;
use ci_guard::stop::input::{resolve_project_dir, HookInput};
use ci_guard::stop::{self, HookConfig};

#[derive(Parser)]
#[command(name = "verify-ci", version, about = "Stop hook that blocks until project checks pass")]
struct Cli {
    /// Project root; defaults to the hook payload's cwd, then the current directory
    #[arg(long, env = "CLAUDE_PROJECT_DIR")]
    project_dir: Option<String>,

    /// Failed attempts before giving up and approving anyway [default: 3]
    #[arg(long, env = "MAX_STOP_RETRIES")]
    max_retries: Option<String>,

    /// Directory for the retry counter [default: system temp dir]
    #[arg(long, env = "CLAUDE_STOP_STATE_DIR")]
    state_dir: Option<PathBuf>,
}

fn main() {
    logging::init();

    let output = match Cli::try_parse() {
        Ok(cli) => run(cli).unwrap_or_else(|e| {
            log::error!("Hook error: {e:#}");
            stop::error_output(&e)
        }),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let err = anyhow::Error::new(e).context("invalid arguments");
            log::error!("Hook error: {err:#}");
            stop::error_output(&err)
        }
    };

    match output.to_json() {
        Ok(line) => println!("{line}"),
        Err(e) => {
            log::error!("failed to encode decision: {e}");
            println!(r#"{{"decision":"approve"}}"#);
        }
    }
}

fn run(cli: Cli) -> Result<HookOutput> {
    let input = HookInput::from_stdin();
    if input.as_ref().and_then(|i| i.stop_hook_active) == Some(true) {
        log::debug!("stop hook re-entered; the retry counter bounds the loop");
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let project_dir = resolve_project_dir(cli.project_dir.as_deref(), input.as_ref(), &cwd);

    let config = HookConfig {
        project_dir: project_dir.clone(),
        max_retries: stop::parse_max_retries(cli.max_retries.as_deref()),
        state_dir: cli.state_dir.unwrap_or_else(std::env::temp_dir),
    };
    let runner = SystemRunner::in_dir(&project_dir);
    stop::run_hook(&config, &runner)
}
