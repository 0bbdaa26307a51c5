//! In-memory [`CommandRunner`] for tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;

use crate::exec::{CommandOutput, CommandRunner};

/// One recorded call to [`ScriptedRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program and arguments joined with single spaces.
    pub command: String,
    pub stdin: Option<String>,
}

impl Invocation {
    /// The stdin payload decoded as JSON, if there was one.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.stdin
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
    }
}

/// Fake runner that answers by command-line prefix.
///
/// The longest registered prefix matching the joined command line wins.
/// Unmatched commands succeed with empty output. Programs count as installed
/// only when listed through [`ScriptedRunner::with_available`].
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, CommandOutput>,
    spawn_failures: HashSet<String>,
    available: HashSet<String>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_available(mut self, programs: &[&str]) -> Self {
        self.available
            .extend(programs.iter().map(|p| (*p).to_string()));
        self
    }

    /// Answer commands starting with `prefix` with `output`.
    pub fn respond(&mut self, prefix: &str, output: CommandOutput) -> &mut Self {
        self.responses.insert(prefix.to_string(), output);
        self
    }

    /// Shorthand for a response with the given exit code and streams.
    pub fn respond_with(&mut self, prefix: &str, exit_code: i32, stdout: &str, stderr: &str) -> &mut Self {
        self.respond(
            prefix,
            CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Make commands starting with `prefix` fail to spawn.
    pub fn fail_spawn(&mut self, prefix: &str) -> &mut Self {
        self.spawn_failures.insert(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.command.clone()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> io::Result<CommandOutput> {
        let mut command = program.to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        self.calls.borrow_mut().push(Invocation {
            command: command.clone(),
            stdin: stdin.map(str::to_string),
        });

        if self.spawn_failures.iter().any(|p| command.starts_with(p.as_str())) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            ));
        }

        let best = self
            .responses
            .iter()
            .filter(|(prefix, _)| command.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, out)| out.clone());
        Ok(best.unwrap_or_default())
    }

    fn is_available(&self, program: &str) -> bool {
        self.available.contains(program)
    }
}
