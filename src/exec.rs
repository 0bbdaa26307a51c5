//! Process execution behind a small trait so decision logic can be driven by
//! a fake in tests.

use std::env;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, the way a terminal would have shown them.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external programs and answers whether a program is installed.
pub trait CommandRunner {
    /// Run `program` with `args` to completion, feeding `stdin` if given.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`];
    /// `Err` means the process could not be started at all.
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> io::Result<CommandOutput>;

    /// Whether `program` resolves to an executable on `PATH`.
    fn is_available(&self, program: &str) -> bool;
}

/// [`CommandRunner`] backed by `std::process`, optionally pinned to a directory.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cwd: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes())?;
            }
        }
        let output = child.wait_with_output()?;

        Ok(CommandOutput {
            // Killed by a signal: no code, treat as failure.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        find_in_path(program).is_some()
    }
}

/// Locate `program` on `PATH`, like `which`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(program);
        return is_executable(&path).then_some(path);
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A program plus its arguments, kept together for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_display_joins_with_spaces() {
        let cmd = CommandLine::new("uv", ["run", "ruff", "check", "."]);
        assert_eq!(cmd.to_string(), "uv run ruff check .");
    }

    #[test]
    fn combined_output_puts_stdout_first() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "out\n".into(),
            stderr: "err\n".into(),
        };
        assert_eq!(out.combined(), "out\nerr\n");
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_exit_code_and_streams() {
        let runner = SystemRunner::new();
        let out = runner
            .run(
                "sh",
                &["-c".to_string(), "echo hi; echo oops >&2; exit 3".to_string()],
                None,
            )
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, "hi\n");
        assert_eq!(out.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_feeds_stdin() {
        let runner = SystemRunner::new();
        let out = runner.run("cat", &[], Some("{\"body\":\"x\"}")).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "{\"body\":\"x\"}");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_respects_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::in_dir(dir.path());
        let out = runner.run("pwd", &[], None).unwrap();
        let reported = PathBuf::from(out.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let runner = SystemRunner::new();
        assert!(runner
            .run("definitely-not-a-real-program-7f3a", &[], None)
            .is_err());
        assert!(!runner.is_available("definitely-not-a-real-program-7f3a"));
    }

    #[cfg(unix)]
    #[test]
    fn sh_is_on_path() {
        assert!(SystemRunner::new().is_available("sh"));
    }
}
