//! Decide which checks apply to a project from the files it contains.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::exec::{CommandLine, CommandRunner};

/// Scaffolded `package.json` scripts contain this until someone fills them in.
pub const PLACEHOLDER_MARKER: &str = "ERROR: Configure";

/// A named check and the command that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub command: CommandLine,
}

impl Check {
    fn new<I, S>(name: &'static str, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            command: CommandLine::new(program, args),
        }
    }
}

/// The parts of `package.json` the hook cares about.
#[derive(Debug, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageManifest {
    /// A script counts only if it is non-empty and not a scaffold placeholder.
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts
            .get(name)
            .is_some_and(|s| !s.is_empty() && !s.contains(PLACEHOLDER_MARKER))
    }
}

/// Read `package.json` from `dir`. `Ok(None)` when the file does not exist.
pub fn load_manifest(dir: &Path) -> Result<Option<PackageManifest>> {
    let path = dir.join("package.json");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let manifest = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(manifest))
}

/// Checks for the JS ecosystem, in run order: tests, lint, typecheck.
pub fn node_checks(manifest: &PackageManifest) -> Vec<Check> {
    [("tests", "test"), ("lint", "lint"), ("typecheck", "check")]
        .into_iter()
        .filter(|(_, script)| manifest.has_script(script))
        .map(|(name, script)| Check::new(name, "pnpm", [script]))
        .collect()
}

/// Checks for the Python ecosystem: ruff, then pytest.
///
/// With a `uv.lock` and `uv` installed everything runs through `uv run`, which
/// provides the tools itself; otherwise each tool must be on `PATH`.
pub fn python_checks(dir: &Path, runner: &dyn CommandRunner) -> Vec<Check> {
    let has_pyproject = dir.join("pyproject.toml").exists();
    let has_uv_lock = dir.join("uv.lock").exists();
    if !has_pyproject && !has_uv_lock {
        return Vec::new();
    }

    let use_uv = has_uv_lock && runner.is_available("uv");
    let tool = |name: &'static str, program: &str, args: &[&str]| {
        if use_uv {
            let mut full = vec!["run", program];
            full.extend_from_slice(args);
            Check::new(name, "uv", full)
        } else {
            Check::new(name, program, args.iter().copied())
        }
    };

    let mut checks = Vec::new();
    if use_uv || runner.is_available("ruff") {
        checks.push(tool("ruff", "ruff", &["check", "."]));
    } else {
        log::warn!("ruff not found, skipping lint");
    }

    if dir.join("tests").is_dir() {
        if use_uv || runner.is_available("pytest") {
            checks.push(tool("pytest", "pytest", &[]));
        } else {
            log::warn!("pytest not found, skipping tests");
        }
    }
    checks
}

/// Every check that applies to the project in `dir`.
pub fn plan_checks(dir: &Path, runner: &dyn CommandRunner) -> Vec<Check> {
    let mut checks = match load_manifest(dir) {
        Ok(Some(manifest)) => node_checks(&manifest),
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("skipping package.json checks: {e:#}");
            Vec::new()
        }
    };
    checks.extend(python_checks(dir, runner));
    checks
}
