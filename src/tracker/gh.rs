//! GitHub REST calls through `gh api`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::exec::CommandRunner;

#[derive(Debug, Error)]
pub enum GhError {
    #[error("failed to run gh: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("gh api {method} {endpoint} failed: {stderr}")]
    Failed {
        method: Method,
        endpoint: String,
        stderr: String,
    },

    #[error("invalid JSON from gh api {method} {endpoint}: {source}")]
    Decode {
        method: Method,
        endpoint: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        })
    }
}

/// An issue/PR comment as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

pub struct GhApi<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> GhApi<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// `gh api {endpoint} -X {method}`. GET requests follow pagination; a body
    /// is sent as JSON on stdin. Empty output maps to `None`.
    pub fn call(&self, endpoint: &str, method: Method, body: Option<&Value>) -> Result<Option<Value>, GhError> {
        let mut args = vec![
            "api".to_string(),
            endpoint.to_string(),
            "-X".to_string(),
            method.to_string(),
        ];
        if method == Method::Get {
            args.push("--paginate".to_string());
        }
        let input = body.map(Value::to_string);
        if input.is_some() {
            args.push("--input".to_string());
            args.push("-".to_string());
        }

        let output = self.runner.run("gh", &args, input.as_deref())?;
        if !output.success() {
            return Err(GhError::Failed {
                method,
                endpoint: endpoint.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        parse_response(&output.stdout).map_err(|source| GhError::Decode {
            method,
            endpoint: endpoint.to_string(),
            source,
        })
    }

    pub fn list_comments(&self, repo: &str, pr: u64) -> Result<Vec<IssueComment>, GhError> {
        let endpoint = format!("repos/{repo}/issues/{pr}/comments");
        let Some(value) = self.call(&endpoint, Method::Get, None)? else {
            return Ok(Vec::new());
        };
        serde_json::from_value(value).map_err(|source| GhError::Decode {
            method: Method::Get,
            endpoint,
            source,
        })
    }

    pub fn create_comment(&self, repo: &str, pr: u64, body: &str) -> Result<(), GhError> {
        self.call(
            &format!("repos/{repo}/issues/{pr}/comments"),
            Method::Post,
            Some(&json!({ "body": body })),
        )?;
        Ok(())
    }

    pub fn update_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<(), GhError> {
        self.call(
            &format!("repos/{repo}/issues/comments/{comment_id}"),
            Method::Patch,
            Some(&json!({ "body": body })),
        )?;
        Ok(())
    }

    pub fn add_labels(&self, repo: &str, pr: u64, labels: &[&str]) -> Result<(), GhError> {
        self.call(
            &format!("repos/{repo}/issues/{pr}/labels"),
            Method::Post,
            Some(&json!({ "labels": labels })),
        )?;
        Ok(())
    }

    pub fn create_label(&self, repo: &str, name: &str, color: &str, description: &str) -> Result<(), GhError> {
        self.call(
            &format!("repos/{repo}/labels"),
            Method::Post,
            Some(&json!({ "name": name, "color": color, "description": description })),
        )?;
        Ok(())
    }
}

/// `--paginate` prints one JSON document per page back to back; arrays from
/// multiple pages are merged into one.
fn parse_response(stdout: &str) -> Result<Option<Value>, serde_json::Error> {
    if stdout.trim().is_empty() {
        return Ok(None);
    }
    let mut pages = serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()?;
    if pages.len() == 1 {
        return Ok(pages.pop());
    }
    if pages.iter().all(Value::is_array) {
        let merged = pages
            .into_iter()
            .flat_map(|page| match page {
                Value::Array(items) => items,
                _ => Vec::new(),
            })
            .collect();
        return Ok(Some(Value::Array(merged)));
    }
    Ok(pages.pop())
}
