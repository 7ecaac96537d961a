// src/update/branch.rs

//! Current-branch resolution for forced updates.
//!
//! Three tiers, tried in order:
//! 1. ask git (`git rev-parse --abbrev-ref HEAD`),
//! 2. parse `.git/HEAD`,
//! 3. the configured default branch.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::fs::FileSystem;

static HEAD_REF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"refs/(heads|remotes/origin)/([\w\-./]+)").ok());

/// Which tier produced the branch name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSource {
    GitQuery,
    HeadFile,
    Default,
}

impl fmt::Display for BranchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BranchSource::GitQuery => "git rev-parse",
            BranchSource::HeadFile => ".git/HEAD",
            BranchSource::Default => "configured default",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBranch {
    pub name: String,
    pub source: BranchSource,
}

/// Authoritative query of the checked-out branch.
pub trait HeadQuery: Send + Sync {
    /// `None` when the query fails or HEAD is detached.
    fn current_branch<'a>(
        &'a self,
        repo: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

/// Runs `git rev-parse --abbrev-ref HEAD` in the checkout.
#[derive(Debug, Clone, Default)]
pub struct GitHeadQuery;

impl HeadQuery for GitHeadQuery {
    fn current_branch<'a>(
        &'a self,
        repo: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            let output = Command::new("git")
                .args(["rev-parse", "--abbrev-ref", "HEAD"])
                .current_dir(repo)
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await
                .ok()?;

            if !output.status.success() {
                return None;
            }
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            // "HEAD" means detached.
            (!name.is_empty() && name != "HEAD").then_some(name)
        })
    }
}

/// Branch named by the contents of a `.git/HEAD` file.
pub fn parse_head_ref(contents: &str) -> Option<String> {
    let re = HEAD_REF.as_ref()?;
    re.captures(contents)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

pub async fn resolve_branch(
    query: &dyn HeadQuery,
    fs: &dyn FileSystem,
    repo: &Path,
    default_branch: &str,
) -> ResolvedBranch {
    if let Some(name) = query.current_branch(repo).await {
        return ResolvedBranch {
            name,
            source: BranchSource::GitQuery,
        };
    }

    let head = repo.join(".git").join("HEAD");
    match fs.read_to_string(&head) {
        Ok(contents) => {
            if let Some(name) = parse_head_ref(&contents) {
                return ResolvedBranch {
                    name,
                    source: BranchSource::HeadFile,
                };
            }
            debug!(path = ?head, "HEAD file names no branch");
        }
        Err(err) => debug!(path = ?head, error = %err, "cannot read HEAD file"),
    }

    warn!(
        repo = ?repo,
        branch = default_branch,
        "could not detect current branch; falling back to configured default"
    );
    ResolvedBranch {
        name: default_branch.to_string(),
        source: BranchSource::Default,
    }
}
