//! Data model for merge requests, their file-level changes and diff versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GitContextEngineError;

/// A unique reference to a merge request inside a project.
///
/// * `project` – numeric ID or "group/project" path.
/// * `iid`     – project-scoped merge request number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestId {
    pub project: String,
    pub iid: u64,
}

impl fmt::Display for ChangeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.project, self.iid)
    }
}

/// Merge request state filter used when listing.
///
/// `All` disables filtering; every other variant matches GitLab's `state`
/// field verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeRequestState {
    #[default]
    Opened,
    Closed,
    Merged,
    Locked,
    All,
}

impl MergeRequestState {
    /// Value for GitLab's `state` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Locked => "locked",
            Self::All => "all",
        }
    }

    /// Whether a merge request with the given raw `state` passes this filter.
    pub fn accepts(&self, state: &str) -> bool {
        match self {
            Self::All => true,
            other => other.as_query() == state,
        }
    }
}

impl FromStr for MergeRequestState {
    type Err = GitContextEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opened" | "open" => Ok(Self::Opened),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            "locked" => Ok(Self::Locked),
            "all" | "any" => Ok(Self::All),
            other => Err(GitContextEngineError::Validation(format!(
                "unknown merge request state: {other}"
            ))),
        }
    }
}

/// Merge request as listed for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Project-scoped sequence number.
    pub iid: u64,
    /// Raw GitLab state (`opened`, `closed`, `merged`, `locked`).
    pub state: String,
    pub project_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// File-level change inside a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub old_path: String,
    pub new_path: String,
    /// Raw unified diff text; empty for binary or collapsed files.
    #[serde(default)]
    pub diff: String,
}

impl Change {
    pub fn is_renamed(&self) -> bool {
        self.old_path != self.new_path
    }
}

/// Commit triple identifying one diff revision of a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffVersion {
    pub id: u64,
    pub base_commit_sha: String,
    pub start_commit_sha: String,
    pub head_commit_sha: String,
}

impl DiffVersion {
    /// True when base, start and head SHAs are all present.
    pub fn has_all_commits(&self) -> bool {
        !self.base_commit_sha.is_empty()
            && !self.start_commit_sha.is_empty()
            && !self.head_commit_sha.is_empty()
    }
}

/// Position payload anchoring a discussion to a file in a diff revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPosition {
    pub base_sha: String,
    pub start_sha: String,
    pub head_sha: String,
    pub old_path: String,
    pub new_path: String,
    pub old_line: u32,
    pub new_line: u32,
}

impl DiffPosition {
    /// True when base, start and head SHAs are all present.
    pub fn has_all_commits(&self) -> bool {
        !self.base_sha.is_empty() && !self.start_sha.is_empty() && !self.head_sha.is_empty()
    }

    /// Anchors a comment on `change` at the given line of both sides,
    /// using the commit triple of `version`.
    pub fn for_change(version: &DiffVersion, change: &Change, line: u32) -> Self {
        Self {
            base_sha: version.base_commit_sha.clone(),
            start_sha: version.start_commit_sha.clone(),
            head_sha: version.head_commit_sha.clone(),
            old_path: change.old_path.clone(),
            new_path: change.new_path.clone(),
            old_line: line,
            new_line: line,
        }
    }
}
