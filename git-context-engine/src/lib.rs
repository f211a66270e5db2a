//! GitLab access for the merge request reviewer.
//!
//! Exposes a thin REST v4 client ([`git_providers::gitlab::GitLabClient`])
//! and the transient data model it returns: merge requests, file-level
//! changes, diff versions and discussion positions.

pub mod errors;
pub mod git_providers;

pub use errors::{GitContextEngineError, GitContextEngineResult};
pub use git_providers::gitlab::GitLabClient;
pub use git_providers::{ProviderConfig, types::*};
