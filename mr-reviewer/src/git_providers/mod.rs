//! Code host facade w/o async-trait or dynamic trait objects.
//!
//! The pipeline only needs five operations from the hosting service, so they
//! are collected in the small [`CodeHost`] capability. [`GitLabClient`] is the
//! production implementation; tests plug in in-memory fakes.

use std::future::Future;

use git_context_engine::GitLabClient;
pub use git_context_engine::{
    Change, ChangeRequestId, DiffPosition, DiffVersion, MergeRequest, MergeRequestState,
    ProviderConfig,
};

use crate::errors::MrResult;

/// Operations the reviewer consumes from a source-hosting service.
pub trait CodeHost: Sync {
    /// Merge requests of `project`, in service order, filtered by `state`.
    fn list_merge_requests(
        &self,
        project: &str,
        state: MergeRequestState,
    ) -> impl Future<Output = MrResult<Vec<MergeRequest>>> + Send;

    /// File-level diffs of a merge request, in service order.
    fn fetch_changes(
        &self,
        id: &ChangeRequestId,
    ) -> impl Future<Output = MrResult<Vec<Change>>> + Send;

    /// Diff versions of a merge request, newest first.
    fn fetch_diff_versions(
        &self,
        id: &ChangeRequestId,
    ) -> impl Future<Output = MrResult<Vec<DiffVersion>>> + Send;

    /// Posts an unpositioned note, returning its id.
    fn post_note(
        &self,
        id: &ChangeRequestId,
        body: &str,
    ) -> impl Future<Output = MrResult<u64>> + Send;

    /// Posts a discussion anchored at `position`, returning its id.
    fn post_discussion(
        &self,
        id: &ChangeRequestId,
        body: &str,
        position: &DiffPosition,
    ) -> impl Future<Output = MrResult<String>> + Send;
}

impl CodeHost for GitLabClient {
    async fn list_merge_requests(
        &self,
        project: &str,
        state: MergeRequestState,
    ) -> MrResult<Vec<MergeRequest>> {
        Ok(GitLabClient::list_merge_requests(self, project, state).await?)
    }

    async fn fetch_changes(&self, id: &ChangeRequestId) -> MrResult<Vec<Change>> {
        Ok(self.get_changes(id).await?)
    }

    async fn fetch_diff_versions(&self, id: &ChangeRequestId) -> MrResult<Vec<DiffVersion>> {
        Ok(self.get_diff_versions(id).await?)
    }

    async fn post_note(&self, id: &ChangeRequestId, body: &str) -> MrResult<u64> {
        Ok(self.create_note(id, body).await?)
    }

    async fn post_discussion(
        &self,
        id: &ChangeRequestId,
        body: &str,
        position: &DiffPosition,
    ) -> MrResult<String> {
        Ok(self.create_discussion(id, body, position).await?)
    }
}
