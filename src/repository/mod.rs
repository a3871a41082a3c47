pub mod cache;
pub mod github;
pub mod graphql;
pub mod retry;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::model::field::{FieldConfig, ProjectField};
use crate::model::project::{ProjectIdentity, ProjectRef};

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Field configurations and issue membership of both boards, fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    pub source_configs: Vec<FieldConfig>,
    pub target_configs: Vec<FieldConfig>,
    pub source_issues: Vec<String>,
    pub target_issues: Vec<String>,
}

/// Everything the sync engine needs from the remote side.
///
/// Methods take `&mut self` so implementations can memoize into plain maps
/// for the duration of one run.
#[async_trait]
pub trait ProjectRepository: Send {
    async fn resolve_project_identity(&mut self, project: &ProjectRef) -> Result<ProjectIdentity>;

    /// Pages through all items of both boards before returning.
    async fn fetch_field_configs_and_issues(
        &mut self,
        source: &ProjectIdentity,
        target: &ProjectIdentity,
    ) -> Result<ProjectSnapshot>;

    /// Current values of `configs` for one issue. Values of fields not listed
    /// in `configs` are left out.
    async fn fetch_field_values(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        configs: &[FieldConfig],
    ) -> Result<Vec<ProjectField>>;

    /// Write `field` on the issue's item. With `dry_run` nothing is mutated,
    /// remotely or in any cache.
    async fn update_field(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        field: &ProjectField,
        dry_run: bool,
    ) -> Result<()>;

    async fn fetch_issue_title(&mut self, issue_url: &str) -> Result<String>;
}
