use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{ProjectRepository, ProjectSnapshot, Result};
use crate::error::RepositoryError;
use crate::model::field::{FieldConfig, ProjectField};
use crate::model::project::{ProjectIdentity, ProjectRef};

/// One recorded `update_field` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub project: ProjectIdentity,
    pub issue_url: String,
    pub field: ProjectField,
    pub dry_run: bool,
}

/// In-memory repository that records what the engine asks of it.
///
/// Non-dry-run updates are applied to the stored values, like the real
/// repository's cache.
#[derive(Debug, Default)]
pub struct MockRepository {
    identities: HashMap<u32, ProjectIdentity>,
    snapshot: ProjectSnapshot,
    values: HashMap<(ProjectIdentity, String), Vec<ProjectField>>,
    titles: HashMap<String, String>,
    fail_snapshot: bool,
    failing_updates: HashSet<String>,
    failing_value_fetches: HashSet<String>,
    pub updates: Vec<UpdateCall>,
    pub resolved: Vec<ProjectRef>,
    pub value_fetches: Vec<(ProjectIdentity, String)>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the board with this number to `id`. Unknown numbers fail.
    pub fn with_project(mut self, number: u32, id: &str) -> Self {
        self.identities.insert(number, ProjectIdentity::new(id));
        self
    }

    pub fn with_snapshot(mut self, snapshot: ProjectSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn with_values(mut self, project: &str, issue_url: &str, values: Vec<ProjectField>) -> Self {
        self.values
            .insert((ProjectIdentity::new(project), issue_url.to_string()), values);
        self
    }

    pub fn with_title(mut self, issue_url: &str, title: &str) -> Self {
        self.titles.insert(issue_url.to_string(), title.to_string());
        self
    }

    pub fn failing_snapshot(mut self) -> Self {
        self.fail_snapshot = true;
        self
    }

    pub fn failing_update(mut self, issue_url: &str) -> Self {
        self.failing_updates.insert(issue_url.to_string());
        self
    }

    pub fn failing_value_fetch(mut self, issue_url: &str) -> Self {
        self.failing_value_fetches.insert(issue_url.to_string());
        self
    }

    pub fn values_of(&self, project: &str, issue_url: &str) -> Vec<ProjectField> {
        self.values
            .get(&(ProjectIdentity::new(project), issue_url.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn updated_issues(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.issue_url.as_str()).collect()
    }
}

#[async_trait]
impl ProjectRepository for MockRepository {
    async fn resolve_project_identity(&mut self, project: &ProjectRef) -> Result<ProjectIdentity> {
        self.resolved.push(project.clone());
        self.identities
            .get(&project.project_number)
            .cloned()
            .ok_or_else(|| RepositoryError::ProjectNotFound(project.to_string()))
    }

    async fn fetch_field_configs_and_issues(
        &mut self,
        _source: &ProjectIdentity,
        _target: &ProjectIdentity,
    ) -> Result<ProjectSnapshot> {
        if self.fail_snapshot {
            return Err(RepositoryError::Other("mock snapshot failure".into()));
        }
        Ok(self.snapshot.clone())
    }

    async fn fetch_field_values(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        configs: &[FieldConfig],
    ) -> Result<Vec<ProjectField>> {
        self.value_fetches.push((project.clone(), issue_url.to_string()));
        if self.failing_value_fetches.contains(issue_url) {
            return Err(RepositoryError::Other("mock value fetch failure".into()));
        }
        Ok(self
            .values
            .get(&(project.clone(), issue_url.to_string()))
            .map(|fields| {
                fields
                    .iter()
                    .filter(|f| configs.iter().any(|c| c.name == f.name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_field(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        field: &ProjectField,
        dry_run: bool,
    ) -> Result<()> {
        self.updates.push(UpdateCall {
            project: project.clone(),
            issue_url: issue_url.to_string(),
            field: field.clone(),
            dry_run,
        });
        if self.failing_updates.contains(issue_url) {
            return Err(RepositoryError::Other("mock update failure".into()));
        }
        if !dry_run {
            let values = self
                .values
                .entry((project.clone(), issue_url.to_string()))
                .or_default();
            match values.iter_mut().find(|v| v.name == field.name) {
                Some(existing) => existing.value = field.value.clone(),
                None => values.push(field.clone()),
            }
        }
        Ok(())
    }

    async fn fetch_issue_title(&mut self, issue_url: &str) -> Result<String> {
        self.titles
            .get(issue_url)
            .cloned()
            .ok_or_else(|| RepositoryError::Other(format!("no title for {issue_url}")))
    }
}
