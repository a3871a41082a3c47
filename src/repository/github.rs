use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::cache::{CachedItem, CachedProject, ProjectCache};
use super::graphql::{
    ContentNode, FieldConfigNode, FieldValueNode, GraphQlClient, IssueTitleData, ItemNode,
    ProjectData, ProjectNode, ProjectPairData, ResolveData, ISSUE_TITLE, PROJECT_PAGE,
    PROJECT_PAIR_PAGE, RESOLVE_ORG_PROJECT, RESOLVE_USER_PROJECT, UPDATE_FIELD_VALUE,
};
use super::retry::RetryConfig;
use super::{ProjectRepository, ProjectSnapshot, Result};
use crate::config::GitHubSettings;
use crate::error::RepositoryError;
use crate::model::field::{FieldConfig, FieldKind, FieldValue, ProjectField, SelectOption};
use crate::model::project::{OwnerType, ProjectIdentity, ProjectRef};

/// [`ProjectRepository`] backed by the GitHub GraphQL API.
pub struct GitHubRepository {
    client: GraphQlClient,
    cache: ProjectCache,
}

impl GitHubRepository {
    pub fn new(client: GraphQlClient) -> Self {
        Self {
            client,
            cache: ProjectCache::default(),
        }
    }

    pub fn from_settings(settings: &GitHubSettings, token: &str) -> Result<Self> {
        let client = GraphQlClient::new(
            settings.api_url.clone(),
            token,
            Duration::from_secs(settings.timeout_secs),
            RetryConfig::with_max_retries(settings.max_retries),
        )?;
        Ok(Self::new(client))
    }

    /// Fetch every page of a single board and cache it.
    async fn load_project(&mut self, id: &ProjectIdentity) -> Result<()> {
        let mut pages: Option<ProjectPages> = None;
        let mut cursor: Option<String> = None;
        let mut page = 0;

        loop {
            page += 1;
            debug!(project = %id, page, "loading project page");

            let data: ProjectData = self
                .client
                .execute(
                    "fetch_project",
                    PROJECT_PAGE,
                    json!({ "projectId": id.as_str(), "cursor": cursor }),
                )
                .await?;
            let node = data
                .node
                .ok_or_else(|| RepositoryError::ProjectNotFound(id.to_string()))?;

            let has_next = node.items.page_info.has_next_page;
            cursor = node.items.page_info.end_cursor.clone();
            match pages.as_mut() {
                Some(p) => p.extend(node),
                None => pages = Some(ProjectPages::new(node)),
            }

            if !has_next {
                break;
            }
        }

        if let Some(pages) = pages {
            self.store(id, pages);
        }
        Ok(())
    }

    fn store(&mut self, id: &ProjectIdentity, pages: ProjectPages) {
        let (project, titles) = pages.into_cached(id.clone());
        for (url, title) in titles {
            self.cache.remember_title(url, title);
        }
        self.cache.insert(project);
    }

    async fn ensure_loaded(&mut self, id: &ProjectIdentity) -> Result<&CachedProject> {
        if !self.cache.contains(id) {
            self.load_project(id).await?;
        }
        self.cache
            .get(id)
            .ok_or_else(|| RepositoryError::ProjectNotFound(id.to_string()))
    }
}

#[async_trait]
impl ProjectRepository for GitHubRepository {
    async fn resolve_project_identity(&mut self, project: &ProjectRef) -> Result<ProjectIdentity> {
        info!(project = %project, "loading project metadata from GitHub");

        let query = match project.owner_type {
            OwnerType::Org => RESOLVE_ORG_PROJECT,
            OwnerType::User => RESOLVE_USER_PROJECT,
        };
        let data: ResolveData = self
            .client
            .execute(
                "resolve_project",
                query,
                json!({ "login": project.owner_login, "number": project.project_number }),
            )
            .await?;

        data.organization
            .or(data.user)
            .and_then(|owner| owner.project)
            .map(|p| ProjectIdentity::new(p.id))
            .ok_or_else(|| RepositoryError::ProjectNotFound(project.to_string()))
    }

    async fn fetch_field_configs_and_issues(
        &mut self,
        source: &ProjectIdentity,
        target: &ProjectIdentity,
    ) -> Result<ProjectSnapshot> {
        info!("loading project data from GitHub");

        let mut source_pages: Option<ProjectPages> = None;
        let mut target_pages: Option<ProjectPages> = None;
        let mut source_cursor: Option<String> = None;
        let mut target_cursor: Option<String> = None;
        let (mut source_more, mut target_more) = (true, true);
        let mut page = 0;

        while source_more || target_more {
            page += 1;
            debug!(page, source_more, target_more, "loading page");

            let data: ProjectPairData = self
                .client
                .execute(
                    "fetch_projects",
                    PROJECT_PAIR_PAGE,
                    json!({
                        "sourceId": source.as_str(),
                        "targetId": target.as_str(),
                        "sourceCursor": source_cursor,
                        "targetCursor": target_cursor,
                        "withSource": source_more,
                        "withTarget": target_more,
                    }),
                )
                .await?;

            if source_more {
                let node = data
                    .source
                    .ok_or_else(|| RepositoryError::ProjectNotFound(source.to_string()))?;
                source_more = node.items.page_info.has_next_page;
                source_cursor = node.items.page_info.end_cursor.clone();
                match source_pages.as_mut() {
                    Some(p) => p.extend(node),
                    None => source_pages = Some(ProjectPages::new(node)),
                }
            }
            if target_more {
                let node = data
                    .target
                    .ok_or_else(|| RepositoryError::ProjectNotFound(target.to_string()))?;
                target_more = node.items.page_info.has_next_page;
                target_cursor = node.items.page_info.end_cursor.clone();
                match target_pages.as_mut() {
                    Some(p) => p.extend(node),
                    None => target_pages = Some(ProjectPages::new(node)),
                }
            }
        }

        if let Some(pages) = source_pages {
            self.store(source, pages);
        }
        if let Some(pages) = target_pages {
            self.store(target, pages);
        }

        let source_project = self
            .cache
            .get(source)
            .ok_or_else(|| RepositoryError::ProjectNotFound(source.to_string()))?;
        let target_project = self
            .cache
            .get(target)
            .ok_or_else(|| RepositoryError::ProjectNotFound(target.to_string()))?;

        let snapshot = ProjectSnapshot {
            source_configs: source_project.configs.clone(),
            target_configs: target_project.configs.clone(),
            source_issues: source_project.issue_urls(),
            target_issues: target_project.issue_urls(),
        };

        info!(
            source_issues = snapshot.source_issues.len(),
            target_issues = snapshot.target_issues.len(),
            pages_loaded = page,
            "completed loading project data"
        );
        Ok(snapshot)
    }

    async fn fetch_field_values(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        configs: &[FieldConfig],
    ) -> Result<Vec<ProjectField>> {
        let cached = self.ensure_loaded(project).await?;
        let item = cached
            .item(issue_url)
            .ok_or_else(|| RepositoryError::IssueNotInProject {
                issue: issue_url.to_string(),
                project: project.to_string(),
            })?;

        Ok(item
            .values
            .iter()
            .filter(|v| configs.iter().any(|c| c.name == v.name))
            .cloned()
            .collect())
    }

    async fn update_field(
        &mut self,
        project: &ProjectIdentity,
        issue_url: &str,
        field: &ProjectField,
        dry_run: bool,
    ) -> Result<()> {
        let cached = self.ensure_loaded(project).await?;
        let write = plan_write(cached, issue_url, field)?;

        if dry_run {
            info!(
                issue = issue_url,
                field = %field.name,
                old = %write.old_value,
                new = %field.value,
                "would update field (dry run)"
            );
            return Ok(());
        }

        debug!(
            issue = issue_url,
            field = %field.name,
            old = %write.old_value,
            new = %field.value,
            "updating field value"
        );

        let _: Value = self
            .client
            .execute(
                "update_field",
                UPDATE_FIELD_VALUE,
                json!({
                    "projectId": project.as_str(),
                    "itemId": write.item_id,
                    "fieldId": write.field_id,
                    "value": write.value,
                }),
            )
            .await?;

        self.cache.record_value(project, issue_url, field);
        Ok(())
    }

    async fn fetch_issue_title(&mut self, issue_url: &str) -> Result<String> {
        if let Some(title) = self.cache.title(issue_url) {
            return Ok(title.to_string());
        }

        let (owner, repo, number) = parse_issue_url(issue_url)?;
        debug!(owner = %owner, repo = %repo, number, "loading issue title from GitHub (cache miss)");

        let data: IssueTitleData = self
            .client
            .execute(
                "fetch_issue_title",
                ISSUE_TITLE,
                json!({ "owner": owner, "repo": repo, "number": number }),
            )
            .await?;
        let title = data
            .repository
            .and_then(|r| r.issue)
            .map(|i| i.title)
            .ok_or_else(|| RepositoryError::Other(format!("issue {issue_url} not found")))?;

        self.cache.remember_title(issue_url, title.clone());
        Ok(title)
    }
}

/// Accumulates the pages of one board.
struct ProjectPages {
    fields: Vec<FieldConfigNode>,
    items: Vec<ItemNode>,
}

impl ProjectPages {
    fn new(node: ProjectNode) -> Self {
        Self {
            fields: node.fields.nodes,
            items: node.items.nodes,
        }
    }

    fn extend(&mut self, node: ProjectNode) {
        self.items.extend(node.items.nodes);
    }

    /// Convert to the cached form plus the (url, title) pairs seen. Items that
    /// are not issues are dropped.
    fn into_cached(self, id: ProjectIdentity) -> (CachedProject, Vec<(String, String)>) {
        let configs = convert_field_configs(self.fields);
        let mut titles = Vec::new();
        let items = self
            .items
            .into_iter()
            .filter_map(|item| {
                let (cached, title) = convert_item(item)?;
                titles.push((cached.issue_url.clone(), title));
                Some(cached)
            })
            .collect();
        (CachedProject::new(id, configs, items), titles)
    }
}

fn convert_field_configs(nodes: Vec<FieldConfigNode>) -> Vec<FieldConfig> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            FieldConfigNode::ProjectV2Field {
                id,
                name,
                data_type,
            } if data_type == "DATE" => Some(FieldConfig::date(id, name)),
            FieldConfigNode::ProjectV2SingleSelectField { id, name, options } => {
                Some(FieldConfig::single_select(
                    id,
                    name,
                    options
                        .into_iter()
                        .map(|o| SelectOption {
                            id: o.id,
                            name: o.name,
                        })
                        .collect(),
                ))
            }
            _ => None,
        })
        .collect()
}

fn convert_item(item: ItemNode) -> Option<(CachedItem, String)> {
    let (url, title) = match item.content? {
        ContentNode::Issue { url, title } => (url, title),
        ContentNode::Other => return None,
    };

    let values = item
        .field_values
        .nodes
        .into_iter()
        .filter_map(|node| {
            let (field, value) = match node {
                FieldValueNode::ProjectV2ItemFieldDateValue { date, field } => {
                    (field, date.map(FieldValue::Date).unwrap_or_default())
                }
                FieldValueNode::ProjectV2ItemFieldSingleSelectValue { name, field } => {
                    (field, name.map(FieldValue::Text).unwrap_or_default())
                }
                FieldValueNode::Unsupported => return None,
            };
            let name = field.name.filter(|n| !n.is_empty())?;
            Some(ProjectField::new(field.id.unwrap_or_default(), name, value))
        })
        .collect();

    Some((
        CachedItem {
            item_id: item.id,
            issue_url: url,
            values,
        },
        title,
    ))
}

/// IDs and payload for one field write.
#[derive(Debug, PartialEq)]
struct PlannedWrite {
    item_id: String,
    field_id: String,
    value: Value,
    old_value: FieldValue,
}

fn plan_write(project: &CachedProject, issue_url: &str, field: &ProjectField) -> Result<PlannedWrite> {
    let item = project
        .item(issue_url)
        .ok_or_else(|| RepositoryError::IssueNotInProject {
            issue: issue_url.to_string(),
            project: project.id.to_string(),
        })?;
    let config = project
        .config(&field.name)
        .ok_or_else(|| RepositoryError::FieldNotFound {
            field: field.name.clone(),
            project: project.id.to_string(),
        })?;

    let value = match (config.kind, &field.value) {
        (FieldKind::Date, FieldValue::Date(date)) => {
            json!({ "date": date.format("%Y-%m-%d").to_string() })
        }
        (FieldKind::SingleSelect, FieldValue::Text(option)) => {
            let option_id =
                config
                    .option_id(option)
                    .ok_or_else(|| RepositoryError::OptionNotFound {
                        option: option.clone(),
                        field: field.name.clone(),
                    })?;
            json!({ "singleSelectOptionId": option_id })
        }
        (_, FieldValue::Absent) => {
            return Err(RepositoryError::UnsupportedValue {
                field: field.name.clone(),
            })
        }
        (kind, value) => {
            return Err(RepositoryError::KindMismatch {
                field: field.name.clone(),
                kind,
                value: value.to_string(),
            })
        }
    };

    Ok(PlannedWrite {
        item_id: item.item_id.clone(),
        field_id: config.id.clone(),
        value,
        old_value: item.value_of(&field.name),
    })
}

/// Split `https://github.com/{owner}/{repo}/issues/{number}`.
fn parse_issue_url(issue_url: &str) -> Result<(String, String, u32)> {
    let invalid = || RepositoryError::InvalidIssueUrl(issue_url.to_string());
    let path = issue_url
        .trim()
        .strip_prefix("https://github.com/")
        .ok_or_else(invalid)?;
    let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    match parts.as_slice() {
        [owner, repo, "issues", number] => {
            let number = number.parse::<u32>().map_err(|_| invalid())?;
            Ok((owner.to_string(), repo.to_string(), number))
        }
        _ => Err(invalid()),
    }
}
