use std::collections::HashMap;

use crate::model::field::{FieldConfig, FieldValue, ProjectField};
use crate::model::project::ProjectIdentity;

/// One issue's item on a board with its current field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedItem {
    pub item_id: String,
    pub issue_url: String,
    pub values: Vec<ProjectField>,
}

impl CachedItem {
    pub fn value_of(&self, field_name: &str) -> FieldValue {
        self.values
            .iter()
            .find(|f| f.name == field_name)
            .map(|f| f.value.clone())
            .unwrap_or_default()
    }
}

/// A fetched board. Items keep board order; lookups by issue URL go through
/// an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProject {
    pub id: ProjectIdentity,
    pub configs: Vec<FieldConfig>,
    items: Vec<CachedItem>,
    by_url: HashMap<String, usize>,
}

impl CachedProject {
    /// An issue listed twice resolves to its first item.
    pub fn new(id: ProjectIdentity, configs: Vec<FieldConfig>, items: Vec<CachedItem>) -> Self {
        let mut by_url = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            by_url.entry(item.issue_url.clone()).or_insert(index);
        }
        Self {
            id,
            configs,
            items,
            by_url,
        }
    }

    pub fn item(&self, issue_url: &str) -> Option<&CachedItem> {
        self.by_url.get(issue_url).map(|&i| &self.items[i])
    }

    fn item_mut(&mut self, issue_url: &str) -> Option<&mut CachedItem> {
        let index = *self.by_url.get(issue_url)?;
        self.items.get_mut(index)
    }

    pub fn config(&self, field_name: &str) -> Option<&FieldConfig> {
        self.configs.iter().find(|c| c.name == field_name)
    }

    pub fn issue_urls(&self) -> Vec<String> {
        self.items.iter().map(|i| i.issue_url.clone()).collect()
    }
}

/// Per-run memo of fetched boards and issue titles, keyed by project
/// identity and issue URL. Dropped with the repository at the end of a run.
#[derive(Debug, Default)]
pub struct ProjectCache {
    projects: HashMap<ProjectIdentity, CachedProject>,
    titles: HashMap<String, String>,
}

impl ProjectCache {
    pub fn insert(&mut self, project: CachedProject) {
        self.projects.insert(project.id.clone(), project);
    }

    pub fn get(&self, id: &ProjectIdentity) -> Option<&CachedProject> {
        self.projects.get(id)
    }

    pub fn contains(&self, id: &ProjectIdentity) -> bool {
        self.projects.contains_key(id)
    }

    pub fn title(&self, issue_url: &str) -> Option<&str> {
        self.titles.get(issue_url).map(String::as_str)
    }

    pub fn remember_title(&mut self, issue_url: impl Into<String>, title: impl Into<String>) {
        self.titles.insert(issue_url.into(), title.into());
    }

    /// Reflect a successful write so later reads in the same run see it.
    pub fn record_value(&mut self, id: &ProjectIdentity, issue_url: &str, field: &ProjectField) {
        let Some(project) = self.projects.get_mut(id) else {
            return;
        };
        let field_id = project
            .config(&field.name)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| field.id.clone());
        let Some(item) = project.item_mut(issue_url) else {
            return;
        };
        match item.values.iter_mut().find(|v| v.name == field.name) {
            Some(existing) => existing.value = field.value.clone(),
            None => item
                .values
                .push(ProjectField::new(field_id, field.name.clone(), field.value.clone())),
        }
    }
}
