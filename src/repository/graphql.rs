use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::retry::{with_retry, RetryConfig};
use super::Result;
use crate::error::RepositoryError;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

pub const RESOLVE_ORG_PROJECT: &str = r#"query($login: String!, $number: Int!) {
  organization(login: $login) { projectV2(number: $number) { id } }
}"#;

pub const RESOLVE_USER_PROJECT: &str = r#"query($login: String!, $number: Int!) {
  user(login: $login) { projectV2(number: $number) { id } }
}"#;

macro_rules! project_fragments {
    () => {
        r#"
fragment FieldConfig on ProjectV2FieldConfiguration {
  __typename
  ... on ProjectV2Field { id name dataType }
  ... on ProjectV2SingleSelectField { id name options { id name } }
}
fragment ItemPage on ProjectV2ItemConnection {
  pageInfo { hasNextPage endCursor }
  nodes {
    id
    content { __typename ... on Issue { url title } }
    fieldValues(first: 100) {
      nodes {
        __typename
        ... on ProjectV2ItemFieldDateValue {
          date
          field { ... on ProjectV2FieldCommon { id name } }
        }
        ... on ProjectV2ItemFieldSingleSelectValue {
          name
          field { ... on ProjectV2FieldCommon { id name } }
        }
      }
    }
  }
}"#
    };
}

/// Both boards in one round-trip. Each board has its own cursor, and a board
/// that has run out of pages is left out via `@include`.
pub const PROJECT_PAIR_PAGE: &str = concat!(
    r#"query($sourceId: ID!, $targetId: ID!, $sourceCursor: String, $targetCursor: String, $withSource: Boolean!, $withTarget: Boolean!) {
  source: node(id: $sourceId) @include(if: $withSource) {
    ... on ProjectV2 {
      fields(first: 100) { nodes { ...FieldConfig } }
      items(first: 100, after: $sourceCursor) { ...ItemPage }
    }
  }
  target: node(id: $targetId) @include(if: $withTarget) {
    ... on ProjectV2 {
      fields(first: 100) { nodes { ...FieldConfig } }
      items(first: 100, after: $targetCursor) { ...ItemPage }
    }
  }
}"#,
    project_fragments!()
);

pub const PROJECT_PAGE: &str = concat!(
    r#"query($projectId: ID!, $cursor: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: 100) { nodes { ...FieldConfig } }
      items(first: 100, after: $cursor) { ...ItemPage }
    }
  }
}"#,
    project_fragments!()
);

pub const UPDATE_FIELD_VALUE: &str = r#"mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: ProjectV2FieldValue!) {
  updateProjectV2ItemFieldValue(input: {projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: $value}) {
    projectV2Item { id }
  }
}"#;

pub const ISSUE_TITLE: &str = r#"query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) { issue(number: $number) { title } }
}"#;

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResolveData {
    #[serde(default)]
    pub organization: Option<OwnerNode>,
    #[serde(default)]
    pub user: Option<OwnerNode>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerNode {
    #[serde(rename = "projectV2")]
    pub project: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
pub struct IdNode {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectPairData {
    #[serde(default)]
    pub source: Option<ProjectNode>,
    #[serde(default)]
    pub target: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectData {
    pub node: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectNode {
    pub fields: Nodes<FieldConfigNode>,
    pub items: ItemConnection,
}

#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum FieldConfigNode {
    ProjectV2Field {
        id: String,
        name: String,
        #[serde(rename = "dataType")]
        data_type: String,
    },
    ProjectV2SingleSelectField {
        id: String,
        name: String,
        #[serde(default)]
        options: Vec<OptionNode>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct OptionNode {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemNode {
    pub id: String,
    pub content: Option<ContentNode>,
    #[serde(rename = "fieldValues")]
    pub field_values: Nodes<FieldValueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum ContentNode {
    Issue { url: String, title: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum FieldValueNode {
    ProjectV2ItemFieldDateValue {
        date: Option<NaiveDate>,
        #[serde(default)]
        field: FieldRef,
    },
    ProjectV2ItemFieldSingleSelectValue {
        name: Option<String>,
        #[serde(default)]
        field: FieldRef,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize, Default)]
pub struct FieldRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueTitleData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub issue: Option<IssueTitleNode>,
}

#[derive(Debug, Deserialize)]
pub struct IssueTitleNode {
    pub title: String,
}

/// Thin GraphQL-over-HTTP client: bearer auth, per-request timeout, retries
/// for transient failures and rate limits.
pub struct GraphQlClient {
    http: Client,
    endpoint: String,
    token: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl GraphQlClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("project-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
            timeout,
            retry,
        })
    }

    /// Run a query or mutation and decode its `data`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        with_retry(&self.retry, operation, || self.send(operation, &body)).await
    }

    async fn send<T: DeserializeOwned>(&self, operation: &str, body: &Value) -> Result<T> {
        trace!(operation, request = %body, "GraphQL request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().await?;
        trace!(operation, status = status.as_u16(), response = %text, "GraphQL response");

        match status {
            StatusCode::OK => decode_response(&text),
            StatusCode::UNAUTHORIZED => Err(RepositoryError::Auth),
            StatusCode::TOO_MANY_REQUESTS => Err(RepositoryError::RateLimited { retry_after }),
            StatusCode::FORBIDDEN
                if retry_after.is_some() || text.to_lowercase().contains("rate limit") =>
            {
                Err(RepositoryError::RateLimited { retry_after })
            }
            status => Err(RepositoryError::Status {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

/// Decode a 200 response body: surface `errors`, then require `data`.
pub fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let response: GraphQlResponse<T> = serde_json::from_str(text)?;
    if !response.errors.is_empty() {
        if response
            .errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("RATE_LIMITED"))
        {
            return Err(RepositoryError::RateLimited { retry_after: None });
        }
        let message = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RepositoryError::GraphQl(message));
    }
    response.data.ok_or(RepositoryError::MissingData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data() {
        let data: ResolveData = decode_response(
            r#"{"data":{"organization":{"projectV2":{"id":"PVT_1"}}}}"#,
        )
        .unwrap();
        assert_eq!(data.organization.unwrap().project.unwrap().id, "PVT_1");
        assert!(data.user.is_none());
    }

    #[test]
    fn joins_graphql_errors() {
        let err = decode_response::<ResolveData>(
            r#"{"data":null,"errors":[{"message":"first"},{"message":"second"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "GraphQL error: first; second");
    }

    #[test]
    fn rate_limit_error_type_is_recognised() {
        let err = decode_response::<ResolveData>(
            r#"{"errors":[{"type":"RATE_LIMITED","message":"API rate limit exceeded"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RepositoryError::RateLimited { .. }));
    }

    #[test]
    fn missing_data_is_an_error() {
        let err = decode_response::<ResolveData>(r#"{}"#).unwrap_err();
        assert!(matches!(err, RepositoryError::MissingData));
    }

    #[test]
    fn unknown_typenames_fall_through() {
        let nodes: Vec<FieldConfigNode> = serde_json::from_str(
            r#"[
                {"__typename":"ProjectV2IterationField"},
                {"__typename":"ProjectV2Field","id":"F1","name":"Start","dataType":"DATE"}
            ]"#,
        )
        .unwrap();
        assert!(matches!(nodes[0], FieldConfigNode::Unsupported));
        assert!(matches!(nodes[1], FieldConfigNode::ProjectV2Field { .. }));
    }

    #[test]
    fn queries_carry_their_fragments() {
        assert!(PROJECT_PAIR_PAGE.contains("fragment ItemPage"));
        assert!(PROJECT_PAGE.contains("fragment FieldConfig"));
    }
}
