use std::time::Duration;

use thiserror::Error;

use crate::model::field::FieldKind;
use crate::model::project::ProjectRef;
use crate::repository::retry::{RetryDecision, RetryableError};

/// Why a project reference could not be turned into a [`ProjectRef`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("invalid URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("not a GitHub URL: expected https://github.com, got {0:?}")]
    NotGitHub(String),

    #[error("invalid project URL format: expected 4 path segments, got {0}")]
    SegmentCount(usize),

    #[error("invalid owner type {0:?}: expected orgs or users")]
    UnknownOwnerType(String),

    #[error("invalid URL format: expected 'projects' as third segment, got {0:?}")]
    MissingProjectsSegment(String),

    #[error("invalid project number {0:?}: expected a positive integer")]
    InvalidProjectNumber(String),

    #[error("owner login must not be empty")]
    EmptyOwnerLogin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("invalid field mapping format: {0:?} (expected source=target)")]
    InvalidFormat(String),

    #[error("invalid field mapping {0:?}: field names must not be empty")]
    EmptyName(String),
}

/// Failures reported by a [`crate::repository::ProjectRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GitHub authentication failed, check GITHUB_TOKEN")]
    Auth,

    #[error("GitHub API rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("no data in GraphQL response")]
    MissingData,

    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error("issue {issue} not found in project {project}")]
    IssueNotInProject { issue: String, project: String },

    #[error("field {field:?} not found in project {project}")]
    FieldNotFound { field: String, project: String },

    #[error("single select option {option:?} not found in target field {field:?}")]
    OptionNotFound { option: String, field: String },

    #[error("field {field:?} is a {kind} field and cannot hold value {value}")]
    KindMismatch {
        field: String,
        kind: FieldKind,
        value: String,
    },

    #[error("unsupported field value type for field {field:?}")]
    UnsupportedValue { field: String },

    #[error("invalid issue URL format: {0}")]
    InvalidIssueUrl(String),

    #[error("{0}")]
    Other(String),
}

impl RetryableError for RepositoryError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            RepositoryError::Http(e) if e.is_connect() || e.is_timeout() => RetryDecision::Retry,
            RepositoryError::Status { status, .. } if *status >= 500 => RetryDecision::Retry,
            RepositoryError::RateLimited { retry_after } => RetryDecision::RetryAfter(
                Duration::from_secs(retry_after.unwrap_or(60)),
            ),
            _ => RetryDecision::NoRetry,
        }
    }
}

/// Conditions that abort a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to get {role} project ID for {reference}: {source}")]
    IdentityResolutionFailed {
        role: &'static str,
        reference: ProjectRef,
        source: RepositoryError,
    },

    #[error("failed to get project field configs and issues: {0}")]
    FetchFailed(#[source] RepositoryError),

    #[error("no common issues found between source and target projects")]
    NoCommonIssues,
}
