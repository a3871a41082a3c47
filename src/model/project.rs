use std::fmt;
use std::str::FromStr;

use reqwest::Url;

use crate::error::ReferenceError;

pub const GITHUB_HOST: &str = "github.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerType {
    Org,
    User,
}

impl OwnerType {
    /// Path segment used in project URLs (`orgs` / `users`).
    pub fn path_segment(self) -> &'static str {
        match self {
            OwnerType::Org => "orgs",
            OwnerType::User => "users",
        }
    }

    fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "orgs" => Some(OwnerType::Org),
            "users" => Some(OwnerType::User),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerType::Org => write!(f, "org"),
            OwnerType::User => write!(f, "user"),
        }
    }
}

/// Accepts the flag spelling (`org`, `user`) as well as the URL segment
/// (`orgs`, `users`).
impl FromStr for OwnerType {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "org" | "orgs" | "organization" => Ok(OwnerType::Org),
            "user" | "users" => Ok(OwnerType::User),
            _ => Err(ReferenceError::UnknownOwnerType(s.to_string())),
        }
    }
}

/// A project board reference: who owns it and its number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub owner_type: OwnerType,
    pub owner_login: String,
    pub project_number: u32,
}

impl ProjectRef {
    pub fn new(
        owner_type: OwnerType,
        owner_login: impl Into<String>,
        project_number: u32,
    ) -> Result<Self, ReferenceError> {
        let owner_login = owner_login.into().trim().to_string();
        if owner_login.is_empty() {
            return Err(ReferenceError::EmptyOwnerLogin);
        }
        if project_number == 0 {
            return Err(ReferenceError::InvalidProjectNumber("0".into()));
        }
        Ok(Self {
            owner_type,
            owner_login,
            project_number,
        })
    }

    /// Parse `https://github.com/{orgs|users}/{login}/projects/{number}`.
    pub fn parse_url(input: &str) -> Result<Self, ReferenceError> {
        let url = Url::parse(input.trim()).map_err(|e| ReferenceError::InvalidUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "https" || url.host_str() != Some(GITHUB_HOST) {
            return Err(ReferenceError::NotGitHub(format!(
                "{}://{}",
                url.scheme(),
                url.host_str().unwrap_or_default()
            )));
        }

        let parts: Vec<&str> = url.path().trim_matches('/').split('/').collect();
        if parts.len() != 4 {
            return Err(ReferenceError::SegmentCount(parts.len()));
        }

        let owner_type = OwnerType::from_path_segment(parts[0])
            .ok_or_else(|| ReferenceError::UnknownOwnerType(parts[0].to_string()))?;

        if parts[2] != "projects" {
            return Err(ReferenceError::MissingProjectsSegment(parts[2].to_string()));
        }

        let project_number = parse_project_number(parts[3])?;

        Self::new(owner_type, parts[1], project_number)
    }

    /// Canonical board URL.
    pub fn url(&self) -> String {
        format!(
            "https://{GITHUB_HOST}/{}/{}/projects/{}",
            self.owner_type.path_segment(),
            self.owner_login,
            self.project_number
        )
    }
}

fn parse_project_number(raw: &str) -> Result<u32, ReferenceError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReferenceError::InvalidProjectNumber(raw.to_string()));
    }
    match raw.parse::<u32>() {
        Ok(n) if n > 0 && n <= i32::MAX as u32 => Ok(n),
        _ => Err(ReferenceError::InvalidProjectNumber(raw.to_string())),
    }
}

impl FromStr for ProjectRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_url(s)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Opaque node ID the API hands back for a board. Every call after
/// resolution is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectIdentity(String);

impl ProjectIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_org_project_url() {
        let r = ProjectRef::parse_url("https://github.com/orgs/testorg/projects/123").unwrap();
        assert_eq!(r.owner_type, OwnerType::Org);
        assert_eq!(r.owner_login, "testorg");
        assert_eq!(r.project_number, 123);
    }

    #[test]
    fn parse_user_project_url_with_trailing_slash() {
        let r = ProjectRef::parse_url("https://github.com/users/testuser/projects/456/").unwrap();
        assert_eq!(r.owner_type, OwnerType::User);
        assert_eq!(r.owner_login, "testuser");
        assert_eq!(r.project_number, 456);
    }

    #[test]
    fn url_round_trips() {
        for owner_type in [OwnerType::Org, OwnerType::User] {
            for (login, number) in [("acme", 1u32), ("some-user", 42), ("x", 99_999)] {
                let original = ProjectRef::new(owner_type, login, number).unwrap();
                let parsed: ProjectRef = original.url().parse().unwrap();
                assert_eq!(parsed, original);
            }
        }
    }

    #[test]
    fn rejects_non_github_host() {
        let err = ProjectRef::parse_url("https://gitlab.com/orgs/test/projects/123").unwrap_err();
        assert!(matches!(err, ReferenceError::NotGitHub(_)));
        assert!(err.to_string().contains("not a GitHub URL"));
    }

    #[test]
    fn rejects_plain_http() {
        let err = ProjectRef::parse_url("http://github.com/orgs/test/projects/1").unwrap_err();
        assert!(matches!(err, ReferenceError::NotGitHub(_)));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = ProjectRef::parse_url("https://github.com/orgs/test/projects").unwrap_err();
        assert_eq!(err, ReferenceError::SegmentCount(3));

        let err =
            ProjectRef::parse_url("https://github.com/orgs/test/projects/1/views/2").unwrap_err();
        assert_eq!(err, ReferenceError::SegmentCount(6));
    }

    #[test]
    fn rejects_unknown_owner_type() {
        let err = ProjectRef::parse_url("https://github.com/wrong/test/projects/123").unwrap_err();
        assert_eq!(err, ReferenceError::UnknownOwnerType("wrong".into()));
        assert!(err.to_string().contains("invalid owner type"));
    }

    #[test]
    fn rejects_missing_projects_segment() {
        let err = ProjectRef::parse_url("https://github.com/orgs/test/wrong/123").unwrap_err();
        assert_eq!(err, ReferenceError::MissingProjectsSegment("wrong".into()));
    }

    #[test]
    fn rejects_non_numeric_project_number() {
        for bad in ["abc", "0", "-3", "+4", "1.5"] {
            let url = format!("https://github.com/orgs/test/projects/{bad}");
            let err = ProjectRef::parse_url(&url).unwrap_err();
            assert_eq!(err, ReferenceError::InvalidProjectNumber(bad.into()), "{bad}");
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = ProjectRef::parse_url(":").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidUrl { .. }));
    }

    #[test]
    fn triple_form_validates() {
        assert_eq!(
            ProjectRef::new(OwnerType::Org, "  ", 3).unwrap_err(),
            ReferenceError::EmptyOwnerLogin
        );
        assert!(matches!(
            ProjectRef::new(OwnerType::User, "me", 0).unwrap_err(),
            ReferenceError::InvalidProjectNumber(_)
        ));
        let r = ProjectRef::new(OwnerType::User, "me", 5).unwrap();
        assert_eq!(r.to_string(), "https://github.com/users/me/projects/5");
    }

    #[test]
    fn owner_type_from_flag_spelling() {
        assert_eq!("org".parse::<OwnerType>().unwrap(), OwnerType::Org);
        assert_eq!("Users".parse::<OwnerType>().unwrap(), OwnerType::User);
        assert!("team".parse::<OwnerType>().is_err());
    }
}
