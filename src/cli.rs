use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::model::mapping::{parse_field_mappings, FieldMapping};
use crate::model::project::{OwnerType, ProjectRef};
use crate::repository::github::GitHubRepository;
use crate::sync::{SyncEngine, SyncOptions, SyncReport};

/// Copy field values between GitHub Projects boards
#[derive(Parser, Debug)]
#[command(name = "project-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More output: -v for debug, -vv to also trace GraphQL traffic
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: <config dir>/project-sync/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy mapped field values from the source board to the target board
    SyncFields(SyncFieldsArgs),
}

#[derive(Args, Debug)]
pub struct SyncFieldsArgs {
    /// Source board URL, e.g. https://github.com/orgs/acme/projects/12
    #[arg(long, value_name = "URL", conflicts_with_all = ["source_owner_type", "source_owner", "source_number"])]
    pub source: Option<ProjectRef>,

    /// Source owner type (org or user)
    #[arg(long, value_name = "TYPE")]
    pub source_owner_type: Option<OwnerType>,

    /// Source owner login
    #[arg(long, value_name = "LOGIN")]
    pub source_owner: Option<String>,

    /// Source board number
    #[arg(long, value_name = "N")]
    pub source_number: Option<u32>,

    /// Target board URL
    #[arg(long, value_name = "URL", conflicts_with_all = ["target_owner_type", "target_owner", "target_number"])]
    pub target: Option<ProjectRef>,

    /// Target owner type (org or user)
    #[arg(long, value_name = "TYPE")]
    pub target_owner_type: Option<OwnerType>,

    /// Target owner login
    #[arg(long, value_name = "LOGIN")]
    pub target_owner: Option<String>,

    /// Target board number
    #[arg(long, value_name = "N")]
    pub target_number: Option<u32>,

    /// Issue URL to sync (repeatable)
    #[arg(long = "issue", value_name = "URL")]
    pub issues: Vec<String>,

    /// Field mapping as SOURCE=TARGET (repeatable)
    #[arg(long = "field-mapping", value_name = "SRC=DST", required = true)]
    pub field_mappings: Vec<String>,

    /// Sync every issue present on both boards
    #[arg(long)]
    pub auto_detect_issues: bool,

    /// Log what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Which issues a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueScope {
    Explicit(Vec<String>),
    AutoDetect,
}

impl SyncFieldsArgs {
    pub fn source_ref(&self) -> Result<ProjectRef> {
        board_ref(
            "source",
            self.source.as_ref(),
            self.source_owner_type,
            self.source_owner.as_deref(),
            self.source_number,
        )
    }

    pub fn target_ref(&self) -> Result<ProjectRef> {
        board_ref(
            "target",
            self.target.as_ref(),
            self.target_owner_type,
            self.target_owner.as_deref(),
            self.target_number,
        )
    }

    pub fn mappings(&self) -> Result<Vec<FieldMapping>> {
        parse_field_mappings(&self.field_mappings).context("Invalid --field-mapping")
    }

    /// Explicit `--issue` values win over `--auto-detect-issues`.
    pub fn issue_scope(&self) -> Result<IssueScope> {
        if !self.issues.is_empty() {
            if self.auto_detect_issues {
                warn!("--issue given, ignoring --auto-detect-issues");
            }
            return Ok(IssueScope::Explicit(self.issues.clone()));
        }
        if self.auto_detect_issues {
            return Ok(IssueScope::AutoDetect);
        }
        bail!("No issues specified. Pass --issue <URL> or --auto-detect-issues")
    }
}

fn board_ref(
    role: &str,
    url: Option<&ProjectRef>,
    owner_type: Option<OwnerType>,
    owner: Option<&str>,
    number: Option<u32>,
) -> Result<ProjectRef> {
    if let Some(url) = url {
        return Ok(url.clone());
    }
    match (owner_type, owner, number) {
        (Some(owner_type), Some(owner), Some(number)) => ProjectRef::new(owner_type, owner, number)
            .with_context(|| format!("Invalid {role} project")),
        (None, None, None) => bail!(
            "Missing {role} project. Pass --{role} <URL> or --{role}-owner-type, --{role}-owner and --{role}-number"
        ),
        _ => bail!(
            "Incomplete {role} project. --{role}-owner-type, --{role}-owner and --{role}-number must be given together"
        ),
    }
}

/// Run `sync-fields` to completion or until Ctrl-C.
pub async fn run_sync_fields(args: &SyncFieldsArgs, config: &AppConfig) -> Result<SyncReport> {
    let source = args.source_ref()?;
    let target = args.target_ref()?;
    let mappings = args.mappings()?;
    let scope = args.issue_scope()?;
    let token = config.token()?;

    let repo = GitHubRepository::from_settings(&config.github, &token)
        .context("Failed to set up GitHub client")?;
    let options = SyncOptions::new(args.dry_run).with_batch_size(config.sync.batch_size);
    let mut engine = SyncEngine::new(repo, options);

    let issues: &[String] = match &scope {
        IssueScope::Explicit(issues) => issues,
        IssueScope::AutoDetect => &[],
    };
    info!(
        source = %source,
        target = %target,
        mappings = mappings.len(),
        issues = issues.len(),
        dry_run = args.dry_run,
        "starting field sync"
    );

    let report = tokio::select! {
        result = engine.sync(&source, &target, issues, &mappings) => result?,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    };

    if report.has_failures() {
        for failure in &report.failures {
            warn!(issue = %failure.issue_url, "{}", failure.message);
        }
        warn!(dry_run = args.dry_run, "sync finished with failures: {report}");
    } else {
        info!(dry_run = args.dry_run, "sync finished: {report}");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const SRC: &str = "https://github.com/orgs/acme/projects/1";
    const DST: &str = "https://github.com/users/octocat/projects/2";

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("project-sync").chain(args.iter().copied()))
    }

    fn sync_args(args: &[&str]) -> SyncFieldsArgs {
        match parse(args).unwrap().command {
            Command::SyncFields(args) => args,
        }
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_urls_and_repeated_flags() {
        let cli = parse(&[
            "-vv",
            "sync-fields",
            "--source",
            SRC,
            "--target",
            DST,
            "--issue",
            "https://github.com/acme/app/issues/1",
            "--issue",
            "https://github.com/acme/app/issues/2",
            "--field-mapping",
            "start=Start date",
            "--field-mapping",
            "status = Status",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Command::SyncFields(args) = cli.command;
        assert!(args.dry_run);
        assert_eq!(args.source_ref().unwrap().owner_login, "acme");
        assert_eq!(args.target_ref().unwrap().owner_type, OwnerType::User);
        assert_eq!(
            args.mappings().unwrap(),
            vec![
                FieldMapping::new("start", "Start date"),
                FieldMapping::new("status", "Status"),
            ]
        );
        assert!(matches!(args.issue_scope().unwrap(), IssueScope::Explicit(v) if v.len() == 2));
    }

    #[test]
    fn parses_owner_triples() {
        let args = sync_args(&[
            "sync-fields",
            "--source-owner-type",
            "org",
            "--source-owner",
            "acme",
            "--source-number",
            "824",
            "--target-owner-type",
            "users",
            "--target-owner",
            "octocat",
            "--target-number",
            "5",
            "--field-mapping",
            "a=b",
            "--auto-detect-issues",
        ]);
        let source = args.source_ref().unwrap();
        assert_eq!(source.url(), "https://github.com/orgs/acme/projects/824");
        let target = args.target_ref().unwrap();
        assert_eq!(target.url(), "https://github.com/users/octocat/projects/5");
        assert_eq!(args.issue_scope().unwrap(), IssueScope::AutoDetect);
    }

    #[test]
    fn invalid_url_is_rejected_by_parser() {
        let err = parse(&[
            "sync-fields",
            "--source",
            "https://gitlab.com/orgs/acme/projects/1",
            "--target",
            DST,
            "--field-mapping",
            "a=b",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn url_and_triple_conflict() {
        let err = parse(&[
            "sync-fields",
            "--source",
            SRC,
            "--source-owner",
            "acme",
            "--target",
            DST,
            "--field-mapping",
            "a=b",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn field_mapping_is_required() {
        let err = parse(&["sync-fields", "--source", SRC, "--target", DST]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn missing_board_is_reported() {
        let args = sync_args(&["sync-fields", "--target", DST, "--field-mapping", "a=b"]);
        let err = args.source_ref().unwrap_err();
        assert!(err.to_string().contains("Missing source project"));
    }

    #[test]
    fn partial_triple_is_reported() {
        let args = sync_args(&[
            "sync-fields",
            "--source-owner",
            "acme",
            "--target",
            DST,
            "--field-mapping",
            "a=b",
        ]);
        let err = args.source_ref().unwrap_err();
        assert!(err.to_string().contains("Incomplete source project"));
    }

    #[test]
    fn zero_project_number_is_rejected() {
        let args = sync_args(&[
            "sync-fields",
            "--source-owner-type",
            "org",
            "--source-owner",
            "acme",
            "--source-number",
            "0",
            "--target",
            DST,
            "--field-mapping",
            "a=b",
        ]);
        assert!(args.source_ref().is_err());
    }

    #[test]
    fn malformed_mapping_fails() {
        let args = sync_args(&[
            "sync-fields",
            "--source",
            SRC,
            "--target",
            DST,
            "--field-mapping",
            "a=b=c",
            "--auto-detect-issues",
        ]);
        assert!(args.mappings().is_err());
    }

    #[test]
    fn no_issue_scope_fails() {
        let args = sync_args(&["sync-fields", "--source", SRC, "--target", DST, "--field-mapping", "a=b"]);
        let err = args.issue_scope().unwrap_err();
        assert!(err.to_string().contains("--auto-detect-issues"));
    }

    #[test]
    fn explicit_issues_win_over_auto_detect() {
        let args = sync_args(&[
            "sync-fields",
            "--source",
            SRC,
            "--target",
            DST,
            "--field-mapping",
            "a=b",
            "--issue",
            "https://github.com/acme/app/issues/9",
            "--auto-detect-issues",
        ]);
        assert_eq!(
            args.issue_scope().unwrap(),
            IssueScope::Explicit(vec!["https://github.com/acme/app/issues/9".to_string()])
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&[
            "sync-fields",
            "--source",
            SRC,
            "--target",
            DST,
            "--field-mapping",
            "a=b",
            "-v",
            "--config",
            "/tmp/ps.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ps.toml")));
    }
}
