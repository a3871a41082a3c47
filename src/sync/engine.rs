use tracing::{debug, error, info, warn};

use super::plan::{common_issues, index_by_name, plan_field_update, FieldPlan};
use super::report::SyncReport;
use crate::error::SyncError;
use crate::model::mapping::FieldMapping;
use crate::model::project::{ProjectIdentity, ProjectRef};
use crate::repository::{ProjectRepository, ProjectSnapshot};

pub const DEFAULT_BATCH_SIZE: usize = 10;

const UNKNOWN_TITLE: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncOptions {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// State shared by every issue of one run.
struct Run {
    source: ProjectIdentity,
    target: ProjectIdentity,
    snapshot: ProjectSnapshot,
}

/// Copies mapped field values from a source board to a target board.
pub struct SyncEngine<R> {
    repo: R,
    options: SyncOptions,
}

impl<R: ProjectRepository> SyncEngine<R> {
    pub fn new(repo: R, options: SyncOptions) -> Self {
        Self { repo, options }
    }

    #[cfg(test)]
    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Sync `issues`, or every issue on both boards when `issues` is empty.
    ///
    /// Only identity resolution, the board fetch and an empty common-issue
    /// set abort the run. Per-issue problems are logged and collected in the
    /// returned report.
    pub async fn sync(
        &mut self,
        source: &ProjectRef,
        target: &ProjectRef,
        issues: &[String],
        mappings: &[FieldMapping],
    ) -> Result<SyncReport, SyncError> {
        let run = self.prepare(source, target).await?;

        let working_set = if issues.is_empty() {
            let common = common_issues(&run.snapshot.source_issues, &run.snapshot.target_issues);
            if common.is_empty() {
                error!(
                    source_issues = run.snapshot.source_issues.len(),
                    target_issues = run.snapshot.target_issues.len(),
                    "no common issues, aborting"
                );
                return Err(SyncError::NoCommonIssues);
            }
            info!(
                count = common.len(),
                source_issues = run.snapshot.source_issues.len(),
                target_issues = run.snapshot.target_issues.len(),
                "found common issues"
            );
            common
        } else {
            issues.to_vec()
        };

        let mut report = SyncReport::default();
        // A zero batch size runs one issue at a time.
        let batch_size = self.options.batch_size.max(1);
        let batches = working_set.len().div_ceil(batch_size);

        for (index, batch) in working_set.chunks(batch_size).enumerate() {
            debug!(batch = index + 1, of = batches, size = batch.len(), "processing batch");
            for issue_url in batch {
                self.sync_issue(&run, issue_url, mappings, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn prepare(&mut self, source: &ProjectRef, target: &ProjectRef) -> Result<Run, SyncError> {
        let source_id = self.resolve("source", source).await?;
        let target_id = self.resolve("target", target).await?;

        let snapshot = self
            .repo
            .fetch_field_configs_and_issues(&source_id, &target_id)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to load project data, aborting");
                SyncError::FetchFailed(e)
            })?;

        Ok(Run {
            source: source_id,
            target: target_id,
            snapshot,
        })
    }

    async fn resolve(
        &mut self,
        role: &'static str,
        project: &ProjectRef,
    ) -> Result<ProjectIdentity, SyncError> {
        match self.repo.resolve_project_identity(project).await {
            Ok(id) => {
                debug!(role, project = %project, id = %id, "resolved project");
                Ok(id)
            }
            Err(e) => {
                error!(role, project = %project, error = %e, "failed to resolve project, aborting");
                Err(SyncError::IdentityResolutionFailed {
                    role,
                    reference: project.clone(),
                    source: e,
                })
            }
        }
    }

    async fn sync_issue(
        &mut self,
        run: &Run,
        issue_url: &str,
        mappings: &[FieldMapping],
        report: &mut SyncReport,
    ) {
        let title = match self.repo.fetch_issue_title(issue_url).await {
            Ok(title) => title,
            Err(e) => {
                warn!(issue = issue_url, error = %e, "failed to get issue title");
                UNKNOWN_TITLE.to_string()
            }
        };
        info!(url = issue_url, title = %title, "processing issue");
        report.issues_processed += 1;

        let source_fields = match self
            .repo
            .fetch_field_values(&run.source, issue_url, &run.snapshot.source_configs)
            .await
        {
            Ok(fields) => fields,
            Err(e) => {
                error!(issue = issue_url, error = %e, "failed to get source field values");
                report.record_failure(issue_url, format!("failed to get source field values: {e}"));
                return;
            }
        };
        let target_fields = match self
            .repo
            .fetch_field_values(&run.target, issue_url, &run.snapshot.target_configs)
            .await
        {
            Ok(fields) => fields,
            Err(e) => {
                error!(issue = issue_url, error = %e, "failed to get target field values");
                report.record_failure(issue_url, format!("failed to get target field values: {e}"));
                return;
            }
        };
        let target_by_name = index_by_name(&target_fields);

        for mapping in mappings {
            let plan = plan_field_update(
                mapping,
                &source_fields,
                &target_by_name,
                &run.snapshot.target_configs,
            );
            match plan {
                FieldPlan::MissingSource => {
                    warn!(
                        issue = issue_url,
                        source_field = %mapping.source_field,
                        "source field not found"
                    );
                    report.mappings_skipped += 1;
                }
                FieldPlan::Unchanged { value } => {
                    debug!(
                        issue = issue_url,
                        field = %mapping.target_field,
                        value = %value,
                        "value unchanged, skipping"
                    );
                    report.fields_unchanged += 1;
                }
                FieldPlan::Update { field, previous } => {
                    debug!(
                        issue = issue_url,
                        field = %field.name,
                        old = %previous,
                        new = %field.value,
                        dry_run = self.options.dry_run,
                        "updating field"
                    );
                    if let Err(e) = self
                        .repo
                        .update_field(&run.target, issue_url, &field, self.options.dry_run)
                        .await
                    {
                        error!(
                            issue = issue_url,
                            field = %field.name,
                            error = %e,
                            "failed to update field"
                        );
                        report.record_failure(
                            issue_url,
                            format!("failed to update field {:?}: {e}", field.name),
                        );
                        return;
                    }
                    report.fields_updated += 1;
                }
            }
        }
    }
}
