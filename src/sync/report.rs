use std::fmt;

/// An issue whose sync stopped early. The run itself carried on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFailure {
    pub issue_url: String,
    pub message: String,
}

/// Outcome counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub issues_processed: usize,
    /// Fields written, or that would have been written in a dry run.
    pub fields_updated: usize,
    pub fields_unchanged: usize,
    pub mappings_skipped: usize,
    pub failures: Vec<IssueFailure>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub(crate) fn record_failure(&mut self, issue_url: &str, message: impl Into<String>) {
        self.failures.push(IssueFailure {
            issue_url: issue_url.to_string(),
            message: message.into(),
        });
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issues processed, {} fields updated, {} unchanged, {} mappings skipped, {} failed issues",
            self.issues_processed,
            self.fields_updated,
            self.fields_unchanged,
            self.mappings_skipped,
            self.failures.len()
        )
    }
}
