//! Blocker issue reporting
//!
//! Failed executors are reported through an [`IssueReporter`]. Reporting is
//! best-effort: the orchestrator logs reporter failures and moves on.

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Issue to file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub title: String,
    /// Markdown
    pub body: String,
    pub labels: Vec<String>,
}

/// Result of filing an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOutcome {
    pub number: Option<u64>,
    pub url: Option<String>,
    /// Nothing was filed remotely
    pub dry_run: bool,
}

#[async_trait]
pub trait IssueReporter: Send + Sync {
    async fn create_issue(&self, request: IssueRequest) -> Result<IssueOutcome>;
}

/// Writes issues to the log instead of a tracker
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIssueReporter;

#[async_trait]
impl IssueReporter for LogIssueReporter {
    async fn create_issue(&self, request: IssueRequest) -> Result<IssueOutcome> {
        debug!(body = %request.body, "LogIssueReporter::create_issue: called");
        info!(title = %request.title, labels = ?request.labels, "Blocker issue (dry run)");
        Ok(IssueOutcome {
            number: None,
            url: None,
            dry_run: true,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_reporter_is_dry_run() {
        let outcome = LogIssueReporter
            .create_issue(IssueRequest {
                title: "[Blocker] x".to_string(),
                body: "body".to_string(),
                labels: vec!["ai-blocker".to_string()],
            })
            .await
            .unwrap();
        assert!(outcome.dry_run);
        assert!(outcome.number.is_none());
    }
}
