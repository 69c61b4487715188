//! Publishing the finished report.
//!
//! The publish target is behind the [`Publisher`] trait:
//!
//! | Implementation | Target |
//! |----------------|--------|
//! | [`HttpPublisher`] | POSTs the submission as JSON to a broadcast endpoint |
//! | [`DirectoryPublisher`] | Writes `<permlink>.md` into a directory (dry runs) |
//!
//! A publish failure is fatal for the run. There are no retries.

use crate::error::{DigestError, Result};
use crate::models::Window;
use crate::utils::{ensure_writable_dir, slugify_title, truncate_for_log};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Fallback permlink stem when the title prefix has no sluggable characters.
const DEFAULT_PERMLINK_STEM: &str = "digest";

/// A top-level post to broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub author: String,
    pub permlink: String,
    /// Always empty: reports are top-level posts.
    pub parent_author: String,
    pub parent_permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: serde_json::Value,
}

/// Deterministic permlink: slug of the title prefix plus the window's start date.
///
/// Re-running the same day produces the same permlink.
pub fn report_permlink(title_prefix: &str, window: &Window) -> String {
    let slug = slugify_title(title_prefix);
    let stem = if slug.is_empty() { DEFAULT_PERMLINK_STEM } else { slug.as_str() };
    format!("{}-{}", stem, window.start.format("%Y-%m-%d"))
}

pub trait Publisher {
    async fn publish(&self, submission: &Submission) -> Result<()>;
}

/// Broadcast through an HTTP endpoint, authenticating with the posting credential.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: Url,
    posting: String,
}

impl HttpPublisher {
    pub fn new(endpoint: &str, posting: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DigestError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(HttpPublisher {
            client,
            endpoint: Url::parse(endpoint)?,
            posting: posting.to_string(),
        })
    }
}

impl Publisher for HttpPublisher {
    #[instrument(level = "info", skip_all, fields(permlink = %submission.permlink, endpoint = %self.endpoint))]
    async fn publish(&self, submission: &Submission) -> Result<()> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.posting)
            .json(submission)
            .send()
            .await
            .map_err(|e| DigestError::Publish(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DigestError::Publish(format!(
                "endpoint returned {status}: {}",
                truncate_for_log(&body, 300)
            )));
        }

        info!(%status, "Published report");
        Ok(())
    }
}

/// Write the report to `<dir>/<permlink>.md` instead of broadcasting it.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    pub dir: PathBuf,
}

impl Publisher for DirectoryPublisher {
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display(), permlink = %submission.permlink))]
    async fn publish(&self, submission: &Submission) -> Result<()> {
        ensure_writable_dir(&self.dir)
            .await
            .map_err(|e| DigestError::Publish(e.to_string()))?;

        let path = self.dir.join(format!("{}.md", submission.permlink));
        let contents = format!("# {}\n\n{}\n", submission.title, submission.body);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| DigestError::Publish(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "Wrote report (dry run)");
        Ok(())
    }
}

/// Publisher chosen at startup from settings and command line.
#[derive(Debug, Clone)]
pub enum ReportPublisher {
    Http(HttpPublisher),
    Directory(DirectoryPublisher),
}

impl Publisher for ReportPublisher {
    async fn publish(&self, submission: &Submission) -> Result<()> {
        match self {
            ReportPublisher::Http(p) => p.publish(submission).await,
            ReportPublisher::Directory(p) => p.publish(submission).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_created;

    fn window() -> Window {
        Window {
            start: parse_created("2018-03-04T00:00:00").unwrap(),
            end: parse_created("2018-03-05T00:00:00").unwrap(),
        }
    }

    fn submission() -> Submission {
        Submission {
            author: "bot".into(),
            permlink: "utopian-daily-2018-03-04".into(),
            parent_author: String::new(),
            parent_permlink: "cn".into(),
            title: "Utopian daily 2018-03-05".into(),
            body: "table".into(),
            json_metadata: serde_json::json!({"tags": ["cn"]}),
        }
    }

    #[test]
    fn test_report_permlink_is_deterministic() {
        assert_eq!(
            report_permlink("Utopian Daily: ", &window()),
            "utopian-daily-2018-03-04"
        );
        assert_eq!(
            report_permlink("Utopian Daily: ", &window()),
            report_permlink("Utopian Daily: ", &window())
        );
        assert_eq!(report_permlink("!!!", &window()), "digest-2018-03-04");
    }

    #[test]
    fn test_submission_serialization() {
        let json = serde_json::to_value(submission()).unwrap();
        assert_eq!(json["parent_author"], "");
        assert_eq!(json["parent_permlink"], "cn");
        assert_eq!(json["json_metadata"]["tags"][0], "cn");
    }

    #[tokio::test]
    async fn test_directory_publisher_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher {
            dir: dir.path().join("out"),
        };
        publisher.publish(&submission()).await.unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("out/utopian-daily-2018-03-04.md")).unwrap();
        assert_eq!(written, "# Utopian daily 2018-03-05\n\ntable\n");
    }

    #[test]
    fn test_http_publisher_rejects_bad_endpoint() {
        let err = HttpPublisher::new("::nope", "key", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }
}
