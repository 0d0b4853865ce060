//! Turning result records into human-readable documents

use agent_core::{DATE_FORMAT, Error, ResultRecord, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the document covering every record of a batch
pub const COMBINED_FILE_NAME: &str = "Combined_Analysis.md";

/// Materializes result records as document artifacts
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Existence check run before any task executes
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Render one record, returning the artifact path
    async fn render(&self, record: &ResultRecord) -> Result<PathBuf>;

    /// Render a single document covering `records`
    ///
    /// Renderers without a combined form return `Ok(None)`.
    async fn render_combined(
        &self,
        _subject: &str,
        _as_of: NaiveDate,
        _records: &[ResultRecord],
    ) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Markdown renderer writing under `root/subject/asOf/reports/`
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    root: PathBuf,
}

impl MarkdownRenderer {
    /// Create a renderer rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory artifacts for `(subject, as_of)` are written to
    pub fn report_dir(&self, subject: &str, as_of: NaiveDate) -> PathBuf {
        self.root
            .join(subject)
            .join(as_of.format(DATE_FORMAT).to_string())
            .join("reports")
    }

    fn document(record: &ResultRecord) -> String {
        let kind = record.task_id();
        let mut doc = String::new();

        let _ = writeln!(doc, "# {}: {}\n", kind.display_name(), record.subject());
        doc.push_str("| Field | Value |\n|---|---|\n");
        let _ = writeln!(doc, "| Task | {} |", kind.id());
        let _ = writeln!(doc, "| Subject | {} |", record.subject());
        let _ = writeln!(doc, "| Date | {} |", record.as_of().format(DATE_FORMAT));
        let _ = writeln!(doc, "| Produced | {} |", record.produced_at().to_rfc3339());
        let _ = writeln!(doc, "| Status | {} |\n", record.status());

        Self::body(&mut doc, record, "##");
        doc
    }

    fn body(doc: &mut String, record: &ResultRecord, heading: &str) {
        if let Some(report) = record.report_text() {
            let _ = writeln!(doc, "{heading} Analysis\n\n{}\n", report.trim_end());
        } else if let Some(reason) = record.failure_reason() {
            let _ = writeln!(doc, "{heading} Failure\n\n{}\n", reason.trim_end());
        }
    }

    async fn write(path: &Path, contents: String) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Render(format!("{}: {e}", parent.display())))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| Error::Render(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Artifact written");
        Ok(())
    }
}

#[async_trait]
impl ReportRenderer for MarkdownRenderer {
    async fn preflight(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Config(format!(
                "report root {} is not usable: {e}",
                self.root.display()
            ))
        })
    }

    async fn render(&self, record: &ResultRecord) -> Result<PathBuf> {
        let file_name = format!(
            "{}_{}.md",
            record.task_id().id(),
            record.produced_at().format("%Y%m%d_%H%M%S%3f")
        );
        let path = self
            .report_dir(record.subject(), record.as_of())
            .join(file_name);

        Self::write(&path, Self::document(record)).await?;
        Ok(path)
    }

    async fn render_combined(
        &self,
        subject: &str,
        as_of: NaiveDate,
        records: &[ResultRecord],
    ) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            return Ok(None);
        }

        let mut ordered: Vec<&ResultRecord> = records.iter().collect();
        ordered.sort_by_key(|r| (r.task_id(), r.produced_at()));

        let mut doc = String::new();
        let _ = writeln!(
            doc,
            "# Combined Analysis: {subject} ({})\n",
            as_of.format(DATE_FORMAT)
        );
        for record in ordered {
            let _ = writeln!(
                doc,
                "## {} ({})\n",
                record.task_id().display_name(),
                record.status()
            );
            Self::body(&mut doc, record, "###");
        }

        let path = self.report_dir(subject, as_of).join(COMBINED_FILE_NAME);
        Self::write(&path, doc).await?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{TaskKind, parse_date};
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        parse_date("2025-12-25").unwrap()
    }

    #[tokio::test]
    async fn test_render_completed_record() {
        let tmp = TempDir::new().unwrap();
        let renderer = MarkdownRenderer::new(tmp.path());
        let record = ResultRecord::completed(TaskKind::Market, "INTC", date(), "Uptrend intact.");

        let path = renderer.render(&record).await.unwrap();
        assert!(path.starts_with(renderer.report_dir("INTC", date())));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Market Analyst: INTC"));
        assert!(text.contains("| Status | completed |"));
        assert!(text.contains("Uptrend intact."));
    }

    #[tokio::test]
    async fn test_render_failed_record() {
        let tmp = TempDir::new().unwrap();
        let renderer = MarkdownRenderer::new(tmp.path());
        let record = ResultRecord::failed(TaskKind::News, "INTC", date(), "timeout after 120s");

        let text = std::fs::read_to_string(renderer.render(&record).await.unwrap()).unwrap();
        assert!(text.contains("## Failure"));
        assert!(text.contains("timeout after 120s"));
    }

    #[tokio::test]
    async fn test_combined_document() {
        let tmp = TempDir::new().unwrap();
        let renderer = MarkdownRenderer::new(tmp.path());
        let records = vec![
            ResultRecord::completed(TaskKind::News, "INTC", date(), "Quiet week."),
            ResultRecord::completed(TaskKind::Market, "INTC", date(), "Uptrend."),
        ];

        let path = renderer
            .render_combined("INTC", date(), &records)
            .await
            .unwrap()
            .unwrap();
        assert!(path.ends_with(COMBINED_FILE_NAME));

        let text = std::fs::read_to_string(path).unwrap();
        let market = text.find("## Market Analyst").unwrap();
        let news = text.find("## News Analyst").unwrap();
        assert!(market < news);

        assert!(renderer.render_combined("INTC", date(), &[]).await.unwrap().is_none());
    }
}
