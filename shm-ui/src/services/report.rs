//! Report Exporter
//!
//! Fills a fixed HTML template from the accepted prediction and its
//! knowledge entry, then hands it to a renderer. PDF output goes through an
//! external `wkhtmltopdf` process writing into a temporary directory that is
//! removed once the bytes are read.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Local};
use shm_common::config::{ReportConfig, ReportFormat};
use shm_common::knowledge::{KnowledgeEntry, Topic};
use shm_common::KnowledgeBase;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use super::{PredictionResult, ReportError};
use crate::render::escape_html;

/// A generated report ready for download
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns report HTML into the downloadable byte stream
#[derive(Debug, Clone)]
pub enum ReportRenderer {
    /// Serve the HTML itself
    Html,
    /// Convert with wkhtmltopdf
    Pdf { wkhtmltopdf: PathBuf },
}

impl ReportRenderer {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportRenderer::Html => "html",
            ReportRenderer::Pdf { .. } => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportRenderer::Html => "text/html; charset=utf-8",
            ReportRenderer::Pdf { .. } => "application/pdf",
        }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>, ReportError> {
        match self {
            ReportRenderer::Html => Ok(html.as_bytes().to_vec()),
            ReportRenderer::Pdf { wkhtmltopdf } => render_pdf(wkhtmltopdf, html).await,
        }
    }
}

impl From<&ReportConfig> for ReportRenderer {
    fn from(config: &ReportConfig) -> Self {
        match config.format {
            ReportFormat::Html => ReportRenderer::Html,
            ReportFormat::Pdf => ReportRenderer::Pdf {
                wkhtmltopdf: config.wkhtmltopdf_path.clone(),
            },
        }
    }
}

async fn render_pdf(wkhtmltopdf: &Path, html: &str) -> Result<Vec<u8>, ReportError> {
    let workdir = tempfile::tempdir()?;
    let output_path = workdir.path().join("report.pdf");

    let mut child = Command::new(wkhtmltopdf)
        .arg("--quiet")
        .arg("--encoding")
        .arg("utf-8")
        .arg("-")
        .arg(&output_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ReportError::Rendering(format!("cannot start {}: {}", wkhtmltopdf.display(), e))
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(html.as_bytes()).await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = %output.status, stderr = %stderr.trim(), "wkhtmltopdf failed");
        return Err(ReportError::Rendering(format!(
            "wkhtmltopdf exited with {}",
            output.status
        )));
    }

    let bytes = tokio::fs::read(&output_path).await?;
    // workdir (and the PDF inside it) is removed on drop
    Ok(bytes)
}

/// Confidence as shown to users: percentage with two decimals
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// `<label with underscores>_<YYYYmmdd_HHMMSS>.<ext>`
///
/// Only ASCII alphanumerics and `-_.()` survive from the label, so the name
/// is safe inside a quoted `Content-Disposition` value.
pub fn report_filename(label: &str, at: DateTime<Local>, extension: &str) -> String {
    let stem: String = label
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || "-_.()".contains(c) => Some(c),
            _ => None,
        })
        .collect();

    format!(
        "{}_{}.{}",
        stem,
        at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

/// Fixed report template
pub fn compose_report_html(result: &PredictionResult, entry: &KnowledgeEntry) -> String {
    let mut html = format!(
        r#"<html>
<head><meta charset='UTF-8'><style>h1{{text-align:center;}} h2{{color:#2E86C1}} p{{font-size:18px;}}</style></head>
<body>
<h1>{} Soil Report</h1>
<p><strong>Confidence:</strong> {}</p>
"#,
        escape_html(&result.label),
        format_confidence(result.confidence)
    );

    for topic in Topic::ALL {
        html.push_str(&format!("<h2>{}</h2><p>{}</p>\n", topic.title(), entry.text(topic)));
    }

    html.push_str("</body></html>\n");
    html
}

/// Builds downloadable reports for the session's prediction
#[derive(Debug, Clone)]
pub struct ReportExporter {
    renderer: ReportRenderer,
    knowledge: &'static KnowledgeBase,
}

impl ReportExporter {
    pub fn new(renderer: ReportRenderer, knowledge: &'static KnowledgeBase) -> Self {
        Self {
            renderer,
            knowledge,
        }
    }

    /// Render a report for `result`
    ///
    /// `None` (no accepted prediction yet) is an export precondition failure.
    pub async fn export(
        &self,
        result: Option<&PredictionResult>,
    ) -> Result<ReportDocument, ReportError> {
        let result = result.ok_or(ReportError::NoPrediction)?;
        let entry = self.knowledge.get(&result.label);

        let html = compose_report_html(result, entry);
        let bytes = self.renderer.render(&html).await?;
        let filename = report_filename(&result.label, Local::now(), self.renderer.extension());

        info!(filename = %filename, size = bytes.len(), "Report exported");

        Ok(ReportDocument {
            filename,
            content_type: self.renderer.content_type(),
            bytes,
        })
    }
}
