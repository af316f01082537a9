//! HTML to PDF rendering engines.
//!
//! The production engine writes the HTML into a temporary directory, invokes
//! the `wkhtmltopdf` command-line tool and reads back the generated PDF.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use thiserror::Error;
use tokio::process::Command;

const INPUT_FILE: &str = "certificate.html";
const OUTPUT_FILE: &str = "certificate.pdf";
const MAX_STDERR_CHARS: usize = 500;

/// Errors raised by a single rendering attempt.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write HTML source: {0}")]
    WriteHtml(#[source] std::io::Error),
    #[error("failed to start PDF engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("PDF engine exited with status {code}: {stderr}")]
    Exit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("PDF rendering timed out after {0:?}")]
    Timeout(Duration),
    #[error("PDF engine produced an empty document")]
    EmptyOutput,
    #[error("PDF engine failed: {0}")]
    Other(String),
}

/// Page geometry and limits for one rendering attempt.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub page_size: &'static str,
    pub orientation: &'static str,
    /// Applied to all four sides, in any unit the engine accepts (e.g. `0.5in`).
    pub margin: String,
    pub timeout: Duration,
    /// Time given to scripts and stylesheets before the page is captured.
    pub render_delay: Option<Duration>,
    /// Directory the engine may read local resources from.
    pub resource_dir: Option<PathBuf>,
}

impl PdfOptions {
    /// A4 portrait with the given margin and timeout.
    pub fn a4_portrait(margin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            page_size: "A4",
            orientation: "Portrait",
            margin: margin.into(),
            timeout,
            render_delay: None,
            resource_dir: None,
        }
    }
}

/// Something that turns HTML into PDF bytes.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, EngineError>;
}

/// Run `engine` bounded by `options.timeout`, rejecting empty output.
pub async fn render_with_timeout(
    engine: &dyn PdfEngine,
    html: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>, EngineError> {
    let pdf = tokio::time::timeout(options.timeout, engine.render(html, options))
        .await
        .map_err(|_| EngineError::Timeout(options.timeout))??;

    if pdf.is_empty() {
        return Err(EngineError::EmptyOutput);
    }
    Ok(pdf)
}

/// Engine backed by the `wkhtmltopdf` binary.
pub struct WkHtmlToPdfEngine {
    binary: String,
}

impl WkHtmlToPdfEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn build_args(&self, options: &PdfOptions) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--page-size".to_string(),
            options.page_size.to_string(),
            "--orientation".to_string(),
            options.orientation.to_string(),
        ];

        for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
            args.push(side.to_string());
            args.push(options.margin.clone());
        }

        if let Some(delay) = options.render_delay {
            args.push("--javascript-delay".to_string());
            args.push(delay.as_millis().to_string());
        }

        if let Some(dir) = &options.resource_dir {
            args.push("--enable-local-file-access".to_string());
            args.push("--allow".to_string());
            args.push(dir.display().to_string());
        }

        args
    }
}

#[async_trait]
impl PdfEngine for WkHtmlToPdfEngine {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    async fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, EngineError> {
        let temp_dir = tempdir().map_err(EngineError::TempDir)?;
        let input_path = temp_dir.path().join(INPUT_FILE);
        let output_path = temp_dir.path().join(OUTPUT_FILE);

        tokio::fs::write(&input_path, html)
            .await
            .map_err(EngineError::WriteHtml)?;

        let output = Command::new(&self.binary)
            .args(self.build_args(options))
            .arg(&input_path)
            .arg(&output_path)
            .current_dir(temp_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(EngineError::Spawn)?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(EngineError::Exit {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        tokio::fs::read(&output_path)
            .await
            .map_err(EngineError::ReadPdf)
    }
}
