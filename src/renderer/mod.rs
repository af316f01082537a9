//! Renderer module - turns registration details into a PDF certificate and a
//! preview image.
//!
//! - `template` - loading the HTML template and substituting placeholders
//! - `engine` - HTML to PDF engines (`wkhtmltopdf`) and the timeout wrapper
//! - `fallback` - the minimal certificate used when the template fails to render
//! - `preview` - bitmap preview with a textual fallback

pub mod common;
pub mod engine;
pub mod fallback;
pub mod preview;
pub mod template;

pub use engine::{EngineError, PdfEngine, PdfOptions, WkHtmlToPdfEngine};
pub use preview::{Preview, PreviewKind};
pub use template::CertificateTemplate;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, PdfConfig};
use common::{format_certificate_date, sanitize_filename};
use engine::render_with_timeout;

/// Errors that abort certificate generation.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Certificate template not found at {path}")]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Certificate generation failed: {original}")]
    Generation {
        #[source]
        original: EngineError,
        fallback: EngineError,
    },
}

/// The four fields printed on a certificate.
#[derive(Debug, Clone, Default)]
pub struct CertificateData {
    pub name: String,
    pub business_name: String,
    pub gst_number: String,
    pub business_address: String,
}

impl CertificateData {
    /// Template keys paired with their values.
    pub fn placeholder_values(&self) -> [(&'static str, &str); 4] {
        [
            ("name", self.name.as_str()),
            ("businessName", self.business_name.as_str()),
            ("gstNumber", self.gst_number.as_str()),
            ("businessAddress", self.business_address.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub name: String,
    pub gst_number: String,
    pub business_name: String,
    pub generated_at: DateTime<Utc>,
    pub pdf_size: usize,
    pub preview_size: usize,
    pub pdf_source: PdfSource,
    pub preview_kind: PreviewKind,
}

/// Result of a successful generation. `pdf_bytes` is never empty.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pdf_bytes: Vec<u8>,
    pub preview_bytes: Vec<u8>,
    pub metadata: DocumentMetadata,
}

/// Produces certificate PDFs and previews.
pub struct CertificateRenderer {
    template_path: PathBuf,
    font_path: PathBuf,
    pdf: PdfConfig,
    engine: Arc<dyn PdfEngine>,
    debug_output_dir: Option<PathBuf>,
}

impl CertificateRenderer {
    pub fn new(
        template_path: impl Into<PathBuf>,
        font_path: impl Into<PathBuf>,
        pdf: PdfConfig,
        engine: Arc<dyn PdfEngine>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            font_path: font_path.into(),
            pdf,
            engine,
            debug_output_dir: None,
        }
    }

    /// Renderer using `wkhtmltopdf` as configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let engine = Arc::new(WkHtmlToPdfEngine::new(config.pdf.engine_path.clone()));
        let mut renderer = Self::new(
            config.template_path.clone(),
            config.preview_font_path.clone(),
            config.pdf.clone(),
            engine,
        );
        renderer.debug_output_dir = config.debug_output_dir.clone();
        renderer
    }

    pub fn with_debug_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_output_dir = Some(dir.into());
        self
    }

    /// Generate the certificate PDF and preview for `data`.
    ///
    /// The PDF and the preview are produced concurrently and independently.
    /// Only a missing template or a failure of both PDF attempts is an error.
    pub async fn generate(&self, data: &CertificateData) -> Result<RenderedDocument, RenderError> {
        let template = CertificateTemplate::load(&self.template_path).await?;
        let html = template.fill(data);
        let generated_at = Utc::now();

        let primary_options = {
            let mut options = PdfOptions::a4_portrait(self.pdf.margin.clone(), self.pdf.timeout);
            options.render_delay = Some(self.pdf.render_delay);
            options.resource_dir = template.base_dir().map(|p| p.to_path_buf());
            options
        };
        let html = match template.base_dir() {
            Some(dir) => template::with_base_href(&html, dir),
            None => html,
        };

        let (pdf, preview) = tokio::join!(
            self.render_pdf(&html, &primary_options, data, generated_at),
            preview::render_preview(data, &self.font_path, generated_at),
        );
        let (pdf_bytes, pdf_source) = pdf?;

        if pdf_source == PdfSource::Primary {
            self.write_debug_copy(data, &pdf_bytes).await;
        }

        let metadata = DocumentMetadata {
            name: data.name.clone(),
            gst_number: data.gst_number.clone(),
            business_name: data.business_name.clone(),
            generated_at,
            pdf_size: pdf_bytes.len(),
            preview_size: preview.bytes.len(),
            pdf_source,
            preview_kind: preview.kind,
        };

        log::info!(
            "Certificate generated for {} ({} KB PDF from {:?} path, {} byte {:?} preview)",
            data.business_name,
            pdf_bytes.len() / 1024,
            pdf_source,
            preview.bytes.len(),
            preview.kind
        );

        Ok(RenderedDocument {
            pdf_bytes,
            preview_bytes: preview.bytes,
            metadata,
        })
    }

    async fn render_pdf(
        &self,
        html: &str,
        options: &PdfOptions,
        data: &CertificateData,
        generated_at: DateTime<Utc>,
    ) -> Result<(Vec<u8>, PdfSource), RenderError> {
        log::info!("Rendering PDF with {}", self.engine.name());
        let original = match render_with_timeout(self.engine.as_ref(), html, options).await {
            Ok(pdf) => {
                log::info!("PDF created successfully: {} KB", pdf.len() / 1024);
                return Ok((pdf, PdfSource::Primary));
            }
            Err(e) => e,
        };

        log::error!("PDF creation failed: {}", original);
        log::warn!(
            "Attempting fallback PDF (template {}, {} characters)",
            self.template_path.display(),
            html.len()
        );

        let fallback_source = fallback::fallback_html(data, &format_certificate_date(generated_at));
        let fallback_options =
            PdfOptions::a4_portrait(self.pdf.margin.clone(), self.pdf.fallback_timeout);

        match render_with_timeout(self.engine.as_ref(), &fallback_source, &fallback_options).await {
            Ok(pdf) => {
                log::info!("Fallback PDF generated: {} bytes", pdf.len());
                Ok((pdf, PdfSource::Fallback))
            }
            Err(fallback) => {
                log::error!("Fallback PDF also failed: {}", fallback);
                Err(RenderError::Generation { original, fallback })
            }
        }
    }

    async fn write_debug_copy(&self, data: &CertificateData, pdf: &[u8]) {
        let Some(dir) = &self.debug_output_dir else {
            return;
        };

        let path = dir.join(format!(
            "certificate-{}.pdf",
            sanitize_filename(&data.name, "debug")
        ));
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, pdf).await
        }
        .await;

        match result {
            Ok(()) => log::debug!("Debug PDF saved to {}", path.display()),
            Err(e) => log::warn!("Could not save debug PDF to {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` calls, then returns a tiny PDF.
    struct FlakyEngine {
        failures: usize,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Option<PathBuf>)>>,
    }

    impl FlakyEngine {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PdfEngine for FlakyEngine {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, EngineError> {
            self.seen.lock().push((html.to_string(), options.resource_dir.clone()));
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(EngineError::Other(format!("forced failure {call}")))
            } else {
                Ok(b"%PDF-1.4 test".to_vec())
            }
        }
    }

    fn test_pdf_config() -> PdfConfig {
        PdfConfig {
            engine_path: "unused".to_string(),
            margin: "0.5in".to_string(),
            timeout: Duration::from_secs(2),
            fallback_timeout: Duration::from_secs(1),
            render_delay: Duration::from_millis(0),
        }
    }

    fn sample_data() -> CertificateData {
        CertificateData {
            name: "Jane Doe".to_string(),
            business_name: "Acme Co".to_string(),
            gst_number: "GST123".to_string(),
            business_address: "1 Main St".to_string(),
        }
    }

    fn renderer_with(engine: Arc<FlakyEngine>, template: &Path) -> CertificateRenderer {
        CertificateRenderer::new(template, "/nonexistent/font.ttf", test_pdf_config(), engine)
    }

    fn write_template() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "<html><head></head><body>{{name}} {{gstNumber}}</body></html>",
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn test_primary_path() {
        let template = write_template();
        let engine = FlakyEngine::new(0);
        let doc = renderer_with(engine.clone(), template.path())
            .generate(&sample_data())
            .await
            .unwrap();

        assert_eq!(doc.metadata.pdf_source, PdfSource::Primary);
        assert_eq!(doc.metadata.pdf_size, doc.pdf_bytes.len());
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_after_primary_failure() {
        let template = write_template();
        let engine = FlakyEngine::new(1);
        let doc = renderer_with(engine.clone(), template.path())
            .generate(&sample_data())
            .await
            .unwrap();

        assert_eq!(doc.metadata.pdf_source, PdfSource::Fallback);
        assert!(!doc.pdf_bytes.is_empty());
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test]
    async fn test_both_attempts_fail() {
        let template = write_template();
        let err = renderer_with(FlakyEngine::new(2), template.path())
            .generate(&sample_data())
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Generation { .. }));
        assert!(err.to_string().starts_with("Certificate generation failed: "));
        assert!(err.to_string().contains("forced failure 0"));
    }

    #[tokio::test]
    async fn test_missing_template_skips_engine() {
        let engine = FlakyEngine::new(0);
        let err = renderer_with(engine.clone(), Path::new("/nonexistent/certificate.html"))
            .generate(&sample_data())
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::TemplateNotFound { .. }));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_relative_template_path_gives_absolute_resources() {
        let engine = FlakyEngine::new(0);
        renderer_with(engine.clone(), Path::new("templates/certificate.html"))
            .generate(&sample_data())
            .await
            .unwrap();

        let seen = engine.seen.lock();
        let (html, resource_dir) = &seen[0];
        let dir = resource_dir.as_ref().unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("templates"));
        assert!(html.contains(&format!("<base href=\"file://{}/\">", dir.display())));
    }

    #[tokio::test]
    async fn test_preview_degrades_without_font() {
        let template = write_template();
        let doc = renderer_with(FlakyEngine::new(0), template.path())
            .generate(&sample_data())
            .await
            .unwrap();

        assert_eq!(doc.metadata.preview_kind, PreviewKind::Text);
        assert!(!doc.preview_bytes.is_empty());
    }

    #[tokio::test]
    async fn test_debug_copy_written() {
        let template = write_template();
        let out = tempfile::tempdir().unwrap();
        renderer_with(FlakyEngine::new(0), template.path())
            .with_debug_output(out.path())
            .generate(&sample_data())
            .await
            .unwrap();

        assert!(out.path().join("certificate-jane-doe.pdf").exists());
    }
}
