#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use certify_server::config::PdfConfig;
use certify_server::mailer::{EmailTransport, MailError, Mailbox, Mailer, OutboundEmail};
use certify_server::renderer::{CertificateRenderer, EngineError, PdfEngine, PdfOptions};
use certify_server::AppState;
use parking_lot::Mutex;
use tempfile::TempDir;

pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% certify test document\n%%EOF\n";

pub const TEST_TEMPLATE: &str = "<html><head><title>Certificate</title></head><body>\
<h1>{{name}}</h1><p>{{businessName}}</p><p>{{gstNumber}}</p><p>{{businessAddress}}</p>\
</body></html>";

/// PDF engine that records every HTML document and fails the first `failures` calls.
pub struct MockPdfEngine {
    failures: usize,
    calls: AtomicUsize,
    rendered: Mutex<Vec<String>>,
}

impl MockPdfEngine {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }
}

#[async_trait]
impl PdfEngine for MockPdfEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, html: &str, _options: &PdfOptions) -> Result<Vec<u8>, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.rendered.lock().push(html.to_string());
        if call < self.failures {
            return Err(EngineError::Other(format!("forced failure #{}", call + 1)));
        }
        Ok(FAKE_PDF.to_vec())
    }
}

pub enum MailMode {
    Accept,
    Unreachable,
}

/// Email transport that keeps sent messages in memory.
pub struct MockTransport {
    mode: MailMode,
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MockTransport {
    pub fn new(mode: MailMode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<String, MailError> {
        match self.mode {
            MailMode::Accept => {
                self.sent.lock().push(email.clone());
                Ok(format!("<mock-{}@test>", self.sent.lock().len()))
            }
            MailMode::Unreachable => Err(MailError::Api {
                status: 503,
                body: "mail service unreachable".to_string(),
            }),
        }
    }

    async fn check_connection(&self) -> Result<(), MailError> {
        match self.mode {
            MailMode::Accept => Ok(()),
            MailMode::Unreachable => Err(MailError::Timeout(Duration::from_secs(1))),
        }
    }
}

/// Everything a handler test needs, with the mocks kept reachable.
pub struct TestContext {
    pub state: AppState,
    pub engine: Arc<MockPdfEngine>,
    pub transport: Arc<MockTransport>,
    pub template_path: PathBuf,
    _dir: TempDir,
}

pub fn test_pdf_config() -> PdfConfig {
    PdfConfig {
        engine_path: "mock".to_string(),
        margin: "0.5in".to_string(),
        timeout: Duration::from_secs(5),
        fallback_timeout: Duration::from_secs(5),
        render_delay: Duration::from_millis(0),
    }
}

pub fn test_sender() -> Mailbox {
    Mailbox {
        name: "Certificate System".to_string(),
        email: "certificates@example.com".to_string(),
    }
}

/// Build state around `engine` and `transport` with a template in a temp dir.
///
/// The preview font path never exists, so previews use the text form.
pub fn setup_context(engine: MockPdfEngine, transport: MockTransport) -> TestContext {
    setup_context_with_template(engine, transport, Some(TEST_TEMPLATE))
}

pub fn setup_context_with_template(
    engine: MockPdfEngine,
    transport: MockTransport,
    template: Option<&str>,
) -> TestContext {
    let dir = tempfile::tempdir().expect("temp dir");
    let template_path = dir.path().join("certificate.html");
    if let Some(source) = template {
        std::fs::write(&template_path, source).expect("write template");
    }

    let engine = Arc::new(engine);
    let transport = Arc::new(transport);
    let renderer = CertificateRenderer::new(
        template_path.clone(),
        dir.path().join("missing-font.ttf"),
        test_pdf_config(),
        engine.clone(),
    );
    let mailer = Mailer::new(transport.clone(), test_sender(), Duration::from_secs(5));

    TestContext {
        state: AppState::with_components(renderer, mailer),
        engine,
        transport,
        template_path,
        _dir: dir,
    }
}

pub fn valid_request() -> serde_json::Value {
    serde_json::json!({
        "name": "Jane Doe",
        "email": "jane@example.com",
        "gstNumber": "GST123",
        "businessName": "Acme Co",
        "businessAddress": "1 Main St"
    })
}
