//! Shared application state handed to every request handler.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::delivery::DeliveryTracker;
use crate::mailer::Mailer;
use crate::renderer::CertificateRenderer;

#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<CertificateRenderer>,
    pub mailer: Arc<Mailer>,
    pub deliveries: DeliveryTracker,
}

impl AppState {
    /// Build the production state: `wkhtmltopdf` rendering and Brevo delivery.
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("certify-server/0.1")
            .build()?;

        Ok(Self::with_components(
            CertificateRenderer::from_config(config),
            Mailer::from_config(&config.mail, http_client),
        ))
    }

    /// Build state from explicit components.
    pub fn with_components(renderer: CertificateRenderer, mailer: Mailer) -> Self {
        Self {
            renderer: Arc::new(renderer),
            mailer: Arc::new(mailer),
            deliveries: DeliveryTracker::new(),
        }
    }
}
