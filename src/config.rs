//! Process configuration loaded once from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TEMPLATE_PATH: &str = "templates/certificate.html";
const DEFAULT_WKHTMLTOPDF: &str = "wkhtmltopdf";
const DEFAULT_PDF_MARGIN: &str = "0.5in";
const DEFAULT_PDF_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PDF_FALLBACK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PDF_RENDER_DELAY_MS: u64 = 500;
const DEFAULT_PREVIEW_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com/v3";
const DEFAULT_SENDER_EMAIL: &str = "certificates@example.com";
const DEFAULT_SENDER_NAME: &str = "Certificate System";
// Kept below the hosting platform's 30 second request limit.
const DEFAULT_EMAIL_TIMEOUT_SECS: u64 = 25;
const DEFAULT_DEBUG_OUTPUT_DIR: &str = "debug";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Page geometry and time limits for HTML to PDF conversion.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub engine_path: String,
    pub margin: String,
    pub timeout: Duration,
    pub fallback_timeout: Duration,
    pub render_delay: Duration,
}

/// Credentials and identity for the transactional email channel.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub template_path: PathBuf,
    pub preview_font_path: PathBuf,
    pub pdf: PdfConfig,
    pub mail: MailConfig,
    /// Where primary PDFs are copied in development mode.
    pub debug_output_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let development = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let api_key = env::var("BREVO_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!("BREVO_API_KEY not set, certificate emails will not be delivered");
        }

        Ok(Self {
            host: string_or("HOST", DEFAULT_HOST),
            port: parse_or("PORT", DEFAULT_PORT)?,
            template_path: PathBuf::from(string_or("TEMPLATE_PATH", DEFAULT_TEMPLATE_PATH)),
            preview_font_path: PathBuf::from(string_or("PREVIEW_FONT_PATH", DEFAULT_PREVIEW_FONT)),
            pdf: PdfConfig {
                engine_path: string_or("WKHTMLTOPDF_PATH", DEFAULT_WKHTMLTOPDF),
                margin: string_or("PDF_MARGIN", DEFAULT_PDF_MARGIN),
                timeout: Duration::from_secs(parse_or(
                    "PDF_TIMEOUT_SECS",
                    DEFAULT_PDF_TIMEOUT_SECS,
                )?),
                fallback_timeout: Duration::from_secs(parse_or(
                    "PDF_FALLBACK_TIMEOUT_SECS",
                    DEFAULT_PDF_FALLBACK_TIMEOUT_SECS,
                )?),
                render_delay: Duration::from_millis(parse_or(
                    "PDF_RENDER_DELAY_MS",
                    DEFAULT_PDF_RENDER_DELAY_MS,
                )?),
            },
            mail: MailConfig {
                api_key,
                api_url: string_or("BREVO_API_URL", DEFAULT_BREVO_API_URL),
                sender_email: string_or("BREVO_SENDER_EMAIL", DEFAULT_SENDER_EMAIL),
                sender_name: string_or("BREVO_SENDER_NAME", DEFAULT_SENDER_NAME),
                timeout: Duration::from_secs(parse_or(
                    "EMAIL_TIMEOUT_SECS",
                    DEFAULT_EMAIL_TIMEOUT_SECS,
                )?),
            },
            debug_output_dir: development
                .then(|| PathBuf::from(string_or("DEBUG_OUTPUT_DIR", DEFAULT_DEBUG_OUTPUT_DIR))),
            cors_origins: split_list(&string_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGINS)),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            preview_font_path: PathBuf::from(DEFAULT_PREVIEW_FONT),
            pdf: PdfConfig {
                engine_path: DEFAULT_WKHTMLTOPDF.to_string(),
                margin: DEFAULT_PDF_MARGIN.to_string(),
                timeout: Duration::from_secs(DEFAULT_PDF_TIMEOUT_SECS),
                fallback_timeout: Duration::from_secs(DEFAULT_PDF_FALLBACK_TIMEOUT_SECS),
                render_delay: Duration::from_millis(DEFAULT_PDF_RENDER_DELAY_MS),
            },
            mail: MailConfig {
                api_key: None,
                api_url: DEFAULT_BREVO_API_URL.to_string(),
                sender_email: DEFAULT_SENDER_EMAIL.to_string(),
                sender_name: DEFAULT_SENDER_NAME.to_string(),
                timeout: Duration::from_secs(DEFAULT_EMAIL_TIMEOUT_SECS),
            },
            debug_output_dir: None,
            cors_origins: split_list(DEFAULT_CORS_ORIGINS),
        }
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
