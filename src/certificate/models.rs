use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::renderer::CertificateData;

pub const SUCCESS_MESSAGE: &str = "Certificate generated successfully";
pub const FAILURE_MESSAGE: &str = "Certificate generation failed";
pub const ALL_FIELDS_REQUIRED: &str = "All fields are required";

/// Body of `POST /api/generate-certificate`.
///
/// Every field is required; they are optional here so that a missing field
/// is reported as a validation failure rather than a JSON error.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    #[schema(example = "GST123")]
    pub gst_number: Option<String>,
    #[schema(example = "Acme Co")]
    pub business_name: Option<String>,
    #[schema(example = "1 Main St")]
    pub business_address: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub email: String,
    pub data: CertificateData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCertificateResponse {
    pub message: String,
    /// PDF size in bytes.
    pub pdf_size: usize,
    /// Preview size in bytes.
    pub jpg_size: usize,
}

impl GenerateCertificateResponse {
    pub fn new(pdf_size: usize, jpg_size: usize) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            pdf_size,
            jpg_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MissingFieldsResponse {
    pub error: String,
}

impl Default for MissingFieldsResponse {
    fn default() -> Self {
        Self {
            error: ALL_FIELDS_REQUIRED.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationFailedResponse {
    pub message: String,
    pub error: String,
}

impl GenerationFailedResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            message: FAILURE_MESSAGE.to_string(),
            error: error.to_string(),
        }
    }
}
