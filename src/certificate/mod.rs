//! Certificate request handling: validation, generation and background delivery.

pub mod handlers;
pub mod models;
pub mod validation;

pub use handlers::{config, json_config, DELIVERY_ID_HEADER};
pub use models::{GenerateCertificateResponse, GenerationRequest};
