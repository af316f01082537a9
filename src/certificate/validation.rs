//! Input validation for certificate requests.
//!
//! Only presence is checked: a field is missing when it is absent, `null` or
//! the empty string. No format or length rules apply.

use std::fmt;

use super::models::{GenerationRequest, ValidatedRequest};
use crate::renderer::CertificateData;

/// A single failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON name of the field that failed validation
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{field} is required"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Names of the fields that failed.
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Take the value of a required field, recording an error when it is missing.
fn require(value: Option<String>, field: &'static str, errors: &mut ValidationErrors) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.add(ValidationError::missing(field));
            String::new()
        }
    }
}

impl GenerationRequest {
    /// Check that all five fields are present.
    pub fn validate(self) -> Result<ValidatedRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = require(self.name, "name", &mut errors);
        let email = require(self.email, "email", &mut errors);
        let gst_number = require(self.gst_number, "gstNumber", &mut errors);
        let business_name = require(self.business_name, "businessName", &mut errors);
        let business_address = require(self.business_address, "businessAddress", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedRequest {
            email,
            data: CertificateData {
                name,
                business_name,
                gst_number,
                business_address,
            },
        })
    }
}
