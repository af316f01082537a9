//! Minimal certificate HTML used when the primary template fails to render.

use super::common::escape_html;
use super::CertificateData;

/// Build the hard-coded fallback certificate for `data`, dated `date`.
pub fn fallback_html(data: &CertificateData, date: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; padding: 40px; }}
        h1 {{ color: #333; text-align: center; }}
        .certificate {{ border: 2px solid #000; padding: 30px; }}
        .field {{ margin: 15px 0; }}
        .label {{ font-weight: bold; }}
        .value {{ margin-left: 20px; }}
    </style>
</head>
<body>
    <div class="certificate">
        <h1>CERTIFICATE OF REGISTRATION</h1>
        <div class="field">
            <span class="label">Certificate Holder:</span>
            <span class="value">{name}</span>
        </div>
        <div class="field">
            <span class="label">Business Name:</span>
            <span class="value">{business_name}</span>
        </div>
        <div class="field">
            <span class="label">GST Number:</span>
            <span class="value">{gst_number}</span>
        </div>
        <div class="field">
            <span class="label">Business Address:</span>
            <span class="value">{business_address}</span>
        </div>
        <div style="margin-top: 40px; text-align: right;">
            <p>Date: {date}</p>
        </div>
    </div>
</body>
</html>
"#,
        name = escape_html(&data.name),
        business_name = escape_html(&data.business_name),
        gst_number = escape_html(&data.gst_number),
        business_address = escape_html(&data.business_address),
        date = escape_html(date),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_contains_all_fields() {
        let data = CertificateData {
            name: "Jane Doe".to_string(),
            business_name: "Acme Co".to_string(),
            gst_number: "GST123".to_string(),
            business_address: "1 Main St".to_string(),
        };
        let html = fallback_html(&data, "14 October 2026");

        for expected in ["Jane Doe", "Acme Co", "GST123", "1 Main St", "14 October 2026"] {
            assert!(html.contains(expected), "missing {expected}");
        }
        assert!(!html.contains("{{"));
    }
}
