//! Composition of the certificate email.

use chrono::{DateTime, Utc};

/// Previews at or below this size are treated as placeholders and not attached.
pub const MIN_PREVIEW_ATTACHMENT_BYTES: usize = 100;

pub const SUBJECT: &str = "Your GST Registration Certificate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A transport-agnostic email ready for submission.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub sender: Mailbox,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<Attachment>,
}

/// File type of an attachment, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Jpeg,
    Png,
    Text,
}

impl AttachmentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Text => "txt",
        }
    }

    /// Detect from magic bytes. Anything unrecognised is treated as text.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(b"%PDF") {
            Self::Pdf
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else {
            Self::Text
        }
    }
}

/// Build the certificate email for `to` with the PDF and, when it is large
/// enough to be meaningful, the preview attached.
pub fn compose_certificate_email(
    sender: &Mailbox,
    to: &str,
    pdf: &[u8],
    preview: &[u8],
    now: DateTime<Utc>,
) -> OutboundEmail {
    let stamp = now.timestamp_millis();
    let mut attachments = vec![Attachment {
        filename: format!("GST_Certificate_{stamp}.pdf"),
        content: pdf.to_vec(),
    }];

    let include_preview = preview.len() > MIN_PREVIEW_ATTACHMENT_BYTES;
    if include_preview {
        let kind = AttachmentKind::detect(preview);
        attachments.push(Attachment {
            filename: format!("Certificate_Preview_{stamp}.{}", kind.extension()),
            content: preview.to_vec(),
        });
    }

    OutboundEmail {
        sender: sender.clone(),
        to: to.to_string(),
        subject: SUBJECT.to_string(),
        html_body: html_body(include_preview, now),
        text_body: text_body(),
        attachments,
    }
}

fn html_body(with_preview: bool, now: DateTime<Utc>) -> String {
    let preview_item = if with_preview {
        "<li>Certificate preview</li>"
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: #2c3e50; color: white; padding: 25px; text-align: center; }}
        .content {{ padding: 30px; background: #f9f9f9; }}
        .footer {{ margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; }}
        .footer {{ color: #666; font-size: 12px; text-align: center; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1 style="margin: 0;">Certificate Ready!</h1>
            <p style="margin: 10px 0 0 0; opacity: 0.9;">GST Registration Certificate</p>
        </div>
        <div class="content">
            <p>Dear Recipient,</p>
            <p>Your <strong>GST Registration Certificate</strong> has been generated
               successfully.</p>
            <p><strong>What's included:</strong></p>
            <ul>
                <li>Official Certificate (PDF)</li>
                {preview_item}
            </ul>
            <p><strong>Next steps:</strong></p>
            <ol>
                <li>Download the attached PDF certificate</li>
                <li>Save it for your business records</li>
                <li>Print if needed</li>
            </ol>
            <p>Best regards,<br><strong>Certificate System</strong></p>
        </div>
        <div class="footer">
            <p>This is an automated email. Please do not reply.</p>
            <p>Generated: {generated}</p>
        </div>
    </div>
</body>
</html>"#,
        generated = now.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn text_body() -> String {
    "Dear Recipient,

Your GST Registration Certificate has been generated successfully.

Please find your certificate attached in PDF format.

Thank you for using our service.

Best regards,
Certificate System"
        .to_string()
}
