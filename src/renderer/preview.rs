//! Certificate preview image.
//!
//! The preview is a JPEG drawn onto a fixed-size canvas. When drawing fails
//! for any reason (missing font, encoder error, panic) a box-drawn text
//! rendition of the same fields is returned instead, so this path never fails.

use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use serde::Serialize;
use thiserror::Error;

use super::common::{format_certificate_date, wrap_words};
use super::CertificateData;

pub const CANVAS_WIDTH: u32 = 1200;
pub const CANVAS_HEIGHT: u32 = 850;
/// Widest a wrapped field line may be, in pixels.
pub const MAX_LINE_WIDTH: u32 = 720;
const JPEG_QUALITY: u8 = 90;
const TEXT_BOX_WIDTH: usize = 60;

const BACKGROUND: Rgb<u8> = Rgb([255, 253, 245]);
const BORDER: Rgb<u8> = Rgb([44, 62, 80]);
const ACCENT: Rgb<u8> = Rgb([184, 134, 11]);
const INK: Rgb<u8> = Rgb([33, 33, 33]);
const MUTED: Rgb<u8> = Rgb([110, 110, 110]);

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to read preview font {path}: {source}")]
    FontIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid preview font {0}")]
    FontParse(PathBuf),
    #[error("failed to encode preview image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("preview drawing aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Bitmap,
    Text,
}

/// Preview bytes together with how they were produced.
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Vec<u8>,
    pub kind: PreviewKind,
}

/// Pseudo-identifier printed on the certificate, derived from the time.
pub fn certificate_id(at: DateTime<Utc>) -> String {
    let mut millis = at.timestamp_millis().unsigned_abs();
    let digits = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut encoded = Vec::new();
    loop {
        encoded.push(digits[(millis % 36) as usize]);
        millis /= 36;
        if millis == 0 {
            break;
        }
    }
    encoded.reverse();
    format!("CERT-{}", String::from_utf8_lossy(&encoded))
}

/// Produce the preview for `data`. Never fails; degrades to text.
pub async fn render_preview(
    data: &CertificateData,
    font_path: &Path,
    at: DateTime<Utc>,
) -> Preview {
    let id = certificate_id(at);
    let date = format_certificate_date(at);

    let task_data = data.clone();
    let task_font = font_path.to_path_buf();
    let task_id = id.clone();
    let task_date = date.clone();
    let drawn = tokio::task::spawn_blocking(move || {
        let font = load_font(&task_font)?;
        draw_bitmap(&task_data, &font, &task_id, &task_date)
    })
    .await;

    match drawn {
        Ok(Ok(bytes)) if !bytes.is_empty() => {
            log::info!("Preview image drawn ({} bytes)", bytes.len());
            Preview {
                bytes,
                kind: PreviewKind::Bitmap,
            }
        }
        Ok(Ok(_)) => {
            let cause = PreviewError::Aborted("empty image".into());
            degrade(data, &id, &date, &cause)
        }
        Ok(Err(e)) => degrade(data, &id, &date, &e),
        Err(join) => {
            let cause = PreviewError::Aborted(join.to_string());
            degrade(data, &id, &date, &cause)
        }
    }
}

fn degrade(data: &CertificateData, id: &str, date: &str, cause: &PreviewError) -> Preview {
    log::warn!("Preview drawing failed, using text preview: {}", cause);
    Preview {
        bytes: text_preview(data, id, date),
        kind: PreviewKind::Text,
    }
}

pub fn load_font(path: &Path) -> Result<FontVec, PreviewError> {
    let bytes = std::fs::read(path).map_err(|source| PreviewError::FontIo {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(bytes).map_err(|_| PreviewError::FontParse(path.to_path_buf()))
}

/// Draw the certificate layout and encode it as JPEG.
pub fn draw_bitmap(
    data: &CertificateData,
    font: &FontVec,
    id: &str,
    date: &str,
) -> Result<Vec<u8>, PreviewError> {
    let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND);

    // Outer frame, five pixels thick, then a thin inner rule.
    for inset in 20..25 {
        let rect = Rect::at(inset, inset).of_size(
            CANVAS_WIDTH - 2 * inset as u32,
            CANVAS_HEIGHT - 2 * inset as u32,
        );
        draw_hollow_rect_mut(&mut canvas, rect, BORDER);
    }
    draw_hollow_rect_mut(
        &mut canvas,
        Rect::at(40, 40).of_size(CANVAS_WIDTH - 80, CANVAS_HEIGHT - 80),
        ACCENT,
    );
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(40, 40).of_size(CANVAS_WIDTH - 80, 8),
        ACCENT,
    );

    let title_scale = PxScale::from(46.0);
    let subtitle_scale = PxScale::from(24.0);
    let label_scale = PxScale::from(26.0);
    let value_scale = PxScale::from(28.0);
    let footer_scale = PxScale::from(20.0);

    draw_centered(
        &mut canvas,
        font,
        title_scale,
        95,
        "CERTIFICATE OF REGISTRATION",
        BORDER,
    );
    draw_centered(
        &mut canvas,
        font,
        subtitle_scale,
        160,
        "Goods and Services Tax Registration",
        MUTED,
    );
    let rule_y = 205.0;
    draw_line_segment_mut(
        &mut canvas,
        (200.0, rule_y),
        ((CANVAS_WIDTH - 200) as f32, rule_y),
        ACCENT,
    );

    let label_x = 110;
    let value_x = 380;
    let mut y = 250;
    let fields = [
        ("Certificate Holder", data.name.as_str()),
        ("Business Name", data.business_name.as_str()),
        ("GST Number", data.gst_number.as_str()),
        ("Business Address", data.business_address.as_str()),
    ];

    for (label, value) in fields {
        draw_text_mut(
            &mut canvas,
            INK,
            label_x,
            y,
            label_scale,
            font,
            &format!("{label}:"),
        );
        let lines = wrap_words(value, MAX_LINE_WIDTH, |s| text_size(value_scale, font, s).0);
        for line in lines {
            draw_text_mut(&mut canvas, INK, value_x, y, value_scale, font, &line);
            y += 40;
        }
        y += 30;
    }

    let footer_y = CANVAS_HEIGHT as i32 - 120;
    draw_text_mut(
        &mut canvas,
        MUTED,
        label_x,
        footer_y,
        footer_scale,
        font,
        &format!("Certificate ID: {id}"),
    );
    let issued = format!("Issued: {date}");
    let (issued_width, _) = text_size(footer_scale, font, &issued);
    draw_text_mut(
        &mut canvas,
        MUTED,
        CANVAS_WIDTH as i32 - 110 - issued_width as i32,
        footer_y,
        footer_scale,
        font,
        &issued,
    );

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(&canvas)?;
    Ok(bytes)
}

fn draw_centered(
    canvas: &mut RgbImage,
    font: &FontVec,
    scale: PxScale,
    y: i32,
    text: &str,
    color: Rgb<u8>,
) {
    let (width, _) = text_size(scale, font, text);
    let x = (CANVAS_WIDTH as i32 - width as i32) / 2;
    draw_text_mut(canvas, color, x.max(0), y, scale, font, text);
}

/// Box-drawn plain-text rendition of the certificate.
pub fn text_preview(data: &CertificateData, id: &str, date: &str) -> Vec<u8> {
    let horizontal = "═".repeat(TEXT_BOX_WIDTH + 2);
    let mut out = String::new();

    out.push_str(&format!("╔{horizontal}╗\n"));
    let title = centered("CERTIFICATE OF REGISTRATION", TEXT_BOX_WIDTH);
    push_row(&mut out, &title);
    out.push_str(&format!("╠{horizontal}╣\n"));

    let fields = [
        ("Certificate Holder", data.name.as_str()),
        ("Business Name", data.business_name.as_str()),
        ("GST Number", data.gst_number.as_str()),
        ("Business Address", data.business_address.as_str()),
    ];
    for (label, value) in fields {
        let text = format!("{label}: {value}");
        for line in wrap_words(&text, TEXT_BOX_WIDTH as u32, |s| s.chars().count() as u32) {
            push_row(&mut out, &line);
        }
    }

    push_row(&mut out, "");
    push_row(&mut out, &format!("Certificate ID: {id}"));
    push_row(&mut out, &format!("Generated: {date}"));
    push_row(&mut out, "This is a text representation of the certificate.");
    out.push_str(&format!("╚{horizontal}╝\n"));

    out.into_bytes()
}

fn push_row(out: &mut String, text: &str) {
    let padding = TEXT_BOX_WIDTH.saturating_sub(text.chars().count());
    out.push_str(&format!("║ {}{} ║\n", text, " ".repeat(padding)));
}

fn centered(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let left = width.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(left), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> CertificateData {
        CertificateData {
            name: "Jane Doe".to_string(),
            business_name: "Acme Co".to_string(),
            gst_number: "GST123".to_string(),
            business_address: "1 Main St".to_string(),
        }
    }

    #[test]
    fn test_certificate_id_is_time_derived() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let id = certificate_id(at);
        assert!(id.starts_with("CERT-"));
        assert_eq!(id, certificate_id(at));
        assert_ne!(id, certificate_id(at + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_text_preview_contains_fields() {
        let bytes = text_preview(&sample_data(), "CERT-ABC", "14 October 2026");
        let text = String::from_utf8(bytes).unwrap();
        for expected in ["Jane Doe", "Acme Co", "GST123", "1 Main St", "CERT-ABC"] {
            assert!(text.contains(expected), "missing {expected}");
        }
        assert!(text.starts_with('╔'));
    }

    #[test]
    fn test_text_preview_wraps_long_address() {
        let mut data = sample_data();
        data.business_address = "Unit 4, Level 12, Very Long Business Park Road, \
                                  Industrial Estate North, Springfield"
            .to_string();
        let text = String::from_utf8(text_preview(&data, "CERT-1", "today")).unwrap();
        for line in text.lines() {
            assert!(line.chars().count() <= TEXT_BOX_WIDTH + 4, "line too wide: {line}");
        }
    }

    #[tokio::test]
    async fn test_missing_font_degrades_to_text() {
        let font = Path::new("/nonexistent/font.ttf");
        let preview = render_preview(&sample_data(), font, Utc::now()).await;
        assert_eq!(preview.kind, PreviewKind::Text);
        assert!(!preview.bytes.is_empty());
        assert!(String::from_utf8(preview.bytes).unwrap().contains("GST123"));
    }

    #[tokio::test]
    async fn test_invalid_font_degrades_to_text() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        let preview = render_preview(&sample_data(), file.path(), Utc::now()).await;
        assert_eq!(preview.kind, PreviewKind::Text);
    }

    #[tokio::test]
    async fn test_bitmap_with_system_font() {
        let font = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        if !font.exists() {
            return;
        }
        let preview = render_preview(&sample_data(), font, Utc::now()).await;
        assert_eq!(preview.kind, PreviewKind::Bitmap);
        assert!(preview.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }
}
