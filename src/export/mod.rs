//! Single-page PDF export of a captured frame.
//!
//! The document is written by hand: one A4 page whose content stream draws a
//! single Flate-compressed RGB image XObject at the top-left margin, scaled
//! to the printable width.

use chrono::NaiveDateTime;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use std::io::Write;
use std::path::Path;

const PAGE_WIDTH_PT: f32 = 595.28;
const PAGE_HEIGHT_PT: f32 = 841.89;
const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing has been rendered yet")]
    EmptyFrame,
    #[error("failed to compress image data: {0}")]
    Encode(#[source] std::io::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `<prefix>-YYYYMMDD-HHMMSS.pdf`
pub fn export_file_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}-{}.pdf", prefix, now.format("%Y%m%d-%H%M%S"))
}

/// Where the image lands on the page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub fn place_image(image_width: u32, image_height: u32, margin_mm: f32) -> Placement {
    let margin = (margin_mm * PT_PER_MM).clamp(0.0, PAGE_WIDTH_PT * 0.25);
    let max_w = PAGE_WIDTH_PT - 2.0 * margin;
    let max_h = PAGE_HEIGHT_PT - 2.0 * margin;
    let aspect = image_height.max(1) as f32 / image_width.max(1) as f32;
    let (width, height) = if max_w * aspect <= max_h {
        (max_w, max_w * aspect)
    } else {
        (max_h / aspect, max_h)
    };
    Placement {
        x: margin,
        y: PAGE_HEIGHT_PT - margin - height,
        width,
        height,
    }
}

/// Drops alpha by compositing over white, the colour of the page.
fn flatten_rgb(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((image.width() * image.height() * 3) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        for c in [r, g, b] {
            rgb.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
        }
    }
    rgb
}

pub fn encode_pdf(image: &RgbaImage, margin_mm: f32) -> Result<Vec<u8>, ExportError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::EmptyFrame);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&flatten_rgb(image))
        .map_err(ExportError::Encode)?;
    let pixels = encoder.finish().map_err(ExportError::Encode)?;

    let place = place_image(image.width(), image.height(), margin_mm);
    let content = format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im0 Do\nQ\n",
        place.width, place.height, place.x, place.y
    );

    let mut writer = PdfWriter::new();
    writer.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    writer.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    writer.object(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>",
            PAGE_WIDTH_PT, PAGE_HEIGHT_PT
        )
        .as_bytes(),
    );
    writer.stream("", content.as_bytes());
    writer.stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
            image.width(),
            image.height()
        ),
        &pixels,
    );
    Ok(writer.finish())
}

pub fn export_frame(image: &RgbaImage, margin_mm: f32, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_pdf(image, margin_mm)?;
    std::fs::write(path, &bytes).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    log::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Sequential object writer; object numbers start at 1 in call order.
struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.out.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.out.extend_from_slice(body);
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict_entries: &str, data: &[u8]) {
        self.begin();
        let dict = if dict_entries.is_empty() {
            format!("<< /Length {} >>\nstream\n", data.len())
        } else {
            format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len())
        };
        self.out.extend_from_slice(dict.as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref_at
        ));
        self.out.extend_from_slice(xref.as_bytes());
        self.out
    }
}
