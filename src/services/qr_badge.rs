use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::signature;

#[derive(thiserror::Error, Debug)]
pub enum QrBadgeError {
    #[error("QR code generation failed: {0}")]
    QrCode(#[from] qrcode::types::QrError),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PNG encoding failed: {0}")]
    PngEncoding(#[from] image::ImageError),
}

/// What a member's badge QR encodes. The scanner only needs the id;
/// the name and HMAC signature let external validators check the badge
/// without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgePayload {
    pub member_id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl BadgePayload {
    pub fn new(member_id: Uuid, full_name: String) -> Self {
        Self {
            member_id,
            full_name,
            signature: None,
        }
    }

    /// Signs the payload (without the signature field) and returns a
    /// copy carrying the signature.
    pub fn signed(&self, signing_key: &[u8]) -> Result<Self, QrBadgeError> {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        let payload_str = serde_json::to_string(&unsigned)?;
        Ok(Self {
            signature: Some(signature::sign(&payload_str, signing_key)),
            ..self.clone()
        })
    }
}

/// Renders the signed payload as an SVG QR code.
pub fn generate_svg(payload: &BadgePayload) -> Result<String, QrBadgeError> {
    let json = serde_json::to_string(payload)?;
    let code = QrCode::new(json.as_bytes())?;
    Ok(code.render::<svg::Color>().min_dimensions(200, 200).build())
}

/// Renders the signed payload as a PNG, 10px per module.
pub fn generate_png(payload: &BadgePayload) -> Result<Vec<u8>, QrBadgeError> {
    use image::{ImageBuffer, Luma};

    let json = serde_json::to_string(payload)?;
    let code = QrCode::new(json.as_bytes())?;

    let module_size = 10u32;
    let width = code.width() as u32;
    let img_size = width * module_size;

    let mut img = ImageBuffer::<Luma<u8>, Vec<u8>>::new(img_size, img_size);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let module = code[((x / module_size) as usize, (y / module_size) as usize)];
        *pixel = match module {
            qrcode::types::Color::Dark => Luma([0u8]),
            qrcode::types::Color::Light => Luma([255u8]),
        };
    }

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png_data), image::ImageFormat::Png)?;

    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> BadgePayload {
        BadgePayload::new(Uuid::new_v4(), "Alisher Karimov".to_string())
    }

    #[test]
    fn signed_payload_verifies() {
        let key = b"badge-key";
        let signed = payload().signed(key).unwrap();
        let signature = signed.signature.clone().unwrap();

        let unsigned = BadgePayload {
            signature: None,
            ..signed
        };
        let payload_str = serde_json::to_string(&unsigned).unwrap();
        assert!(crate::services::signature::verify(
            &payload_str,
            &signature,
            key
        ));
    }

    #[test]
    fn svg_rendering_produces_svg_markup() {
        let signed = payload().signed(b"badge-key").unwrap();
        let svg = generate_svg(&signed).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn png_rendering_produces_png_magic() {
        let signed = payload().signed(b"badge-key").unwrap();
        let png = generate_png(&signed).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
