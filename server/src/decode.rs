use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;

use crate::error::DecodeError;

const KNOWN_FORMATS: [&str; 6] = ["jpeg", "png", "webp", "bmp", "gif", "tiff"];

/// Normalizes a declared format string: case-insensitive, "jpg" -> "jpeg".
pub fn normalize_format(declared: &str) -> String {
    let lowered = declared.trim().to_ascii_lowercase();
    if lowered == "jpg" {
        "jpeg".to_string()
    } else {
        lowered
    }
}

/// Decodes a base64 request payload into an image. The declared format is
/// advisory: decoding works from the bytes, and a mismatched declaration is
/// only logged. An unrecognized declaration is reported as its own error
/// when the bytes turn out to be undecodable.
pub fn decode_image(image_data: &str, declared_format: &str) -> Result<DynamicImage, DecodeError> {
    let bytes = STANDARD.decode(image_data)?;
    let format = normalize_format(declared_format);
    if !format.is_empty() && !KNOWN_FORMATS.contains(&format.as_str()) {
        log::warn!("Unrecognized declared image format {:?}", declared_format);
    }

    match image::load_from_memory(&bytes) {
        Ok(img) => Ok(img),
        Err(_) if !format.is_empty() && !KNOWN_FORMATS.contains(&format.as_str()) => {
            Err(DecodeError::UnsupportedFormat(declared_format.to_string()))
        }
        Err(err) => Err(DecodeError::Image(err)),
    }
}
