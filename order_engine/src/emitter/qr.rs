//! QR image generation.
//!
//! One PNG per included VIN: square, exactly 388x388 pixels, black on
//! white, error correction level M. The payload is the dealership's URL
//! template with the `{vin}` (or `{stock}`) placeholder substituted.

use std::path::Path;

use image::imageops::FilterType;
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{EngineError, EngineResult};
use crate::models::VehicleRow;

/// Edge length of every emitted QR PNG, in pixels.
pub const QR_SIZE: u32 = 388;

/// Which vehicle field fills the URL template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrKey {
    /// Substitute the VIN (default).
    #[default]
    Vin,
    /// Substitute the stock number.
    Stock,
}

/// Fills the dealership URL template for one vehicle.
pub fn qr_payload(url_template: &str, vehicle: &VehicleRow, key: QrKey) -> String {
    match key {
        QrKey::Vin => url_template.replace("{vin}", &vehicle.vin),
        QrKey::Stock => url_template.replace("{stock}", &vehicle.stock),
    }
}

/// Renders the payload as an exactly [`QR_SIZE`]-square grayscale image.
pub fn render_qr(payload: &str) -> EngineResult<GrayImage> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| EngineError::QrEncode(e.to_string()))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .build();

    // min_dimensions rounds up to whole modules; scale back to the exact
    // edge the template expects.
    if image.width() != QR_SIZE || image.height() != QR_SIZE {
        Ok(image::imageops::resize(&image, QR_SIZE, QR_SIZE, FilterType::Nearest))
    } else {
        Ok(image)
    }
}

/// Renders and writes one QR PNG.
pub fn write_qr(path: &Path, payload: &str) -> EngineResult<()> {
    let image = render_qr(payload)?;
    image
        .save(path)
        .map_err(|e| EngineError::QrEncode(format!("save {}: {e}", path.display())))?;
    Ok(())
}
