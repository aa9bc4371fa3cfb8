use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::Error;

// Payload encoded into a student's QR image. The timestamp records when the
// code was issued; marking does not reject stale codes, the client correlates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub student_id: Uuid,
    pub roll_number: String,
    pub timestamp: i64,
}

pub fn render_data_url(payload: &QrPayload) -> Result<String, Error> {
    let data = serde_json::to_string(payload)?;
    let code = QrCode::new(data.as_bytes()).map_err(|err| Error::InternalError {
        kind: "QrError",
        message: err.to_string(),
    })?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(300, 300)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(|err| Error::InternalError {
            kind: "QrError",
            message: err.to_string(),
        })?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
