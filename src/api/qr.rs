use crate::api::state::AppState;
use crate::error::{AppError, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use image::Luma;
use qrcode::QrCode;
use std::io::Cursor;
use std::sync::Arc;

/// `GET /qr`: a PNG QR code pointing at the current track's external page,
/// rendered in-process since the payload is just a URL template filled
/// with the track path — no external QR producer is needed.
pub async fn qr(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let current = state.publisher.read().await;
    let track_path = current.and_then(|np| np.track).unwrap_or_default();

    let target = state.config.qr_target_template.replace("{path}", &urlencode(&track_path));

    let code = QrCode::new(target.as_bytes()).map_err(|e| AppError::Internal(e.into()))?;
    let image = code.render::<Luma<u8>>().max_dimensions(400, 400).build();

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageOutputFormat::Png)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png_bytes))
}

fn urlencode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}
