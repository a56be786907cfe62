//! Image preprocessing
//!
//! Decode → resize to the classifier's square input → RGB → scale to [0, 1].

use image::imageops::FilterType;

use super::PredictionError;
use crate::classifier::ImageTensor;

/// Decode `bytes` (JPEG or PNG) into a normalized `size × size` RGB tensor
pub fn image_to_tensor(bytes: &[u8], size: u32) -> Result<ImageTensor, PredictionError> {
    if bytes.is_empty() {
        return Err(PredictionError::Decode("empty upload".to_string()));
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|e| PredictionError::Decode(e.to_string()))?;

    let rgb = decoded
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let data: Vec<f32> = rgb.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();

    ImageTensor::new(size, data)
        .ok_or_else(|| PredictionError::Decode("unexpected pixel buffer length".to_string()))
}

/// MIME type of an encoded image, if recognised
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}
