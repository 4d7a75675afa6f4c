//! Image codec adapter: any supported container in, JPEG out.

use common::span;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Quality used when re-encoding before transmission.
pub const JPEG_QUALITY: u8 = 75;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("failed to encode JPEG: {0}")]
    Encode(image::ImageError),
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    image::load_from_memory(bytes).map_err(CodecError::Decode)
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(CodecError::Encode)?;

    Ok(jpeg)
}

pub fn reencode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let _s = span!("reencode_jpeg");
    encode_jpeg(&decode(bytes)?)
}

/// Reads an image file and returns the JPEG payload to transmit.
pub fn load_payload(path: &Path) -> Result<Vec<u8>, CodecError> {
    let bytes = std::fs::read(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let jpeg = reencode_jpeg(&bytes)?;
    tracing::info!(
        path = %path.display(),
        source_bytes = bytes.len(),
        jpeg_bytes = jpeg.len(),
        "Image payload prepared"
    );

    Ok(jpeg)
}
