// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload validation: size, format sniffing, and a trial decode before an
// image is accepted for extraction.

use image::{ImageFormat, ImageReader};
use lesewerk_core::config::UploadLimits;
use lesewerk_core::error::{OcrError, OcrErrorCode};
use tracing::{debug, instrument};

/// Raster formats accepted for extraction.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Gif,
];

/// Check that `data` is a supported, decodable image within `limits`.
///
/// Returns the sniffed format on success. Only the header is decoded, so this
/// is cheap even for large files.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn validate_upload(data: &[u8], limits: &UploadLimits) -> Result<ImageFormat, OcrError> {
    if data.is_empty() {
        return Err(OcrError::new(OcrErrorCode::CorruptedFile, "file is empty"));
    }
    if data.len() as u64 > limits.max_file_bytes {
        return Err(OcrError::new(
            OcrErrorCode::FileTooLarge,
            format!(
                "{} bytes exceeds the {} byte limit",
                data.len(),
                limits.max_file_bytes
            ),
        ));
    }

    let format = image::guess_format(data).map_err(|err| {
        OcrError::new(
            OcrErrorCode::InvalidFileType,
            format!("unrecognised file signature: {}", err),
        )
    })?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(OcrError::new(
            OcrErrorCode::InvalidFileType,
            format!("{:?} images are not supported", format),
        ));
    }

    let (width, height) = ImageReader::with_format(std::io::Cursor::new(data), format)
        .into_dimensions()
        .map_err(|err| {
            OcrError::new(
                OcrErrorCode::CorruptedFile,
                format!("failed to read {:?} header: {}", format, err),
            )
        })?;

    if width == 0 || height == 0 {
        return Err(OcrError::new(
            OcrErrorCode::CorruptedFile,
            format!("image has no pixels ({}x{})", width, height),
        ));
    }
    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(OcrError::new(
            OcrErrorCode::FileTooLarge,
            format!(
                "{}x{} exceeds the {}px dimension limit",
                width, height, limits.max_dimension
            ),
        ));
    }

    debug!(?format, width, height, "Upload accepted");
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::ImageProcessor;
    use image::{DynamicImage, GrayImage, Luma};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([200u8])));
        ImageProcessor::from_dynamic(img).to_png_bytes().unwrap()
    }

    #[test]
    fn accepts_small_png() {
        let format = validate_upload(&png(10, 10), &UploadLimits::default()).unwrap();
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn rejects_oversized_file() {
        let limits = UploadLimits {
            max_file_bytes: 16,
            ..UploadLimits::default()
        };
        let err = validate_upload(&png(10, 10), &limits).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::FileTooLarge);
    }

    #[test]
    fn rejects_oversized_dimensions() {
        let limits = UploadLimits {
            max_dimension: 5,
            ..UploadLimits::default()
        };
        let err = validate_upload(&png(10, 3), &limits).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::FileTooLarge);
    }

    #[test]
    fn rejects_non_image() {
        let err = validate_upload(b"%PDF-1.7 not an image", &UploadLimits::default()).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::InvalidFileType);
    }

    #[test]
    fn rejects_truncated_png() {
        let data = png(10, 10);
        let err = validate_upload(&data[..12], &UploadLimits::default()).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::CorruptedFile);
    }

    #[test]
    fn rejects_empty_file() {
        let err = validate_upload(&[], &UploadLimits::default()).unwrap_err();
        assert_eq!(err.code, OcrErrorCode::CorruptedFile);
    }
}
