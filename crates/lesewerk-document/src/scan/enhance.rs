// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing filter: applies a `PreprocessingProfile` (brightness,
// contrast, grayscale, denoise, sharpen, Otsu binarization) to a decoded
// image before it is handed to a recognition engine.

use image::{DynamicImage, GrayImage, Luma};
use lesewerk_core::error::{OcrError, OcrErrorCode};
use lesewerk_core::PreprocessingProfile;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// A pure image-to-image enhancement step.
///
/// Implementations must never modify `image`; they return a derived image.
/// Failure is recoverable: the caller falls back to the unmodified image.
pub trait ImageFilter: Send + Sync {
    fn apply(
        &self,
        image: &DynamicImage,
        profile: &PreprocessingProfile,
    ) -> Result<DynamicImage, OcrError>;
}

/// The default [`ImageFilter`], built on [`ImageProcessor`].
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    /// Largest width or height the filter will work on.
    max_dimension: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Preprocessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl ImageFilter for Preprocessor {
    /// Steps run in a fixed order: brightness, contrast, grayscale, denoise,
    /// sharpen, binarize.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn apply(
        &self,
        image: &DynamicImage,
        profile: &PreprocessingProfile,
    ) -> Result<DynamicImage, OcrError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(OcrError::new(
                OcrErrorCode::PreprocessingFailed,
                "cannot enhance an empty image",
            ));
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(OcrError::new(
                OcrErrorCode::PreprocessingFailed,
                format!(
                    "{}x{} exceeds the {}px enhancement limit",
                    width, height, self.max_dimension
                ),
            ));
        }
        if !profile.contrast.is_finite() || profile.contrast < 0.0 {
            return Err(OcrError::new(
                OcrErrorCode::PreprocessingFailed,
                format!("invalid contrast factor {}", profile.contrast),
            ));
        }

        info!(?profile, "Applying preprocessing profile");

        let mut processor = ImageProcessor::from_dynamic(image.clone());
        if profile.brightness != 0 {
            processor = processor.adjust_brightness(profile.brightness);
        }
        if (profile.contrast - 1.0).abs() >= f32::EPSILON {
            processor = processor.adjust_contrast(profile.contrast);
        }
        if profile.grayscale {
            processor = processor.grayscale();
        }
        if profile.denoise {
            processor = processor.denoise();
        }
        if profile.sharpen {
            processor = processor.sharpen();
        }

        let mut output = processor.into_dynamic();
        if profile.binarize {
            output = binarize_otsu(&output);
        }

        debug!("Preprocessing complete");
        Ok(output)
    }
}

/// Global binarization with a threshold chosen by Otsu's method.
pub fn binarize_otsu(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let threshold = otsu_threshold(&gray);
    debug!(threshold, "Otsu threshold computed");

    let (width, height) = gray.dimensions();
    let output = GrayImage::from_fn(width, height, |x, y| {
        let val = gray.get_pixel(x, y).0[0];
        Luma([if val <= threshold { 0u8 } else { 255u8 }])
    });

    DynamicImage::ImageLuma8(output)
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of the
/// dark and light pixel groups.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn two_tone(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([40, 40, 40, 255])
            } else {
                Rgba([220, 220, 220, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn otsu_splits_two_tones() {
        let out = binarize_otsu(&two_tone(20, 10)).to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(19, 9).0[0], 255);
    }

    #[test]
    fn document_profile_yields_pure_black_and_white() {
        let out = Preprocessor::default()
            .apply(&two_tone(16, 16), &PreprocessingProfile::document())
            .unwrap();
        let gray = out.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let input = two_tone(8, 8);
        let before = input.to_rgba8().into_raw();
        let _ = Preprocessor::default()
            .apply(&input, &PreprocessingProfile::low_light())
            .unwrap();
        assert_eq!(input.to_rgba8().into_raw(), before);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let err = Preprocessor::new(10)
            .apply(&two_tone(11, 4), &PreprocessingProfile::photo())
            .unwrap_err();
        assert_eq!(err.code, OcrErrorCode::PreprocessingFailed);
    }

    #[test]
    fn negative_contrast_is_rejected() {
        let profile = PreprocessingProfile {
            contrast: -2.0,
            ..PreprocessingProfile::none()
        };
        assert!(Preprocessor::default().apply(&two_tone(4, 4), &profile).is_err());
    }
}
