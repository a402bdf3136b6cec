// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every error code is mapped to plain English with a clear suggestion. The
// severity drives how the front end presents it.

use crate::error::{LesewerkError, OcrError, OcrErrorCode};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// User must do something (pick another file, take a sharper photo).
    ActionRequired,
    /// Cannot be fixed by retrying or user action.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying again might succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: &str, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
            severity,
        }
    }
}

/// Map an error code to its default human-readable form.
pub fn humanize_code(code: OcrErrorCode) -> HumanError {
    use Severity::*;

    match code {
        OcrErrorCode::FileTooLarge => HumanError::new(
            "This image is too large.",
            "Try a smaller image, or crop it to just the part with text.",
            false,
            ActionRequired,
        ),
        OcrErrorCode::InvalidFileType => HumanError::new(
            "This type of file isn't supported.",
            "Please upload a PNG, JPEG, WebP, BMP, TIFF or GIF image.",
            false,
            ActionRequired,
        ),
        OcrErrorCode::CorruptedFile => HumanError::new(
            "This image appears to be damaged.",
            "Try opening it on your device first, or save it again as a PNG or JPEG.",
            false,
            ActionRequired,
        ),
        OcrErrorCode::NoTextFound => HumanError::new(
            "We couldn't find any text in this image.",
            "Make sure the image contains readable text and isn't upside down.",
            true,
            ActionRequired,
        ),
        OcrErrorCode::LowQualityResult => HumanError::new(
            "The text we found may not be accurate.",
            "Try a sharper, well-lit photo, or pick a different enhancement profile.",
            true,
            ActionRequired,
        ),
        OcrErrorCode::ProcessingFailed => HumanError::new(
            "Something went wrong while reading the text.",
            "Please try again. If it keeps happening, try a different image.",
            true,
            Transient,
        ),
        OcrErrorCode::Timeout => HumanError::new(
            "Reading the text took too long.",
            "Try a smaller image, or try again in a moment.",
            true,
            Transient,
        ),
        OcrErrorCode::PreprocessingFailed => HumanError::new(
            "Image enhancement didn't work, so we used the original image.",
            "No action needed.",
            true,
            Transient,
        ),
        OcrErrorCode::ImageLoadFailed => HumanError::new(
            "We couldn't open this image.",
            "Try saving it as a PNG or JPEG and uploading it again.",
            true,
            ActionRequired,
        ),
        OcrErrorCode::ModelLoadFailed => HumanError::new(
            "The text recognition model couldn't be loaded.",
            "Check that the OCR model files are installed, then try again.",
            true,
            Transient,
        ),
        OcrErrorCode::NetworkError => HumanError::new(
            "A network problem interrupted text recognition.",
            "Check your connection and try again.",
            true,
            Transient,
        ),
        OcrErrorCode::PlatformUnsupported => HumanError::new(
            "Text recognition isn't available on this system.",
            "Install the Tesseract OCR engine, or build with OCR model support.",
            false,
            Permanent,
        ),
        OcrErrorCode::OutOfMemory => HumanError::new(
            "This image needs more memory than is available.",
            "Try a smaller image or close other programs.",
            true,
            ActionRequired,
        ),
        OcrErrorCode::Cancelled => HumanError::new(
            "This request was replaced by a newer one.",
            "No action needed.",
            true,
            Transient,
        ),
    }
}

/// Convert an [`OcrError`] into a [`HumanError`].
///
/// Keeps the message already carried by the error; the suggestion depends on
/// whether both engines were exhausted.
pub fn humanize_ocr_error(err: &OcrError) -> HumanError {
    let mut human = humanize_code(err.code);
    human.message = err.message.clone();
    human.retriable = err.recoverable;
    if err.detail.both_methods_attempted {
        human.suggestion =
            "Try a clearer image with good lighting and straight, in-focus text.".into();
        human.severity = Severity::ActionRequired;
    }
    human
}

/// Convert any `LesewerkError` into a `HumanError`.
pub fn humanize_error(err: &LesewerkError) -> HumanError {
    match err {
        LesewerkError::Ocr(ocr) => humanize_ocr_error(ocr),

        LesewerkError::ImageError(_) => humanize_code(OcrErrorCode::ImageLoadFailed),

        LesewerkError::Config(detail) => HumanError {
            message: "The settings file couldn't be used.".into(),
            suggestion: format!("Fix or delete the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LesewerkError::Database(_) => HumanError::new(
            "The extraction history couldn't be saved.",
            "Your text is still available. Try clearing the history if this keeps happening.",
            true,
            Severity::Transient,
        ),

        LesewerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Try choosing the file again.",
                false,
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "Lesewerk doesn't have permission to use that file.",
                "Check the file permissions, or copy the file somewhere else first.",
                false,
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, your storage may be full.",
                true,
                Severity::Transient,
            ),
        },

        LesewerkError::Serialization(_) => HumanError::new(
            "Lesewerk had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            true,
            Severity::Transient,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_file_type_needs_action() {
        let human = humanize_code(OcrErrorCode::InvalidFileType);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn timeout_is_transient() {
        let human = humanize_code(OcrErrorCode::Timeout);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn exhausted_engines_suggest_better_image() {
        let err = OcrError::both_methods_failed("a", "b");
        let human = humanize_ocr_error(&err);
        assert!(!human.retriable);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("clearer image"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = LesewerkError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn unsupported_platform_is_permanent() {
        let human = humanize_code(OcrErrorCode::PlatformUnsupported);
        assert_eq!(human.severity, Severity::Permanent);
    }
}
