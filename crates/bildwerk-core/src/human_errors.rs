// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the conversion failure notification.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how a front end presents the message.

use crate::error::BildwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is.
    Transient,
    /// User must do something (pick other files, fix a setting).
    ActionRequired,
    /// Retrying the same input will fail the same way.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying again unchanged might succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `BildwerkError` into a `HumanError` suitable for a failure notice.
pub fn humanize_error(err: &BildwerkError) -> HumanError {
    match err {
        BildwerkError::Decode { name, .. } => HumanError {
            message: "One of the images couldn't be opened.".into(),
            suggestion: format!(
                "'{name}' may be damaged or not really an image. Remove it from the list or save it as a JPEG or PNG first."
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        BildwerkError::UnsupportedInput(name) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!(
                "Only JPG, PNG, GIF, WebP, BMP, SVG, JFIF and ICO images can be converted. AVIF needs a build with the `avif` feature. ({name})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BildwerkError::NothingToConvert => HumanError {
            message: "There are no images to convert.".into(),
            suggestion: "Add at least one image, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BildwerkError::Encode(_) | BildwerkError::Assembly(_) => HumanError {
            message: "The PDF couldn't be created.".into(),
            suggestion: "Try again. If this keeps happening, try converting the images one at a time to find the one causing trouble.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BildwerkError::PdfRead(_) => HumanError {
            message: "The finished PDF didn't pass its check.".into(),
            suggestion: "Try converting again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BildwerkError::Task(_) => HumanError {
            message: "The conversion stopped unexpectedly.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BildwerkError::Config(detail) => HumanError {
            message: "A setting has an invalid value.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BildwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or try copying the file to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        BildwerkError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check the settings file for typos, or delete it to go back to the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failure_is_permanent_and_names_file() {
        let err = BildwerkError::decode("broken.png", "bad header");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
        assert!(human.suggestion.contains("broken.png"));
    }

    #[test]
    fn empty_batch_is_action_required() {
        let human = humanize_error(&BildwerkError::NothingToConvert);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn assembly_failure_is_retriable() {
        let human = humanize_error(&BildwerkError::Assembly("xref".into()));
        assert!(human.retriable);
    }

    #[test]
    fn unsupported_input_mentions_the_avif_feature() {
        let human = humanize_error(&BildwerkError::UnsupportedInput("notes.txt".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("`avif` feature"));
        assert!(human.suggestion.contains("notes.txt"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = BildwerkError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
    }
}
